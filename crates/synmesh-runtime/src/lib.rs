//! Per-core runtime for the synmesh synapse processor.
//!
//! Binds the kernels and buffers of `synmesh-core` to a shared store and
//! a timer: configuration-blob parsing, the double-buffered row transfer
//! pipeline, the per-tick scheduler, operational counters, and the
//! Poisson stimulus variant.
//!
//! # Quick start
//!
//! ```no_run
//! use synmesh_runtime::AnySimulation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let blob = bytes::Bytes::from(std::fs::read("core.bin")?);
//! let mut sim = AnySimulation::load(&blob)?;
//! let counters = sim.run()?;
//! println!("rows processed: {}", counters.rows_processed);
//! # Ok(())
//! # }
//! ```
//!
//! Fatal configuration faults fail the load and the simulation never
//! starts; operational faults (queue overflow, unknown keys, ring
//! saturation) are counted in [`Diagnostics`] and the run continues.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

pub mod config;
mod dma;
mod error;
mod poisson;
mod recording;
mod scheduler;
mod simulation;
mod store;

pub use config::{
    read_key_lookup, write_key_lookup, ConfigBlob, ConfigWriter, RegionId, SynapseKind,
    SystemConfig, CONFIG_MAGIC, CONFIG_VERSION,
};
pub use dma::{PendingRow, RowPipeline};
pub use error::{Result, RuntimeError};
pub use poisson::PoissonSource;
pub use recording::{Diagnostics, SpikeRecord};
pub use scheduler::{CoreConfig, SynapseCore};
pub use simulation::{
    load_static, load_stdp_nearest_additive, load_stdp_pair_additive, AnySimulation,
    NearestAdditiveKernel, PairAdditiveKernel, Simulation, StaticKernel,
};
pub use store::{HostStore, SharedStore};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AnySimulation, ConfigBlob, ConfigWriter, CoreConfig, Diagnostics, HostStore, RegionId,
        Result, RuntimeError, SharedStore, Simulation, SynapseCore, SynapseKind, SystemConfig,
    };
}
