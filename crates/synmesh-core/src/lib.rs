//! Synapse-processing core for the synmesh neuromorphic runtime.
//!
//! A simulation core owns the synapses of the neurons it simulates. Every
//! timer tick it drains a queue of inbound spike keys, fetches the matching
//! synaptic row from the shared off-chip store, applies the row into a
//! delay-indexed ring buffer, and (for plastic rows) writes the updated
//! plastic state back. This crate holds everything that happens between
//! "spike key arrives" and "weighted input lands in the ring buffer":
//!
//! ```text
//! spike key ─▶ KeyLookup ─▶ RowLocator ─▶ row fetch (runtime crate)
//!                                              │
//!                               ┌──────────────┴──────────────┐
//!                               ▼                             ▼
//!                        StaticProcessor               StdpProcessor
//!                               │                             │
//!                               └──────────┬──────────────────┘
//!                                          ▼
//!                                  InputRingBuffer ─▶ neuron input
//! ```
//!
//! The STDP kernel is generic over three policy capabilities —
//! [`TimingDependence`], [`WeightDependence`] and [`SynapseStructure`] —
//! so a build configuration selects a fully monomorphised kernel with no
//! dynamic dispatch on the per-synapse path.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]

mod delay;
mod error;
pub mod kernels;
mod lookup;
pub mod plasticity;
mod post_events;
mod queue;
mod ring;
pub mod row;

pub use delay::{DelayRow, DelayRowBuffer};
pub use error::{CoreError, Result};
pub use kernels::{RowProcessor, StaticProcessor, StdpProcessor, WriteBack};
pub use lookup::{KeyLookup, KeyRange};
pub use plasticity::{
    AdditiveWeightDependence, ExpDecayLut, MultiplicativeWeightDependence, NearestPairRule,
    PairRule, SynapseStructure, TimingDependence, Trace, UpdateHandler, WeightDependence,
    WeightOnly, S2011,
};
pub use post_events::{PostEventHistory, PostEventWindow};
pub use queue::SpikeInputBuffer;
pub use ring::InputRingBuffer;
pub use row::{RowLocator, StandardCodec, SynapseCodec};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AdditiveWeightDependence, CoreError, DelayRowBuffer, InputRingBuffer, KeyLookup, KeyRange,
        NearestPairRule, PairRule, Result, RowLocator, RowProcessor, SpikeInputBuffer,
        StandardCodec, StaticProcessor, StdpProcessor, WeightOnly, WriteBack,
    };
}
