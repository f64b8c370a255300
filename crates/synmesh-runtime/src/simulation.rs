//! Per-core simulation context.
//!
//! Everything a core owns — configuration, store image, scheduler, the
//! optional Poisson stimulus — lives in one [`Simulation`] value built
//! from the configuration blob and threaded explicitly, never in
//! module-level state. [`AnySimulation`] dispatches over the row kernel
//! named by the System region.

use crate::config::{
    read_key_lookup, ConfigBlob, RegionId, SynapseKind, SystemConfig,
};
use crate::error::{Result, RuntimeError};
use crate::poisson::PoissonSource;
use crate::recording::{Diagnostics, SpikeRecord};
use crate::scheduler::{CoreConfig, SynapseCore};
use crate::store::HostStore;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use synmesh_core::{
    AdditiveWeightDependence, NearestPairRule, PairRule, RowProcessor, StaticProcessor,
    StdpProcessor, WeightOnly,
};
use tracing::info;

/// Reference static kernel: 10 index bits, 3 delay bits.
pub type StaticKernel = StaticProcessor<10, 3>;

/// Reference nearest-pair STDP kernel: additive weights, weight-only
/// plastic words, 10-entry post histories.
pub type NearestAdditiveKernel =
    StdpProcessor<NearestPairRule, AdditiveWeightDependence, WeightOnly, 10, 3, 10>;

/// Reference pair STDP kernel.
pub type PairAdditiveKernel =
    StdpProcessor<PairRule, AdditiveWeightDependence, WeightOnly, 10, 3, 10>;

/// A fully-assembled core plus its store image.
#[derive(Debug)]
pub struct Simulation<P: RowProcessor> {
    core: SynapseCore<P>,
    store: HostStore,
    system: SystemConfig,
    poisson: Option<(PoissonSource, StdRng)>,
}

impl<P: RowProcessor> Simulation<P> {
    /// Run the configured number of ticks to completion.
    ///
    /// # Errors
    ///
    /// Fails on fatal store faults; exit code 0 territory otherwise.
    pub fn run(&mut self) -> Result<Diagnostics> {
        let ticks = self.system.simulation_ticks;
        info!(
            ticks,
            period_us = self.system.timer_period_us,
            "starting simulation"
        );
        for tick in 1..=ticks {
            if let Some((source, rng)) = &mut self.poisson {
                let queue = &self.core;
                let key_base = self.system.key_base;
                source.update(tick, rng, &mut |index| {
                    queue.enqueue_spike(key_base | index);
                });
            }
            self.core.tick(tick, &mut self.store)?;
        }
        self.core.diagnostics().log_summary();
        Ok(*self.core.diagnostics())
    }

    /// The core (spike injection, post-spike feedback, counters).
    pub fn core_mut(&mut self) -> &mut SynapseCore<P> {
        &mut self.core
    }

    /// The core, shared.
    #[must_use]
    pub fn core(&self) -> &SynapseCore<P> {
        &self.core
    }

    /// The store image.
    #[must_use]
    pub fn store(&self) -> &HostStore {
        &self.store
    }

    /// The parsed System region.
    #[must_use]
    pub fn system(&self) -> &SystemConfig {
        &self.system
    }
}

struct LoadedParts {
    store: HostStore,
    blob: ConfigBlob,
    system: SystemConfig,
}

fn load_common(bytes: &Bytes) -> Result<LoadedParts> {
    let store = HostStore::from_bytes(bytes)?;
    let blob = ConfigBlob::parse_words(store.words().to_vec())?;
    let system = SystemConfig::read(blob.require(RegionId::System, "System")?)?;
    // The matrix must be present even though rows are reached through the
    // key lookup: a blob without one is a packaging error
    blob.require(RegionId::SynapticMatrix, "SynapticMatrix")?;
    Ok(LoadedParts {
        store,
        blob,
        system,
    })
}

fn assemble<P: RowProcessor>(parts: LoadedParts, processor: P) -> Result<Simulation<P>> {
    let LoadedParts {
        store,
        blob,
        system,
    } = parts;

    let lookup = read_key_lookup(blob.require(RegionId::KeyLookup, "KeyLookup")?)?;
    let mut core = SynapseCore::new(
        processor,
        lookup,
        system.post_count as usize,
        CoreConfig::for_kind(system.synapse_kind),
    );

    if let Some(payload) = blob.region(RegionId::OutputBuffer) {
        if payload.len() < system.post_count as usize {
            return Err(RuntimeError::malformed_region(
                "OutputBuffer",
                format!(
                    "mailbox of {} words cannot hold {} post-neurons",
                    payload.len(),
                    system.post_count
                ),
            ));
        }
        let base = blob.region_offset(RegionId::OutputBuffer).expect("present");
        core.set_output_base(base as u32);
    }

    if let Some(payload) = blob.region(RegionId::SpikeRecording) {
        let base = blob
            .region_offset(RegionId::SpikeRecording)
            .expect("present");
        core.set_recording(SpikeRecord::new(base as u32, payload.len() as u32));
    }

    let poisson = match blob.region(RegionId::PoissonSource) {
        Some(payload) => {
            let Some((&seed, rest)) = payload.split_first() else {
                return Err(RuntimeError::malformed_region(
                    "PoissonSource",
                    "missing seed word",
                ));
            };
            let source = PoissonSource::read_region(rest)?;
            Some((source, StdRng::seed_from_u64(u64::from(seed))))
        }
        None => None,
    };

    Ok(Simulation {
        core,
        store,
        system,
        poisson,
    })
}

/// Load a static-synapse simulation from a configuration blob.
///
/// # Errors
///
/// Fails on any configuration fault (bad header, missing or malformed
/// regions, mis-sorted key table) — the simulation never starts.
pub fn load_static(bytes: &Bytes) -> Result<Simulation<StaticKernel>> {
    let parts = load_common(bytes)?;
    let processor = StaticKernel::new(parts.system.max_row_synapses as usize);
    assemble(parts, processor)
}

/// Load a nearest-pair additive STDP simulation from a configuration
/// blob.
///
/// # Errors
///
/// As [`load_static`], plus plasticity-parameter faults.
pub fn load_stdp_nearest_additive(bytes: &Bytes) -> Result<Simulation<NearestAdditiveKernel>> {
    let parts = load_common(bytes)?;
    let mut processor = NearestAdditiveKernel::new(
        NearestPairRule::default(),
        AdditiveWeightDependence::default(),
        WeightOnly,
        parts.system.max_row_synapses as usize,
        parts.system.post_count as usize,
    );
    read_plasticity(&parts, &mut processor)?;
    assemble(parts, processor)
}

/// Load a pair-rule additive STDP simulation from a configuration blob.
///
/// # Errors
///
/// As [`load_stdp_nearest_additive`].
pub fn load_stdp_pair_additive(bytes: &Bytes) -> Result<Simulation<PairAdditiveKernel>> {
    let parts = load_common(bytes)?;
    let mut processor = PairAdditiveKernel::new(
        PairRule::default(),
        AdditiveWeightDependence::default(),
        WeightOnly,
        parts.system.max_row_synapses as usize,
        parts.system.post_count as usize,
    );
    read_plasticity(&parts, &mut processor)?;
    assemble(parts, processor)
}

fn read_plasticity<T, W, S, const I: u32, const D: u32, const H: usize>(
    parts: &LoadedParts,
    processor: &mut StdpProcessor<T, W, S, I, D, H>,
) -> Result<()>
where
    T: synmesh_core::TimingDependence,
    W: synmesh_core::WeightDependence,
    S: synmesh_core::SynapseStructure<W>,
{
    let words = parts
        .blob
        .require(RegionId::PlasticityData, "PlasticityData")?;
    // Timing tables first, weight bounds after, matching the writer
    let used = processor.timing_mut().read_params(words)?;
    processor.weight_mut().read_params(&words[used..])?;
    Ok(())
}

/// A simulation of whichever kernel the System region names.
#[derive(Debug)]
pub enum AnySimulation {
    /// Fixed-weight rows.
    Static(Simulation<StaticKernel>),
    /// Nearest-pair STDP rows.
    StdpNearestAdditive(Simulation<NearestAdditiveKernel>),
    /// Pair STDP rows.
    StdpPairAdditive(Simulation<PairAdditiveKernel>),
}

impl AnySimulation {
    /// Load from a configuration blob, dispatching on the synapse kind.
    ///
    /// # Errors
    ///
    /// As the kind-specific loaders.
    pub fn load(bytes: &Bytes) -> Result<Self> {
        let probe = ConfigBlob::parse(bytes)?;
        let system = SystemConfig::read(probe.require(RegionId::System, "System")?)?;
        Ok(match system.synapse_kind {
            SynapseKind::Static => Self::Static(load_static(bytes)?),
            SynapseKind::StdpNearestAdditive => {
                Self::StdpNearestAdditive(load_stdp_nearest_additive(bytes)?)
            }
            SynapseKind::StdpPairAdditive => {
                Self::StdpPairAdditive(load_stdp_pair_additive(bytes)?)
            }
        })
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// As [`Simulation::run`].
    pub fn run(&mut self) -> Result<Diagnostics> {
        match self {
            Self::Static(sim) => sim.run(),
            Self::StdpNearestAdditive(sim) => sim.run(),
            Self::StdpPairAdditive(sim) => sim.run(),
        }
    }

    /// The parsed System region.
    #[must_use]
    pub fn system(&self) -> &SystemConfig {
        match self {
            Self::Static(sim) => sim.system(),
            Self::StdpNearestAdditive(sim) => sim.system(),
            Self::StdpPairAdditive(sim) => sim.system(),
        }
    }
}
