//! Plasticity policies for the STDP row kernel.
//!
//! The kernel is assembled from three capabilities, mirrored on the three
//! axes a plasticity rule varies on:
//!
//! - [`WeightDependence`] — how depression/potentiation amounts move a
//!   weight between its saturating bounds ([`AdditiveWeightDependence`],
//!   [`MultiplicativeWeightDependence`]);
//! - [`TimingDependence`] — how spike-time differences turn into those
//!   amounts, via decaying traces and lookup tables ([`PairRule`],
//!   [`NearestPairRule`]);
//! - [`SynapseStructure`] — the in-row plastic word layout and the
//!   per-synapse running state during an update ([`WeightOnly`]).
//!
//! Timing rules deliver their results through an [`UpdateHandler`] carrying
//! the per-synapse state, so one object receives both the depression and
//! potentiation callbacks without aliasing.
//!
//! All arithmetic is integer fixed point: traces and rule amounts are
//! [`S2011`] scalars, weights are unsigned 16-bit values in the weight
//! fixed-point format chosen at matrix generation.

mod structure;
mod timing;
mod weight;

pub use structure::{FinalState, SynapseStructure, WeightOnly};
pub use timing::{ExpDecayLut, NearestPairRule, PairRule};
pub use weight::{AdditiveWeightDependence, MultiplicativeWeightDependence};

use crate::error::Result;

/// Signed fixed-point scalar with 11 fractional bits.
///
/// The domain of traces and of depression/potentiation amounts.
pub type S2011 = i32;

/// 1.0 in the [`S2011`] format.
pub const S2011_ONE: S2011 = 1 << 11;

/// Multiply two [`S2011`] values.
#[must_use]
pub const fn s2011_mul(a: S2011, b: S2011) -> S2011 {
    ((a as i64 * b as i64) >> 11) as S2011
}

/// A trace sample that can round-trip through row words.
///
/// `WORDS` is the number of 32-bit words the sample occupies in the row's
/// pre-trace payload; rules without per-spike state use `()` and occupy
/// none.
pub trait Trace: Copy + Default + std::fmt::Debug {
    /// Words of row payload this trace occupies.
    const WORDS: usize;

    /// Decode a trace from `Self::WORDS` row words.
    fn read(words: &[u32]) -> Self;

    /// Encode this trace into `Self::WORDS` row words.
    fn write(self, words: &mut [u32]);
}

impl Trace for u16 {
    const WORDS: usize = 1;

    fn read(words: &[u32]) -> Self {
        words[0] as u16
    }

    fn write(self, words: &mut [u32]) {
        words[0] = u32::from(self);
    }
}

impl Trace for () {
    const WORDS: usize = 0;

    fn read(_words: &[u32]) -> Self {}

    fn write(self, _words: &mut [u32]) {}
}

/// Receiver of the depression/potentiation amounts a timing rule produces
/// while consuming one spike event.
pub trait UpdateHandler {
    /// Apply a depression of `amount` to the synapse under update.
    fn depress(&mut self, amount: S2011);

    /// Apply a potentiation of `amount` to the synapse under update.
    fn potentiate(&mut self, amount: S2011);
}

/// Weight-update policy: bounded application of depression and
/// potentiation amounts.
pub trait WeightDependence {
    /// Accumulated update state for one synapse.
    type State: Copy;

    /// Start an update from the stored weight.
    fn begin(&self, weight: u16) -> Self::State;

    /// Apply a depression amount.
    fn apply_depression(&self, state: &mut Self::State, amount: S2011);

    /// Apply a potentiation amount.
    fn apply_potentiation(&self, state: &mut Self::State, amount: S2011);

    /// Resolve the update to a weight within the saturating bounds.
    fn final_weight(&self, state: Self::State) -> u16;

    /// Read rule parameters from a configuration region, returning the
    /// number of words consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is truncated or a value is out of
    /// range.
    fn read_params(&mut self, words: &[u32]) -> Result<usize>;
}

/// Timing policy: converts spike-time relationships into depression and
/// potentiation amounts, and maintains the pre/post traces.
pub trait TimingDependence {
    /// Pre-synaptic trace stored in the row header.
    type PreTrace: Trace;
    /// Post-synaptic trace stored in the post-event history.
    type PostTrace: Trace;

    /// New pre-trace after a pre-spike at `tick`, given the previous
    /// sample.
    fn update_pre_trace(
        &self,
        tick: u32,
        last_trace: Self::PreTrace,
        last_tick: u32,
    ) -> Self::PreTrace;

    /// New post-trace after a post-spike at `tick`, given the previous
    /// sample.
    fn update_post_trace(
        &self,
        tick: u32,
        last_trace: Self::PostTrace,
        last_tick: u32,
    ) -> Self::PostTrace;

    /// Consume a pre-synaptic spike at `delayed_pre_tick`.
    ///
    /// The neighbourhood is the last pre-spike pair and the most recent
    /// post event at or before the pre-spike (the window cursor's final
    /// "previous" entry).
    #[allow(clippy::too_many_arguments)]
    fn apply_pre_spike(
        &self,
        handler: &mut dyn UpdateHandler,
        delayed_pre_tick: u32,
        new_pre_trace: Self::PreTrace,
        delayed_last_pre_tick: u32,
        last_pre_trace: Self::PreTrace,
        last_post_tick: u32,
        last_post_trace: Self::PostTrace,
    );

    /// Consume a post-synaptic spike at `delayed_post_tick`.
    #[allow(clippy::too_many_arguments)]
    fn apply_post_spike(
        &self,
        handler: &mut dyn UpdateHandler,
        delayed_post_tick: u32,
        post_trace: Self::PostTrace,
        delayed_last_pre_tick: u32,
        last_pre_trace: Self::PreTrace,
        last_post_tick: u32,
        last_post_trace: Self::PostTrace,
    );

    /// Read rule parameters (decay tables) from a configuration region,
    /// returning the number of words consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is truncated or a table is empty.
    fn read_params(&mut self, words: &[u32]) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2011_one_is_unit() {
        assert_eq!(s2011_mul(S2011_ONE, S2011_ONE), S2011_ONE);
        assert_eq!(s2011_mul(3 * S2011_ONE, S2011_ONE / 2), 3 * S2011_ONE / 2);
    }

    #[test]
    fn s2011_mul_handles_negatives() {
        assert_eq!(s2011_mul(-S2011_ONE, S2011_ONE), -S2011_ONE);
    }

    #[test]
    fn u16_trace_round_trips() {
        let mut words = [0u32; 1];
        0xBEEFu16.write(&mut words);
        assert_eq!(u16::read(&words), 0xBEEF);
    }

    #[test]
    fn unit_trace_occupies_no_words() {
        assert_eq!(<() as Trace>::WORDS, 0);
    }
}
