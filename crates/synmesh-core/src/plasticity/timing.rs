//! Timing-dependence variants and their decay tables.

// Spike-application methods carry the full neighbourhood tuple
#![allow(clippy::too_many_arguments)]

use super::{s2011_mul, TimingDependence, UpdateHandler, S2011, S2011_ONE};
use crate::error::{CoreError, Result};

/// Lookup table mapping a tick delta to a decayed [`S2011`] factor.
///
/// Entry `i` approximates `exp(-i / tau)`; deltas past the end of the
/// table read as zero, which is what bounds the reach of a rule.
#[derive(Debug, Clone, Default)]
pub struct ExpDecayLut {
    entries: Vec<u16>,
}

impl ExpDecayLut {
    /// Build a table from raw entries (the configuration-blob path).
    #[must_use]
    pub fn from_entries(entries: Vec<u16>) -> Self {
        Self { entries }
    }

    /// Build an exponential table host-side from a time constant.
    ///
    /// # Panics
    ///
    /// Panics if `tau_ticks` is not positive or `len` is zero.
    #[must_use]
    pub fn exponential(tau_ticks: f32, len: usize) -> Self {
        assert!(tau_ticks > 0.0, "decay time constant must be positive");
        assert!(len > 0, "decay table cannot be empty");
        let entries = (0..len)
            .map(|i| {
                let value = (f64::from(S2011_ONE) * f64::exp(-(i as f64) / f64::from(tau_ticks)))
                    .round();
                value as u16
            })
            .collect();
        Self { entries }
    }

    /// Decay factor for a tick delta (zero past the end of the table).
    #[must_use]
    pub fn lookup(&self, delta: u32) -> S2011 {
        self.entries
            .get(delta as usize)
            .copied()
            .map_or(0, S2011::from)
    }

    /// Table length in entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a table from a parameter region: a length word followed by one
    /// entry per word.
    fn read_from(words: &[u32]) -> Result<(Self, usize)> {
        let Some((&len, rest)) = words.split_first() else {
            return Err(CoreError::ParamsTruncated {
                needed: 1,
                available: 0,
            });
        };
        let len = len as usize;
        if len == 0 {
            return Err(CoreError::invalid_param("empty decay table"));
        }
        if rest.len() < len {
            return Err(CoreError::ParamsTruncated {
                needed: 1 + len,
                available: words.len(),
            });
        }
        let entries = rest[..len].iter().map(|&w| w as u16).collect();
        Ok((Self { entries }, 1 + len))
    }
}

/// Pair-based STDP: every pre/post crossing contributes, weighted by
/// accumulating exponential traces.
///
/// A spike bumps its side's trace by one (in [`S2011`] units) on top of
/// the decayed previous value; the opposite side reads that trace decayed
/// to its own spike time.
#[derive(Debug, Clone, Default)]
pub struct PairRule {
    tau_plus: ExpDecayLut,
    tau_minus: ExpDecayLut,
}

impl PairRule {
    /// Create a pair rule from explicit decay tables.
    #[must_use]
    pub fn new(tau_plus: ExpDecayLut, tau_minus: ExpDecayLut) -> Self {
        Self {
            tau_plus,
            tau_minus,
        }
    }
}

impl TimingDependence for PairRule {
    type PreTrace = u16;
    type PostTrace = u16;

    fn update_pre_trace(&self, tick: u32, last_trace: u16, last_tick: u32) -> u16 {
        let decayed = s2011_mul(
            S2011::from(last_trace),
            self.tau_plus.lookup(tick - last_tick),
        );
        (decayed + S2011_ONE).min(S2011::from(u16::MAX)) as u16
    }

    fn update_post_trace(&self, tick: u32, last_trace: u16, last_tick: u32) -> u16 {
        let decayed = s2011_mul(
            S2011::from(last_trace),
            self.tau_minus.lookup(tick - last_tick),
        );
        (decayed + S2011_ONE).min(S2011::from(u16::MAX)) as u16
    }

    fn apply_pre_spike(
        &self,
        handler: &mut dyn UpdateHandler,
        delayed_pre_tick: u32,
        _new_pre_trace: u16,
        _delayed_last_pre_tick: u32,
        _last_pre_trace: u16,
        last_post_tick: u32,
        last_post_trace: u16,
    ) {
        // Pre after post: depress by the post trace decayed to now
        let delta = delayed_pre_tick.saturating_sub(last_post_tick);
        if delta > 0 {
            let amount = s2011_mul(S2011::from(last_post_trace), self.tau_minus.lookup(delta));
            if amount > 0 {
                handler.depress(amount);
            }
        }
    }

    fn apply_post_spike(
        &self,
        handler: &mut dyn UpdateHandler,
        delayed_post_tick: u32,
        _post_trace: u16,
        delayed_last_pre_tick: u32,
        last_pre_trace: u16,
        _last_post_tick: u32,
        _last_post_trace: u16,
    ) {
        // Post after pre: potentiate by the pre trace decayed to now
        let delta = delayed_post_tick.saturating_sub(delayed_last_pre_tick);
        if delta > 0 {
            let amount = s2011_mul(S2011::from(last_pre_trace), self.tau_plus.lookup(delta));
            if amount > 0 {
                handler.potentiate(amount);
            }
        }
    }

    fn read_params(&mut self, words: &[u32]) -> Result<usize> {
        let (tau_plus, used_plus) = ExpDecayLut::read_from(words)?;
        let (tau_minus, used_minus) = ExpDecayLut::read_from(&words[used_plus..])?;
        self.tau_plus = tau_plus;
        self.tau_minus = tau_minus;
        Ok(used_plus + used_minus)
    }
}

/// Nearest-neighbour STDP: only the nearest opposite-side spike
/// contributes, so no traces are carried at all.
///
/// The potentiation amount for a post event is the raw decay factor at the
/// distance to the last pre-spike, and symmetrically for depression.
#[derive(Debug, Clone, Default)]
pub struct NearestPairRule {
    tau_plus: ExpDecayLut,
    tau_minus: ExpDecayLut,
}

impl NearestPairRule {
    /// Create a nearest-pair rule from explicit decay tables.
    #[must_use]
    pub fn new(tau_plus: ExpDecayLut, tau_minus: ExpDecayLut) -> Self {
        Self {
            tau_plus,
            tau_minus,
        }
    }
}

impl TimingDependence for NearestPairRule {
    type PreTrace = ();
    type PostTrace = ();

    fn update_pre_trace(&self, _tick: u32, _last_trace: (), _last_tick: u32) {}

    fn update_post_trace(&self, _tick: u32, _last_trace: (), _last_tick: u32) {}

    fn apply_pre_spike(
        &self,
        handler: &mut dyn UpdateHandler,
        delayed_pre_tick: u32,
        _new_pre_trace: (),
        _delayed_last_pre_tick: u32,
        _last_pre_trace: (),
        last_post_tick: u32,
        _last_post_trace: (),
    ) {
        let delta = delayed_pre_tick.saturating_sub(last_post_tick);
        if delta > 0 {
            let amount = self.tau_minus.lookup(delta);
            if amount > 0 {
                handler.depress(amount);
            }
        }
    }

    fn apply_post_spike(
        &self,
        handler: &mut dyn UpdateHandler,
        delayed_post_tick: u32,
        _post_trace: (),
        delayed_last_pre_tick: u32,
        _last_pre_trace: (),
        _last_post_tick: u32,
        _last_post_trace: (),
    ) {
        let delta = delayed_post_tick.saturating_sub(delayed_last_pre_tick);
        if delta > 0 {
            let amount = self.tau_plus.lookup(delta);
            if amount > 0 {
                handler.potentiate(amount);
            }
        }
    }

    fn read_params(&mut self, words: &[u32]) -> Result<usize> {
        let (tau_plus, used_plus) = ExpDecayLut::read_from(words)?;
        let (tau_minus, used_minus) = ExpDecayLut::read_from(&words[used_plus..])?;
        self.tau_plus = tau_plus;
        self.tau_minus = tau_minus;
        Ok(used_plus + used_minus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        depressions: Vec<S2011>,
        potentiations: Vec<S2011>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                depressions: Vec::new(),
                potentiations: Vec::new(),
            }
        }
    }

    impl UpdateHandler for Recorder {
        fn depress(&mut self, amount: S2011) {
            self.depressions.push(amount);
        }

        fn potentiate(&mut self, amount: S2011) {
            self.potentiations.push(amount);
        }
    }

    fn luts() -> (ExpDecayLut, ExpDecayLut) {
        (
            ExpDecayLut::exponential(20.0, 256),
            ExpDecayLut::exponential(20.0, 256),
        )
    }

    #[test]
    fn exponential_table_starts_at_one() {
        let lut = ExpDecayLut::exponential(16.7, 256);
        assert_eq!(lut.lookup(0), S2011_ONE);
        assert!(lut.lookup(1) < S2011_ONE);
        assert!(lut.lookup(255) < lut.lookup(1));
        assert_eq!(lut.lookup(256), 0);
    }

    #[test]
    fn pair_trace_accumulates() {
        let rule = PairRule::new(luts().0, luts().1);
        let first = rule.update_pre_trace(10, 0, 0);
        assert_eq!(first, S2011_ONE as u16);
        // A second spike soon after rides on the decayed first trace
        let second = rule.update_pre_trace(12, first, 10);
        assert!(second > first);
    }

    #[test]
    fn pair_post_spike_potentiates_from_pre_trace() {
        let rule = PairRule::new(luts().0, luts().1);
        let mut recorder = Recorder::new();
        rule.apply_post_spike(&mut recorder, 15, 0, 10, S2011_ONE as u16, 0, 0);
        assert_eq!(recorder.depressions.len(), 0);
        assert_eq!(recorder.potentiations, vec![rule.tau_plus.lookup(5)]);
    }

    #[test]
    fn pair_ignores_zero_delta() {
        let rule = PairRule::new(luts().0, luts().1);
        let mut recorder = Recorder::new();
        rule.apply_post_spike(&mut recorder, 10, 0, 10, S2011_ONE as u16, 0, 0);
        assert!(recorder.potentiations.is_empty());
    }

    #[test]
    fn nearest_pair_uses_raw_decay() {
        let rule = NearestPairRule::new(luts().0, luts().1);
        let mut recorder = Recorder::new();
        // Post at 7 against last pre at 0, then pre at 10 against post at 7
        rule.apply_post_spike(&mut recorder, 7, (), 0, (), 0, ());
        rule.apply_pre_spike(&mut recorder, 10, (), 0, (), 7, ());
        assert_eq!(recorder.potentiations, vec![rule.tau_plus.lookup(7)]);
        assert_eq!(recorder.depressions, vec![rule.tau_minus.lookup(3)]);
    }

    #[test]
    fn read_params_round_trips_tables() {
        let mut words = vec![3u32, 2048, 1024, 512];
        words.extend_from_slice(&[2, 2048, 1000]);
        let mut rule = PairRule::default();
        let used = rule.read_params(&words).unwrap();
        assert_eq!(used, words.len());
        assert_eq!(rule.tau_plus.lookup(2), 512);
        assert_eq!(rule.tau_minus.lookup(1), 1000);
        assert_eq!(rule.tau_minus.lookup(2), 0);
    }

    #[test]
    fn read_params_rejects_truncated_table() {
        let mut rule = NearestPairRule::default();
        let words = [5u32, 1, 2];
        assert!(matches!(
            rule.read_params(&words),
            Err(CoreError::ParamsTruncated { .. })
        ));
    }
}
