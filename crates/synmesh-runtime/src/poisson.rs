//! Poisson spike stimulus.
//!
//! The stimulus variant of a core: instead of receiving spikes it emits
//! them, one independent Poisson process per source neuron. Slow sources
//! draw exponential inter-spike intervals and sleep between them; fast
//! sources draw a per-tick spike count. The split keeps per-tick work
//! proportional to actual activity.

use crate::error::{Result, RuntimeError};
use rand::Rng;
use rand_distr::{Distribution, Exp, Poisson};
use tracing::debug;

/// Rate threshold (spikes per tick) above which a source switches from
/// interval sampling to per-tick counts.
const FAST_SOURCE_THRESHOLD: f64 = 0.25;

/// Fixed-point scale of rates in the PoissonSource region (16.16).
const RATE_FIXED_ONE: f64 = 65536.0;

#[derive(Debug, Clone)]
enum SourceState {
    /// Exponential inter-spike intervals; `next_tick` is the pending spike.
    Slow { mean_isi_ticks: f64, next_tick: u32 },
    /// Per-tick Poisson spike counts.
    Fast { rate: f64 },
}

/// Independent Poisson processes, one per source neuron.
#[derive(Debug, Clone)]
pub struct PoissonSource {
    sources: Vec<SourceState>,
}

impl PoissonSource {
    /// Create from per-source rates in spikes per tick.
    ///
    /// # Errors
    ///
    /// Fails on a negative or non-finite rate.
    pub fn new(rates: &[f64]) -> Result<Self> {
        let sources = rates
            .iter()
            .map(|&rate| {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(RuntimeError::malformed_region(
                        "PoissonSource",
                        format!("invalid rate {rate}"),
                    ));
                }
                Ok(if rate > FAST_SOURCE_THRESHOLD {
                    SourceState::Fast { rate }
                } else {
                    SourceState::Slow {
                        mean_isi_ticks: if rate > 0.0 { 1.0 / rate } else { f64::INFINITY },
                        next_tick: 0,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(sources = sources.len(), "poisson source built");
        Ok(Self { sources })
    }

    /// Read from the PoissonSource region: a count word, then one 16.16
    /// fixed-point rate word (spikes per tick) per source.
    ///
    /// # Errors
    ///
    /// Fails on truncation.
    pub fn read_region(words: &[u32]) -> Result<Self> {
        let Some((&count, rest)) = words.split_first() else {
            return Err(RuntimeError::malformed_region(
                "PoissonSource",
                "empty region",
            ));
        };
        let count = count as usize;
        if rest.len() < count {
            return Err(RuntimeError::malformed_region(
                "PoissonSource",
                format!("{count} sources need {count} rate words, have {}", rest.len()),
            ));
        }
        let rates: Vec<f64> = rest[..count]
            .iter()
            .map(|&raw| f64::from(raw) / RATE_FIXED_ONE)
            .collect();
        Self::new(&rates)
    }

    /// Encode rates into region words.
    #[must_use]
    pub fn write_region(rates: &[f64]) -> Vec<u32> {
        let mut words = Vec::with_capacity(1 + rates.len());
        words.push(rates.len() as u32);
        words.extend(rates.iter().map(|rate| (rate * RATE_FIXED_ONE) as u32));
        words
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether there are no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Advance all sources by one tick, calling `emit(source_index)` for
    /// each spike produced.
    pub fn update(&mut self, tick: u32, rng: &mut impl Rng, emit: &mut dyn FnMut(u32)) {
        for (index, source) in self.sources.iter_mut().enumerate() {
            match source {
                SourceState::Slow {
                    mean_isi_ticks,
                    next_tick,
                } => {
                    if !mean_isi_ticks.is_finite() {
                        continue;
                    }
                    if *next_tick == 0 {
                        // First tick: seed the initial interval
                        *next_tick = tick + draw_isi(rng, *mean_isi_ticks);
                    }
                    while *next_tick == tick {
                        emit(index as u32);
                        *next_tick = tick + draw_isi(rng, *mean_isi_ticks);
                    }
                }
                SourceState::Fast { rate } => {
                    let poisson = Poisson::new(*rate).expect("rate validated positive");
                    let spikes = poisson.sample(rng) as u32;
                    for _ in 0..spikes {
                        emit(index as u32);
                    }
                }
            }
        }
    }
}

fn draw_isi(rng: &mut impl Rng, mean_isi_ticks: f64) -> u32 {
    let exp = Exp::new(1.0 / mean_isi_ticks).expect("mean validated positive");
    // At least one tick: a source cannot spike twice in the same slot here
    (exp.sample(rng).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spike_train(rates: &[f64], ticks: u32, seed: u64) -> Vec<(u32, u32)> {
        let mut source = PoissonSource::new(rates).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut spikes = Vec::new();
        for tick in 1..=ticks {
            source.update(tick, &mut rng, &mut |index| spikes.push((tick, index)));
        }
        spikes
    }

    #[test]
    fn same_seed_same_train() {
        let a = spike_train(&[0.1, 2.0, 0.0], 500, 42);
        let b = spike_train(&[0.1, 2.0, 0.0], 500, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_rate_never_spikes() {
        let spikes = spike_train(&[0.0], 1000, 7);
        assert!(spikes.is_empty());
    }

    #[test]
    fn rate_roughly_honoured() {
        let spikes = spike_train(&[0.1], 10_000, 3);
        let count = spikes.len() as f64;
        // 1000 expected; allow generous slack for a single run
        assert!((600.0..1400.0).contains(&count), "got {count} spikes");

        let fast = spike_train(&[2.0], 1000, 3);
        let count = fast.len() as f64;
        assert!((1600.0..2400.0).contains(&count), "got {count} spikes");
    }

    #[test]
    fn region_round_trip() {
        let words = PoissonSource::write_region(&[0.5, 1.25]);
        let source = PoissonSource::read_region(&words).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn negative_rate_rejected() {
        assert!(PoissonSource::new(&[-1.0]).is_err());
    }
}
