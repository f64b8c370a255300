//! Connectivity patterns.
//!
//! A connector decides, for one pre-synaptic row, which post-neurons it
//! reaches. Connectors are opaque producers over an RNG; the generator
//! never looks inside them.

use crate::error::{MatGenError, Result};
use rand::{Rng, RngCore};

/// Produces the post-neuron indices of one row.
pub trait ConnectorGenerator {
    /// Indices for `row`, at most `max_synapses`, each below `post_count`.
    fn generate(
        &self,
        row: u32,
        max_synapses: usize,
        post_count: u32,
        rng: &mut dyn RngCore,
    ) -> Vec<u32>;
}

/// Every pre-neuron connects to every post-neuron.
#[derive(Debug, Clone, Copy)]
pub struct AllToAll {
    /// Whether a neuron may connect to its own index.
    pub allow_self_connections: bool,
}

impl AllToAll {
    /// All-to-all including self connections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_self_connections: true,
        }
    }
}

impl Default for AllToAll {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorGenerator for AllToAll {
    fn generate(
        &self,
        row: u32,
        max_synapses: usize,
        post_count: u32,
        _rng: &mut dyn RngCore,
    ) -> Vec<u32> {
        (0..post_count)
            .filter(|&post| self.allow_self_connections || post != row)
            .take(max_synapses)
            .collect()
    }
}

/// Each pre-neuron connects to the post-neuron with its own index.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToOne;

impl ConnectorGenerator for OneToOne {
    fn generate(
        &self,
        row: u32,
        max_synapses: usize,
        post_count: u32,
        _rng: &mut dyn RngCore,
    ) -> Vec<u32> {
        if row < post_count && max_synapses > 0 {
            vec![row]
        } else {
            Vec::new()
        }
    }
}

/// Each (pre, post) pair connects independently with fixed probability.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbability {
    probability: f64,
    allow_self_connections: bool,
}

impl FixedProbability {
    /// Create a Bernoulli connector.
    ///
    /// # Errors
    ///
    /// Fails if `probability` is outside `[0, 1]`.
    pub fn new(probability: f64, allow_self_connections: bool) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(MatGenError::invalid_parameter(format!(
                "connection probability {probability} outside [0, 1]"
            )));
        }
        Ok(Self {
            probability,
            allow_self_connections,
        })
    }
}

impl ConnectorGenerator for FixedProbability {
    fn generate(
        &self,
        row: u32,
        max_synapses: usize,
        post_count: u32,
        rng: &mut dyn RngCore,
    ) -> Vec<u32> {
        (0..post_count)
            .filter(|&post| {
                (self.allow_self_connections || post != row)
                    && rng.gen_bool(self.probability)
            })
            .take(max_synapses)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn all_to_all_covers_every_post() {
        let mut rng = StdRng::seed_from_u64(1);
        let indices = AllToAll::new().generate(0, 1024, 20, &mut rng);
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn all_to_all_can_exclude_self() {
        let mut rng = StdRng::seed_from_u64(1);
        let connector = AllToAll {
            allow_self_connections: false,
        };
        let indices = connector.generate(3, 1024, 8, &mut rng);
        assert!(!indices.contains(&3));
        assert_eq!(indices.len(), 7);
    }

    #[test]
    fn one_to_one_maps_row_to_index() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(OneToOne.generate(5, 16, 10, &mut rng), vec![5]);
        assert!(OneToOne.generate(12, 16, 10, &mut rng).is_empty());
    }

    #[test]
    fn fixed_probability_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        let never = FixedProbability::new(0.0, true).unwrap();
        assert!(never.generate(0, 64, 64, &mut rng).is_empty());

        let always = FixedProbability::new(1.0, true).unwrap();
        assert_eq!(always.generate(0, 64, 64, &mut rng).len(), 64);
    }

    #[test]
    fn fixed_probability_is_seeded() {
        let connector = FixedProbability::new(0.3, true).unwrap();
        let a = connector.generate(0, 128, 128, &mut StdRng::seed_from_u64(9));
        let b = connector.generate(0, 128, 128, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_probability_rejected() {
        assert!(FixedProbability::new(1.5, true).is_err());
    }
}
