//! Weight-dependence variants.

use super::{s2011_mul, WeightDependence, S2011};
use crate::error::{CoreError, Result};

fn read_bounds(words: &[u32]) -> Result<(u16, u16)> {
    if words.len() < 4 {
        return Err(CoreError::ParamsTruncated {
            needed: 4,
            available: words.len(),
        });
    }
    let min_weight = words[0] as u16;
    let max_weight = words[1] as u16;
    if min_weight > max_weight {
        return Err(CoreError::invalid_param(format!(
            "weight bounds inverted: min {min_weight} > max {max_weight}"
        )));
    }
    Ok((min_weight, max_weight))
}

/// Additive weight dependence.
///
/// Depression and potentiation amounts accumulate separately during the
/// row update and are resolved in a single clamped step, so within one
/// update the order of events cannot push the weight through a bound.
#[derive(Debug, Clone, Default)]
pub struct AdditiveWeightDependence {
    /// Lower saturating weight bound.
    pub min_weight: u16,
    /// Upper saturating weight bound.
    pub max_weight: u16,
    /// Potentiation scale, in weight units per unit trace.
    pub a2_plus: S2011,
    /// Depression scale, in weight units per unit trace.
    pub a2_minus: S2011,
}

impl AdditiveWeightDependence {
    /// Create an additive rule with explicit bounds and scales.
    #[must_use]
    pub fn new(min_weight: u16, max_weight: u16, a2_plus: S2011, a2_minus: S2011) -> Self {
        Self {
            min_weight,
            max_weight,
            a2_plus,
            a2_minus,
        }
    }
}

/// Running state of an additive update.
#[derive(Debug, Clone, Copy)]
pub struct AdditiveState {
    weight: i32,
    potentiation: S2011,
    depression: S2011,
}

impl WeightDependence for AdditiveWeightDependence {
    type State = AdditiveState;

    fn begin(&self, weight: u16) -> Self::State {
        AdditiveState {
            weight: i32::from(weight),
            potentiation: 0,
            depression: 0,
        }
    }

    fn apply_depression(&self, state: &mut Self::State, amount: S2011) {
        state.depression = state.depression.saturating_add(amount);
    }

    fn apply_potentiation(&self, state: &mut Self::State, amount: S2011) {
        state.potentiation = state.potentiation.saturating_add(amount);
    }

    fn final_weight(&self, state: Self::State) -> u16 {
        let delta =
            s2011_mul(state.potentiation, self.a2_plus) - s2011_mul(state.depression, self.a2_minus);
        (state.weight + delta).clamp(i32::from(self.min_weight), i32::from(self.max_weight)) as u16
    }

    fn read_params(&mut self, words: &[u32]) -> Result<usize> {
        let (min_weight, max_weight) = read_bounds(words)?;
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self.a2_plus = words[2] as S2011;
        self.a2_minus = words[3] as S2011;
        Ok(4)
    }
}

/// Multiplicative weight dependence.
///
/// Each amount is applied immediately, scaled by the distance to the
/// relevant bound, so updates soften as the weight approaches saturation.
#[derive(Debug, Clone, Default)]
pub struct MultiplicativeWeightDependence {
    /// Lower saturating weight bound.
    pub min_weight: u16,
    /// Upper saturating weight bound.
    pub max_weight: u16,
    /// Potentiation scale, as an [`S2011`] fraction of the headroom.
    pub a2_plus: S2011,
    /// Depression scale, as an [`S2011`] fraction of the margin above min.
    pub a2_minus: S2011,
}

impl MultiplicativeWeightDependence {
    /// Create a multiplicative rule with explicit bounds and scales.
    #[must_use]
    pub fn new(min_weight: u16, max_weight: u16, a2_plus: S2011, a2_minus: S2011) -> Self {
        Self {
            min_weight,
            max_weight,
            a2_plus,
            a2_minus,
        }
    }
}

impl WeightDependence for MultiplicativeWeightDependence {
    type State = i32;

    fn begin(&self, weight: u16) -> Self::State {
        i32::from(weight)
    }

    fn apply_depression(&self, state: &mut Self::State, amount: S2011) {
        let margin = *state - i32::from(self.min_weight);
        *state -= s2011_mul(s2011_mul(amount, self.a2_minus), margin);
    }

    fn apply_potentiation(&self, state: &mut Self::State, amount: S2011) {
        let headroom = i32::from(self.max_weight) - *state;
        *state += s2011_mul(s2011_mul(amount, self.a2_plus), headroom);
    }

    fn final_weight(&self, state: Self::State) -> u16 {
        state.clamp(i32::from(self.min_weight), i32::from(self.max_weight)) as u16
    }

    fn read_params(&mut self, words: &[u32]) -> Result<usize> {
        let (min_weight, max_weight) = read_bounds(words)?;
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self.a2_plus = words[2] as S2011;
        self.a2_minus = words[3] as S2011;
        Ok(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plasticity::S2011_ONE;

    #[test]
    fn additive_resolves_once_within_bounds() {
        let rule = AdditiveWeightDependence::new(0, 1000, S2011_ONE, S2011_ONE);
        let mut state = rule.begin(500);
        rule.apply_potentiation(&mut state, 300);
        rule.apply_depression(&mut state, 100);
        assert_eq!(rule.final_weight(state), 700);
    }

    #[test]
    fn additive_clamps_to_bounds() {
        let rule = AdditiveWeightDependence::new(100, 1000, S2011_ONE, S2011_ONE);
        let mut state = rule.begin(150);
        rule.apply_depression(&mut state, 10_000);
        assert_eq!(rule.final_weight(state), 100);

        let mut state = rule.begin(950);
        rule.apply_potentiation(&mut state, 10_000);
        assert_eq!(rule.final_weight(state), 1000);
    }

    #[test]
    fn multiplicative_scales_with_distance_to_bound() {
        let rule = MultiplicativeWeightDependence::new(0, 1024, S2011_ONE / 2, S2011_ONE / 2);
        // Half headroom times half scale: 512 + (1024-512)/4 = 640
        let mut state = rule.begin(512);
        rule.apply_potentiation(&mut state, S2011_ONE / 2);
        assert_eq!(rule.final_weight(state), 640);
    }

    #[test]
    fn multiplicative_never_leaves_bounds() {
        let rule = MultiplicativeWeightDependence::new(0, 1024, S2011_ONE, S2011_ONE);
        let mut state = rule.begin(1024);
        // Full-strength potentiation at the top bound is a no-op
        rule.apply_potentiation(&mut state, S2011_ONE);
        assert_eq!(rule.final_weight(state), 1024);

        let mut state = rule.begin(0);
        rule.apply_depression(&mut state, S2011_ONE);
        assert_eq!(rule.final_weight(state), 0);
    }

    #[test]
    fn read_params_rejects_inverted_bounds() {
        let mut rule = AdditiveWeightDependence::default();
        let words = [500, 100, 0, 0];
        assert!(rule.read_params(&words).is_err());
    }

    #[test]
    fn read_params_rejects_truncation() {
        let mut rule = MultiplicativeWeightDependence::default();
        assert!(matches!(
            rule.read_params(&[0, 10]),
            Err(CoreError::ParamsTruncated { needed: 4, .. })
        ));
    }
}
