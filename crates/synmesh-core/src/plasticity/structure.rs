//! In-row plastic word layout.

use super::{WeightDependence, S2011};

/// Result of resolving one synapse's update: the weight to deposit and the
/// plastic word to write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalState {
    /// Weight deposited into the ring buffer on a non-flush invocation.
    pub weight: u16,
    /// Plastic word written back into the row.
    pub plastic_word: u16,
}

/// Per-synapse plastic word layout and running update state.
///
/// Constructed from a plastic word at the start of a row update, mutated
/// by the weight dependence as events are consumed, and resolved to a
/// [`FinalState`] at the end.
pub trait SynapseStructure<W: WeightDependence> {
    /// Running state while the row update is in flight.
    type State: Copy;

    /// Decode a plastic word into an update state.
    fn from_plastic_word(&self, word: u16, dependence: &W) -> Self::State;

    /// Route a depression amount into the state.
    fn apply_depression(&self, state: &mut Self::State, amount: S2011, dependence: &W);

    /// Route a potentiation amount into the state.
    fn apply_potentiation(&self, state: &mut Self::State, amount: S2011, dependence: &W);

    /// Resolve the state to a final weight and plastic word.
    fn final_state(&self, state: Self::State, dependence: &W) -> FinalState;
}

/// The plastic word is the bare weight; no additional structural state.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightOnly;

impl<W: WeightDependence> SynapseStructure<W> for WeightOnly {
    type State = W::State;

    fn from_plastic_word(&self, word: u16, dependence: &W) -> Self::State {
        dependence.begin(word)
    }

    fn apply_depression(&self, state: &mut Self::State, amount: S2011, dependence: &W) {
        dependence.apply_depression(state, amount);
    }

    fn apply_potentiation(&self, state: &mut Self::State, amount: S2011, dependence: &W) {
        dependence.apply_potentiation(state, amount);
    }

    fn final_state(&self, state: Self::State, dependence: &W) -> FinalState {
        let weight = dependence.final_weight(state);
        FinalState {
            weight,
            plastic_word: weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plasticity::{AdditiveWeightDependence, S2011_ONE};

    #[test]
    fn weight_only_word_is_the_weight() {
        let dependence = AdditiveWeightDependence::new(0, 2000, S2011_ONE, S2011_ONE);
        let structure = WeightOnly;
        let mut state = structure.from_plastic_word(800, &dependence);
        structure.apply_potentiation(&mut state, 150, &dependence);
        let fin = structure.final_state(state, &dependence);
        assert_eq!(fin.weight, 950);
        assert_eq!(fin.plastic_word, fin.weight);
    }
}
