//! Plastic (STDP) row kernel.
//!
//! Plastic updates are deferred: nothing happens when a post-neuron fires,
//! beyond recording the event in its history. The whole cost is paid here,
//! on the next visit to the row — normally a pre-spike, occasionally a
//! flush. For each synapse the kernel replays the post events that fell
//! since the last visit, interleaving them with the remembered pre-spike,
//! then deposits the resolved weight and rewrites the plastic word.
//!
//! A flush refreshes the row without a pre-spike: post events are
//! committed and `last_update_tick` advances, but the pre-trace,
//! `last_pre_tick` and the ring buffer are untouched. Flushing twice at
//! the same tick is therefore a no-op the second time.

use super::{RowProcessor, WriteBack};
use crate::plasticity::{
    SynapseStructure, TimingDependence, Trace, UpdateHandler, WeightDependence, S2011,
};
use crate::post_events::PostEventHistory;
use crate::row::{
    halfwords_to_words, read_halfword, write_halfword, RowLocator, SynapseCodec, PLASTIC_HEADER_WORDS,
    PLASTIC_LAST_PRE, PLASTIC_LAST_UPDATE, ROW_COUNT, ROW_EXTENSION_DELAY, ROW_EXTENSION_LOCATOR,
};
use tracing::trace;

/// Routes a timing rule's depression/potentiation amounts into one
/// synapse's running update state.
struct SynapseUpdate<'a, W: WeightDependence, S: SynapseStructure<W>> {
    structure: &'a S,
    dependence: &'a W,
    state: S::State,
}

impl<W: WeightDependence, S: SynapseStructure<W>> UpdateHandler for SynapseUpdate<'_, W, S> {
    fn depress(&mut self, amount: S2011) {
        self.structure
            .apply_depression(&mut self.state, amount, self.dependence);
    }

    fn potentiate(&mut self, amount: S2011) {
        self.structure
            .apply_potentiation(&mut self.state, amount, self.dependence);
    }
}

/// STDP row kernel, monomorphised over the timing rule `T`, weight rule
/// `W`, synapse structure `S`, control-word index/delay widths `I`/`D`
/// and post-history depth `H`.
#[derive(Debug)]
pub struct StdpProcessor<T, W, S, const I: u32, const D: u32, const H: usize>
where
    T: TimingDependence,
    W: WeightDependence,
    S: SynapseStructure<W>,
{
    timing: T,
    weight: W,
    structure: S,
    max_row_synapses: usize,
    post_history: Vec<PostEventHistory<T::PostTrace, H>>,
}

impl<T, W, S, const I: u32, const D: u32, const H: usize> StdpProcessor<T, W, S, I, D, H>
where
    T: TimingDependence,
    W: WeightDependence,
    S: SynapseStructure<W>,
{
    /// Words of pre-trace payload in every row this kernel owns.
    pub const PRE_TRACE_WORDS: usize = <T::PreTrace as Trace>::WORDS;

    /// Create a kernel for `post_count` post-neurons and rows of up to
    /// `max_row_synapses` synapses.
    #[must_use]
    pub fn new(
        timing: T,
        weight: W,
        structure: S,
        max_row_synapses: usize,
        post_count: usize,
    ) -> Self {
        Self {
            timing,
            weight,
            structure,
            max_row_synapses,
            post_history: (0..post_count).map(|_| PostEventHistory::new()).collect(),
        }
    }

    /// Row length in words for `synapses` synapses: the five-word header,
    /// the pre-trace payload, and the packed plastic and control arrays.
    #[must_use]
    pub fn row_words(synapses: usize) -> usize {
        PLASTIC_HEADER_WORDS + Self::PRE_TRACE_WORDS + 2 * halfwords_to_words(synapses)
    }

    /// Access the timing rule (parameter loading).
    pub fn timing_mut(&mut self) -> &mut T {
        &mut self.timing
    }

    /// Access the weight rule (parameter loading).
    pub fn weight_mut(&mut self) -> &mut W {
        &mut self.weight
    }
}

impl<T, W, S, const I: u32, const D: u32, const H: usize> RowProcessor
    for StdpProcessor<T, W, S, I, D, H>
where
    T: TimingDependence,
    W: WeightDependence,
    S: SynapseStructure<W>,
{
    /// # Panics
    ///
    /// Panics if a control word names a post-neuron index outside the
    /// configured post-neuron count — rows are generated for this core, so
    /// that is a corrupt matrix, not an operational condition.
    fn process_row(
        &mut self,
        tick: u32,
        row: &mut [u32],
        flush: bool,
        apply_input: &mut dyn FnMut(u32, u32, u32),
        add_delay_row: &mut dyn FnMut(u32, RowLocator),
    ) -> Option<WriteBack> {
        let count = row[ROW_COUNT] as usize;
        trace!(tick, count, flush, "processing plastic row");

        if row[ROW_EXTENSION_DELAY] != 0 {
            add_delay_row(
                row[ROW_EXTENSION_DELAY] + tick,
                RowLocator::unpack(row[ROW_EXTENSION_LOCATOR]),
            );
        }

        let last_update_tick = row[PLASTIC_LAST_UPDATE];
        row[PLASTIC_LAST_UPDATE] = tick;

        let pre_trace_end = PLASTIC_HEADER_WORDS + Self::PRE_TRACE_WORDS;
        let last_pre_tick = row[PLASTIC_LAST_PRE];
        let last_pre_trace = T::PreTrace::read(&row[PLASTIC_HEADER_WORDS..pre_trace_end]);

        // A flush carries no pre-spike: the trace and last-pre tick stay
        let new_pre_trace = if flush {
            last_pre_trace
        } else {
            let updated = self.timing.update_pre_trace(tick, last_pre_trace, last_pre_tick);
            row[PLASTIC_LAST_PRE] = tick;
            updated.write(&mut row[PLASTIC_HEADER_WORDS..pre_trace_end]);
            updated
        };

        let plastic_offset = pre_trace_end;
        let control_offset = plastic_offset + halfwords_to_words(count);

        for j in 0..count {
            let control = u32::from(read_halfword(&row[control_offset..], j));
            let post_index = SynapseCodec::<I, D>::index(control);
            let delay_dendritic = SynapseCodec::<I, D>::delay(control);
            let delay_axonal = 0;

            let plastic = read_halfword(&row[plastic_offset..], j);
            let mut update = SynapseUpdate {
                structure: &self.structure,
                dependence: &self.weight,
                state: self.structure.from_plastic_word(plastic, &self.weight),
            };

            let delayed_last_pre_tick = last_pre_tick + delay_axonal;

            // Window starts where the previous row visit stopped, so every
            // post event is consumed exactly once across visits (flushes
            // included)
            let window_begin = (last_update_tick + delay_axonal).saturating_sub(delay_dendritic);
            let window_end = (tick + delay_axonal).saturating_sub(delay_dendritic);

            let mut window =
                self.post_history[post_index as usize].window(window_begin, window_end);

            while window.num_events() > 0 {
                let delayed_post_tick = window.next_time() + delay_dendritic;
                trace!(delayed_post_tick, "applying post-synaptic event");
                self.timing.apply_post_spike(
                    &mut update,
                    delayed_post_tick,
                    window.next_trace(),
                    delayed_last_pre_tick,
                    last_pre_trace,
                    window.prev_time(),
                    window.prev_trace(),
                );
                window.advance(delayed_post_tick);
            }

            if !flush {
                let delayed_pre_tick = tick + delay_axonal;
                trace!(
                    delayed_pre_tick,
                    last_post = window.prev_time(),
                    "applying pre-synaptic event"
                );
                self.timing.apply_pre_spike(
                    &mut update,
                    delayed_pre_tick,
                    new_pre_trace,
                    delayed_last_pre_tick,
                    last_pre_trace,
                    window.prev_time(),
                    window.prev_trace(),
                );
            }

            let fin = self.structure.final_state(update.state, &self.weight);
            if !flush {
                apply_input(
                    delay_dendritic + delay_axonal + tick,
                    post_index,
                    u32::from(fin.weight),
                );
            }
            write_halfword(&mut row[plastic_offset..], j, fin.plastic_word);
        }

        // Header tail, pre-trace and plastic words go back; control words
        // are immutable and stay out of the transfer
        Some(WriteBack {
            offset: PLASTIC_LAST_UPDATE,
            words: 2 + Self::PRE_TRACE_WORDS + halfwords_to_words(count),
        })
    }

    fn add_post_spike(&mut self, tick: u32, neuron: u32) {
        trace!(tick, neuron, "adding post-synaptic event to history");
        let history = &mut self.post_history[neuron as usize];
        let new_trace = self
            .timing
            .update_post_trace(tick, history.last_trace(), history.last_time());
        history.add(tick, new_trace);
    }

    fn max_row_words(&self) -> usize {
        Self::row_words(self.max_row_synapses)
    }
}
