//! Fixed-weight row kernel.

use super::{RowProcessor, WriteBack};
use crate::row::{
    RowLocator, SynapseCodec, ROW_COUNT, ROW_EXTENSION_DELAY, ROW_EXTENSION_LOCATOR,
    STATIC_HEADER_WORDS,
};
use tracing::trace;

/// Applies a static row: one ring-buffer deposit per synaptic word, no
/// state, no write-back.
#[derive(Debug)]
pub struct StaticProcessor<const I: u32, const D: u32> {
    max_row_synapses: usize,
}

impl<const I: u32, const D: u32> StaticProcessor<I, D> {
    /// Create a kernel for rows of up to `max_row_synapses` synapses.
    #[must_use]
    pub fn new(max_row_synapses: usize) -> Self {
        Self { max_row_synapses }
    }
}

impl<const I: u32, const D: u32> RowProcessor for StaticProcessor<I, D> {
    fn process_row(
        &mut self,
        tick: u32,
        row: &mut [u32],
        flush: bool,
        apply_input: &mut dyn FnMut(u32, u32, u32),
        add_delay_row: &mut dyn FnMut(u32, RowLocator),
    ) -> Option<WriteBack> {
        let count = row[ROW_COUNT] as usize;
        trace!(tick, count, "processing static row");

        if row[ROW_EXTENSION_DELAY] != 0 {
            add_delay_row(
                row[ROW_EXTENSION_DELAY] + tick,
                RowLocator::unpack(row[ROW_EXTENSION_LOCATOR]),
            );
        }

        if !flush {
            for &word in &row[STATIC_HEADER_WORDS..STATIC_HEADER_WORDS + count] {
                apply_input(
                    tick + SynapseCodec::<I, D>::delay(word),
                    SynapseCodec::<I, D>::index(word),
                    SynapseCodec::<I, D>::weight(word),
                );
            }
        }

        None
    }

    fn add_post_spike(&mut self, _tick: u32, _neuron: u32) {}

    fn max_row_words(&self) -> usize {
        STATIC_HEADER_WORDS + self.max_row_synapses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::StandardCodec;

    fn run(
        row: &mut [u32],
        tick: u32,
    ) -> (Vec<(u32, u32, u32)>, Vec<(u32, RowLocator)>) {
        let mut kernel = StaticProcessor::<10, 3>::new(512);
        let mut inputs = Vec::new();
        let mut delays = Vec::new();
        let result = kernel.process_row(
            tick,
            row,
            false,
            &mut |t, i, w| inputs.push((t, i, w)),
            &mut |t, l| delays.push((t, l)),
        );
        assert!(result.is_none());
        (inputs, delays)
    }

    #[test]
    fn deposits_at_delayed_ticks() {
        let mut row = vec![
            2,
            0,
            0,
            StandardCodec::encode(5, 1, 100),
            StandardCodec::encode(7, 2, 200),
        ];
        let (inputs, delays) = run(&mut row, 10);
        assert_eq!(inputs, vec![(11, 5, 100), (12, 7, 200)]);
        assert!(delays.is_empty());
    }

    #[test]
    fn forwards_delay_extension_then_applies() {
        let locator = RowLocator::new(0xABC, 13);
        let mut row = vec![3, 0, 0, StandardCodec::encode(0, 1, 1)];
        row[0] = 1;
        row[1] = 3;
        row[2] = locator.pack();
        let (inputs, delays) = run(&mut row, 10);
        assert_eq!(delays, vec![(13, locator)]);
        assert_eq!(inputs, vec![(11, 0, 1)]);
    }

    #[test]
    fn honours_count_over_padding() {
        // Padding words past N carry stale data the kernel must ignore
        let mut row = vec![1, 0, 0, StandardCodec::encode(3, 1, 50), 0xDEAD_BEEF];
        let (inputs, _) = run(&mut row, 0);
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn flush_skips_deposits() {
        let mut kernel = StaticProcessor::<10, 3>::new(512);
        let mut row = vec![1, 0, 0, StandardCodec::encode(3, 1, 50)];
        let mut inputs = 0;
        kernel.process_row(5, &mut row, true, &mut |_, _, _| inputs += 1, &mut |_, _| {});
        assert_eq!(inputs, 0);
    }
}
