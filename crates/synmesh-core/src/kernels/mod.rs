//! Row-processing kernels.
//!
//! The tick scheduler drives every fetched row through a [`RowProcessor`];
//! which concrete kernel sits behind the trait is a build-configuration
//! choice, exactly one per core.

mod static_row;
mod stdp;

pub use static_row::StaticProcessor;
pub use stdp::StdpProcessor;

use crate::row::RowLocator;

/// Mutable sub-range of a processed row that must be written back to the
/// shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBack {
    /// First row word of the mutable region.
    pub offset: usize,
    /// Words to transfer.
    pub words: usize,
}

/// A row kernel: applies one fetched row at the current tick.
///
/// `apply_input(delivery_tick, post_index, weight)` deposits into the ring
/// buffer; `add_delay_row(target_tick, locator)` schedules a
/// delay-extension replay. A `Some` return names the region the scheduler
/// must DMA back; static rows never modify their buffer and return `None`.
pub trait RowProcessor {
    /// Process `row` for a spike (or flush) at `tick`.
    fn process_row(
        &mut self,
        tick: u32,
        row: &mut [u32],
        flush: bool,
        apply_input: &mut dyn FnMut(u32, u32, u32),
        add_delay_row: &mut dyn FnMut(u32, RowLocator),
    ) -> Option<WriteBack>;

    /// Record a post-synaptic spike of `neuron` at `tick`.
    ///
    /// No-op for kernels without plastic state.
    fn add_post_spike(&mut self, tick: u32, neuron: u32);

    /// Largest row, in words, this kernel can be handed.
    fn max_row_words(&self) -> usize;
}
