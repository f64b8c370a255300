//! Per-core tick loop.
//!
//! Single-threaded and cooperative: the only true concurrency is the
//! packet handler pushing into the spike input queue while this loop
//! consumes it. Per tick, in order:
//!
//! 1. drain the delay-row buffer for rows targeting this tick;
//! 2. drain the spike queue — resolve each key, run the row through the
//!    double-buffered pipeline (the next row's fetch overlaps the current
//!    row's compute), write plastic rows back;
//! 3. drain the current ring-buffer slot into the output mailbox.
//!
//! Row processing runs to completion; the loop only yields between rows.

use crate::config::SynapseKind;
use crate::dma::{PendingRow, RowPipeline};
use crate::error::Result;
use crate::recording::{Diagnostics, SpikeRecord};
use crate::store::SharedStore;
use std::collections::VecDeque;
use synmesh_core::{
    DelayRowBuffer, InputRingBuffer, KeyLookup, RowLocator, RowProcessor, SpikeInputBuffer,
};
use tracing::{debug, info};

/// Sizing of a core's buffers.
#[derive(Debug, Clone, Copy)]
pub struct CoreConfig {
    /// Ring-buffer delay bits (slots = `2^delay_bits`).
    pub delay_bits: u32,
    /// Spike input queue capacity (power of two).
    pub queue_capacity: usize,
    /// Delay-row calendar bits (buckets = `2^delay_slot_bits`).
    pub delay_slot_bits: u32,
    /// Rows per delay-row bucket.
    pub delay_slot_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            delay_bits: 3,
            queue_capacity: 256,
            delay_slot_bits: 4,
            delay_slot_capacity: 16,
        }
    }
}

impl CoreConfig {
    /// Reference sizing for a given kernel: static cores take the larger
    /// spike queue, plastic cores the smaller one.
    #[must_use]
    pub fn for_kind(kind: SynapseKind) -> Self {
        let queue_capacity = match kind {
            SynapseKind::Static => 512,
            SynapseKind::StdpNearestAdditive | SynapseKind::StdpPairAdditive => 256,
        };
        Self {
            queue_capacity,
            ..Self::default()
        }
    }
}

/// One synapse-processing core: spike queue, delay-row buffer, ring
/// buffer, key lookup, transfer pipeline and the row kernel.
#[derive(Debug)]
pub struct SynapseCore<P: RowProcessor> {
    processor: P,
    lookup: KeyLookup,
    queue: SpikeInputBuffer,
    ring: InputRingBuffer,
    delay_rows: DelayRowBuffer,
    pipeline: RowPipeline,
    diagnostics: Diagnostics,
    output_base: Option<u32>,
    recording: Option<SpikeRecord>,
    drained: Vec<u32>,
}

impl<P: RowProcessor> SynapseCore<P> {
    /// Assemble a core.
    #[must_use]
    pub fn new(processor: P, lookup: KeyLookup, post_count: usize, config: CoreConfig) -> Self {
        let max_row_words = processor.max_row_words();
        Self {
            processor,
            lookup,
            queue: SpikeInputBuffer::new(config.queue_capacity),
            ring: InputRingBuffer::new(config.delay_bits, post_count),
            delay_rows: DelayRowBuffer::new(config.delay_slot_bits, config.delay_slot_capacity),
            pipeline: RowPipeline::new(max_row_words),
            diagnostics: Diagnostics::default(),
            output_base: None,
            recording: None,
            drained: vec![0; post_count],
        }
    }

    /// Write each tick's drained ring slot to this store address.
    pub fn set_output_base(&mut self, base: u32) {
        self.output_base = Some(base);
    }

    /// Attach a spike telemetry sink.
    pub fn set_recording(&mut self, recording: SpikeRecord) {
        self.recording = Some(recording);
    }

    /// Enqueue an inbound spike key (the packet-handler side).
    ///
    /// Returns `false` on queue overflow; the overflow is counted.
    pub fn enqueue_spike(&self, key: u32) -> bool {
        self.queue.push(key)
    }

    /// Record a post-synaptic spike (fed back from the neuron component).
    pub fn add_post_spike(&mut self, tick: u32, neuron: u32) {
        self.processor.add_post_spike(tick, neuron);
    }

    /// Run one timer tick.
    ///
    /// # Errors
    ///
    /// Fails only on fatal store faults; operational events are counted.
    pub fn tick(&mut self, tick: u32, store: &mut impl SharedStore) -> Result<()> {
        // 1. Delay-extension rows whose target tick has arrived
        let mut pending: VecDeque<PendingRow> = self
            .delay_rows
            .drain(tick)
            .into_iter()
            .map(|locator| PendingRow {
                locator,
                flush: false,
            })
            .collect();
        self.diagnostics.delay_rows_replayed += pending.len() as u64;

        // 2. Inbound spikes, in queue order
        while let Some(key) = self.queue.pop() {
            if let Some(recording) = &mut self.recording {
                recording.record(store, tick, key)?;
            }
            match self.lookup.resolve(key) {
                Some(locator) => pending.push_back(PendingRow {
                    locator,
                    flush: false,
                }),
                None => {
                    self.diagnostics.unknown_keys += 1;
                    debug!(key, "spike key missing from lookup, dropped");
                }
            }
        }

        self.process_rows(tick, pending, store)?;

        // 3. Hand the tick's slot to the downstream neuron component
        self.ring.drain_slot_into(tick, &mut self.drained);
        if let Some(base) = self.output_base {
            store.write_words(base, &self.drained)?;
        }

        self.sync_counters();
        Ok(())
    }

    /// Drive pending rows through the double-buffered pipeline.
    fn process_rows(
        &mut self,
        tick: u32,
        pending: VecDeque<PendingRow>,
        store: &mut impl SharedStore,
    ) -> Result<()> {
        let mut rows = pending.into_iter();
        if let Some(first) = rows.next() {
            self.pipeline.fetch(&*store, first)?;
        }

        while let Some(current) = self.pipeline.take_completed() {
            // Overlap: the next row's read lands while this row computes
            if let Some(next) = rows.next() {
                self.pipeline.fetch(&*store, next)?;
            }

            let Self {
                processor,
                pipeline,
                ring,
                delay_rows,
                ..
            } = self;
            let row = pipeline.active_row_mut(current.locator.words as usize);
            let write_back = processor.process_row(
                tick,
                row,
                current.flush,
                &mut |delivery_tick, post_index, weight| ring.add(delivery_tick, post_index, weight),
                &mut |target_tick, locator: RowLocator| {
                    delay_rows.push(target_tick, locator);
                },
            );

            if current.flush {
                self.diagnostics.rows_flushed += 1;
            } else {
                self.diagnostics.rows_processed += 1;
            }

            if let Some(region) = write_back {
                self.pipeline.write_back(store, current.locator, region)?;
            }
        }
        Ok(())
    }

    fn sync_counters(&mut self) {
        self.diagnostics.spike_overflows = self.queue.overflow_count();
        self.diagnostics.delay_row_overflows = self.delay_rows.overflow_count();
        self.diagnostics.ring_saturations = self.ring.saturation_count();
    }

    /// Run `ticks` timer ticks (1-based; tick 0 is initialisation) and
    /// terminate cleanly.
    ///
    /// # Errors
    ///
    /// Fails on fatal store faults.
    pub fn run(&mut self, store: &mut impl SharedStore, ticks: u32) -> Result<()> {
        info!(ticks, "simulation starting");
        for tick in 1..=ticks {
            self.tick(tick, store)?;
        }
        self.diagnostics.log_summary();
        info!("simulation complete");
        Ok(())
    }

    /// The slot drained by the last tick.
    #[must_use]
    pub fn last_output(&self) -> &[u32] {
        &self.drained
    }

    /// Operational counters (synced at each tick boundary).
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The row kernel.
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// The spike telemetry sink, if attached.
    #[must_use]
    pub fn recording(&self) -> Option<&SpikeRecord> {
        self.recording.as_ref()
    }
}
