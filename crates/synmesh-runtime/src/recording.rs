//! Operational counters and spike telemetry.

use crate::error::Result;
use crate::store::SharedStore;
use tracing::info;

/// Monotonic counters for operational events.
///
/// None of these stop the simulation; they are collected here and
/// reported through the recording region (and the log) at the end of the
/// run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    /// Rows processed for real spikes.
    pub rows_processed: u64,
    /// Rows processed as flushes.
    pub rows_flushed: u64,
    /// Delay-extension rows replayed.
    pub delay_rows_replayed: u64,
    /// Spike keys with no key-lookup match.
    pub unknown_keys: u64,
    /// Spike-queue overflows (from the queue's own counter).
    pub spike_overflows: u64,
    /// Delay-row-buffer overflows.
    pub delay_row_overflows: u64,
    /// Ring-buffer saturations.
    pub ring_saturations: u64,
}

impl Diagnostics {
    /// Log a one-line summary at `info` level.
    pub fn log_summary(&self) {
        info!(
            rows = self.rows_processed,
            flushes = self.rows_flushed,
            delay_rows = self.delay_rows_replayed,
            unknown_keys = self.unknown_keys,
            spike_overflows = self.spike_overflows,
            delay_overflows = self.delay_row_overflows,
            saturations = self.ring_saturations,
            "simulation counters"
        );
    }

    /// Whether any operational fault was counted.
    #[must_use]
    pub fn any_faults(&self) -> bool {
        self.unknown_keys != 0
            || self.spike_overflows != 0
            || self.delay_row_overflows != 0
            || self.ring_saturations != 0
    }
}

/// Spike telemetry sink: appends `(tick, key)` pairs into the
/// SpikeRecording region of the shared store until it is full.
///
/// Records past capacity are dropped and counted, never an error.
#[derive(Debug)]
pub struct SpikeRecord {
    base: u32,
    capacity_words: u32,
    cursor: u32,
    dropped: u64,
}

impl SpikeRecord {
    /// Create a sink over `capacity_words` words at `base`.
    #[must_use]
    pub fn new(base: u32, capacity_words: u32) -> Self {
        Self {
            base,
            capacity_words,
            cursor: 0,
            dropped: 0,
        }
    }

    /// Append one `(tick, key)` record.
    ///
    /// # Errors
    ///
    /// Fails only on a store fault (fatal); a full region just counts a
    /// drop.
    pub fn record(&mut self, store: &mut impl SharedStore, tick: u32, key: u32) -> Result<()> {
        if self.cursor + 2 > self.capacity_words {
            self.dropped += 1;
            return Ok(());
        }
        store.write_words(self.base + self.cursor, &[tick, key])?;
        self.cursor += 2;
        Ok(())
    }

    /// Words written so far.
    #[must_use]
    pub fn written_words(&self) -> u32 {
        self.cursor
    }

    /// Records dropped because the region filled up.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}
