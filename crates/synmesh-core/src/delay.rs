//! Buffer of rows whose delivery exceeds the native delay width.
//!
//! A row header can carry a delay-extension: a future tick at which a
//! second locator must be re-injected into the spike-processing path, as if
//! a spike for that row had just arrived. This calendar holds those
//! `(target_tick, locator)` pairs until their tick comes round.

use crate::row::RowLocator;
use tracing::trace;

/// One scheduled delay-extension row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRow {
    /// Absolute tick at which the row is replayed.
    pub target_tick: u32,
    /// Locator of the row to fetch.
    pub locator: RowLocator,
}

/// Calendar of delay-extension rows: `2^slot_bits` buckets keyed by
/// `target_tick`, each bounded to `slot_capacity` entries.
///
/// Pushing into a full bucket drops the row and counts an overflow; stored
/// entries are never corrupted. Entries whose target lies more than one
/// calendar revolution ahead simply stay in their bucket until the matching
/// tick, since `drain` compares full target ticks.
#[derive(Debug)]
pub struct DelayRowBuffer {
    slot_mask: u32,
    slot_capacity: usize,
    slots: Vec<Vec<DelayRow>>,
    overflows: u64,
}

impl DelayRowBuffer {
    /// Create a calendar with `2^slot_bits` buckets of `slot_capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `slot_capacity` is 0.
    #[must_use]
    pub fn new(slot_bits: u32, slot_capacity: usize) -> Self {
        assert!(slot_capacity > 0, "delay buffer buckets cannot be empty");
        let slots = 1usize << slot_bits;
        Self {
            slot_mask: (slots - 1) as u32,
            slot_capacity,
            slots: (0..slots).map(|_| Vec::with_capacity(4)).collect(),
            overflows: 0,
        }
    }

    /// Schedule `locator` for replay at `target_tick`.
    ///
    /// Returns `false` and counts an overflow when the bucket is full.
    pub fn push(&mut self, target_tick: u32, locator: RowLocator) -> bool {
        let slot = &mut self.slots[(target_tick & self.slot_mask) as usize];
        if slot.len() == self.slot_capacity {
            self.overflows += 1;
            return false;
        }
        trace!(target_tick, address = locator.address, "delay row scheduled");
        slot.push(DelayRow {
            target_tick,
            locator,
        });
        true
    }

    /// Remove and return every row scheduled for exactly `tick`, in
    /// insertion order. Rows in the same bucket with a later revolution
    /// stay put.
    pub fn drain(&mut self, tick: u32) -> Vec<RowLocator> {
        let slot = &mut self.slots[(tick & self.slot_mask) as usize];
        let mut due = Vec::new();
        slot.retain(|row| {
            if row.target_tick == tick {
                due.push(row.locator);
                false
            } else {
                true
            }
        });
        due
    }

    /// Rows currently scheduled across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Whether no rows are scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows dropped because a bucket was full.
    #[must_use]
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_replay_at_their_tick() {
        let mut buffer = DelayRowBuffer::new(4, 8);
        let locator = RowLocator::new(0x100, 8);
        buffer.push(13, locator);

        assert!(buffer.drain(12).is_empty());
        assert_eq!(buffer.drain(13), vec![locator]);
        assert!(buffer.drain(13).is_empty());
    }

    #[test]
    fn same_bucket_different_revolution_stays() {
        let mut buffer = DelayRowBuffer::new(4, 8);
        let near = RowLocator::new(0x10, 4);
        let far = RowLocator::new(0x20, 4);
        // Ticks 3 and 19 share bucket 3 of 16
        buffer.push(3, near);
        buffer.push(19, far);

        assert_eq!(buffer.drain(3), vec![near]);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.drain(19), vec![far]);
    }

    #[test]
    fn bucket_overflow_counted() {
        let mut buffer = DelayRowBuffer::new(2, 2);
        let locator = RowLocator::new(0, 4);
        assert!(buffer.push(5, locator));
        assert!(buffer.push(5, locator));
        assert!(!buffer.push(5, locator));
        assert_eq!(buffer.overflow_count(), 1);
        assert_eq!(buffer.drain(5).len(), 2);
    }
}
