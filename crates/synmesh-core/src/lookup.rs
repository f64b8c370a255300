//! Spike-key to row-locator resolution.
//!
//! Each pre-synaptic population owns a contiguous range of routing keys;
//! its rows sit at a fixed stride from a base address in the shared store.
//! The table is read-only after construction and resolution is a binary
//! search, so a mis-sorted or overlapping table is rejected up front — a
//! silent mis-sort would make resolution return wrong rows, which is a
//! fatal configuration fault, not an operational one.

use crate::error::{CoreError, Result};
use crate::row::RowLocator;
use tracing::debug;

/// One contiguous key range and the rows it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    /// First routing key of the range.
    pub key_base: u32,
    /// Number of keys (= pre-synaptic neurons) in the range.
    pub key_count: u32,
    /// Locator of the first row; subsequent rows follow at `row_stride`.
    pub locator: RowLocator,
    /// Word stride between consecutive rows.
    pub row_stride: u32,
}

/// Sorted, read-only table resolving spike keys to row locators.
#[derive(Debug, Clone)]
pub struct KeyLookup {
    entries: Vec<KeyRange>,
}

impl KeyLookup {
    /// Build a lookup from entries sorted by `key_base`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableUnsorted`] or [`CoreError::TableOverlap`]
    /// if the entries are out of order or their key ranges intersect.
    pub fn from_entries(entries: Vec<KeyRange>) -> Result<Self> {
        for (index, pair) in entries.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.key_base < prev.key_base {
                return Err(CoreError::TableUnsorted { index: index + 1 });
            }
            if next.key_base < prev.key_base.saturating_add(prev.key_count) {
                return Err(CoreError::TableOverlap {
                    first: index,
                    second: index + 1,
                });
            }
        }
        debug!(entries = entries.len(), "key lookup table built");
        Ok(Self { entries })
    }

    /// Resolve a spike key to the locator of its synaptic row.
    ///
    /// Returns `None` for keys outside every range; the caller drops the
    /// spike and counts it.
    #[must_use]
    pub fn resolve(&self, key: u32) -> Option<RowLocator> {
        let idx = self
            .entries
            .partition_point(|entry| entry.key_base <= key)
            .checked_sub(1)?;
        let entry = &self.entries[idx];
        let neuron = key - entry.key_base;
        if neuron >= entry.key_count {
            return None;
        }
        Some(RowLocator::new(
            entry.locator.address + neuron * entry.row_stride,
            entry.locator.words,
        ))
    }

    /// Number of key ranges in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty (every key misses).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> KeyLookup {
        KeyLookup::from_entries(vec![
            KeyRange {
                key_base: 0x1000,
                key_count: 4,
                locator: RowLocator::new(0x100, 8),
                row_stride: 8,
            },
            KeyRange {
                key_base: 0x2000,
                key_count: 2,
                locator: RowLocator::new(0x400, 16),
                row_stride: 16,
            },
        ])
        .unwrap()
    }

    #[test]
    fn resolves_key_to_strided_row() {
        let lookup = table();
        assert_eq!(lookup.resolve(0x1000), Some(RowLocator::new(0x100, 8)));
        assert_eq!(lookup.resolve(0x1003), Some(RowLocator::new(0x118, 8)));
        assert_eq!(lookup.resolve(0x2001), Some(RowLocator::new(0x410, 16)));
    }

    #[test]
    fn misses_outside_ranges() {
        let lookup = table();
        assert_eq!(lookup.resolve(0x0FFF), None);
        assert_eq!(lookup.resolve(0x1004), None);
        assert_eq!(lookup.resolve(0x2002), None);
    }

    #[test]
    fn rejects_unsorted_table() {
        let result = KeyLookup::from_entries(vec![
            KeyRange {
                key_base: 0x2000,
                key_count: 1,
                locator: RowLocator::new(0, 4),
                row_stride: 4,
            },
            KeyRange {
                key_base: 0x1000,
                key_count: 1,
                locator: RowLocator::new(0, 4),
                row_stride: 4,
            },
        ]);
        assert!(matches!(result, Err(CoreError::TableUnsorted { index: 1 })));
    }

    #[test]
    fn rejects_overlapping_ranges() {
        let result = KeyLookup::from_entries(vec![
            KeyRange {
                key_base: 0x1000,
                key_count: 16,
                locator: RowLocator::new(0, 4),
                row_stride: 4,
            },
            KeyRange {
                key_base: 0x1008,
                key_count: 16,
                locator: RowLocator::new(0x100, 4),
                row_stride: 4,
            },
        ]);
        assert!(matches!(result, Err(CoreError::TableOverlap { .. })));
    }
}
