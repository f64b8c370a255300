//! Double-buffered row transfer pipeline.
//!
//! Two fixed row buffers: while the kernel processes the active buffer,
//! the next row's read lands in the shadow buffer. The scheduler's loop
//! is fetch → swap → (issue next fetch) → process → write-back, so one
//! transfer and one compute are in flight at any moment; further spikes
//! wait in the spike input queue.
//!
//! Write-back of a plastic row always completes before the next read of
//! the same row can be issued — rows are reached through the key lookup,
//! which serialises accesses per row within the single core loop.

use crate::error::{Result, RuntimeError};
use crate::store::SharedStore;
use synmesh_core::{RowLocator, WriteBack};
use tracing::trace;

/// A row transfer queued into the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PendingRow {
    /// Where the row lives in the shared store.
    pub locator: RowLocator,
    /// Whether this is a flush rather than a real spike.
    pub flush: bool,
}

/// Double-buffered fetch/process/write-back pipeline.
#[derive(Debug)]
pub struct RowPipeline {
    buffers: [Vec<u32>; 2],
    active: usize,
    fetched: Option<PendingRow>,
    reads: u64,
    writes: u64,
}

impl RowPipeline {
    /// Create a pipeline with two `max_row_words` buffers.
    #[must_use]
    pub fn new(max_row_words: usize) -> Self {
        Self {
            buffers: [vec![0; max_row_words], vec![0; max_row_words]],
            active: 0,
            fetched: None,
            reads: 0,
            writes: 0,
        }
    }

    /// Issue the read for `row` into the shadow buffer.
    ///
    /// # Errors
    ///
    /// Fails if the row exceeds the buffers or the transfer leaves the
    /// store; both are fatal.
    ///
    /// # Panics
    ///
    /// Panics if a fetched row is already waiting — the scheduler must
    /// `take_completed` first.
    pub fn fetch(&mut self, store: &impl SharedStore, row: PendingRow) -> Result<()> {
        assert!(self.fetched.is_none(), "shadow buffer already holds a row");
        let words = row.locator.words as usize;
        let shadow = 1 - self.active;
        let capacity = self.buffers[shadow].len();
        if words > capacity {
            return Err(RuntimeError::RowTooLong { words, capacity });
        }
        trace!(address = row.locator.address, words, "row read issued");
        store.read_words(row.locator.address, &mut self.buffers[shadow][..words])?;
        self.reads += 1;
        self.fetched = Some(row);
        Ok(())
    }

    /// Whether a completed read is waiting in the shadow buffer.
    #[must_use]
    pub fn has_fetched(&self) -> bool {
        self.fetched.is_some()
    }

    /// Swap buffers: the completed read becomes the active row.
    pub fn take_completed(&mut self) -> Option<PendingRow> {
        self.fetched.take().inspect(|_| {
            self.active = 1 - self.active;
        })
    }

    /// The active row buffer, `words` long.
    pub fn active_row_mut(&mut self, words: usize) -> &mut [u32] {
        &mut self.buffers[self.active][..words]
    }

    /// Write the mutable region of the active row back to the store.
    ///
    /// # Errors
    ///
    /// Fails if the transfer leaves the store (fatal, single attempt).
    pub fn write_back(
        &mut self,
        store: &mut impl SharedStore,
        locator: RowLocator,
        region: WriteBack,
    ) -> Result<()> {
        let src = &self.buffers[self.active][region.offset..region.offset + region.words];
        trace!(
            address = locator.address + region.offset as u32,
            words = region.words,
            "row write-back issued"
        );
        store.write_words(locator.address + region.offset as u32, src)?;
        self.writes += 1;
        Ok(())
    }

    /// Row reads issued so far.
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// Row write-backs issued so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HostStore;

    #[test]
    fn fetch_swap_exposes_row() {
        let mut store = HostStore::new(32);
        store.write_words(8, &[10, 11, 12]).unwrap();

        let mut pipeline = RowPipeline::new(16);
        pipeline
            .fetch(
                &store,
                PendingRow {
                    locator: RowLocator::new(8, 3),
                    flush: false,
                },
            )
            .unwrap();
        let row = pipeline.take_completed().unwrap();
        assert_eq!(pipeline.active_row_mut(row.locator.words as usize), &[10, 11, 12]);
    }

    #[test]
    fn next_fetch_does_not_clobber_active() {
        let mut store = HostStore::new(32);
        store.write_words(0, &[1, 1]).unwrap();
        store.write_words(2, &[2, 2]).unwrap();

        let mut pipeline = RowPipeline::new(8);
        let first = PendingRow {
            locator: RowLocator::new(0, 2),
            flush: false,
        };
        let second = PendingRow {
            locator: RowLocator::new(2, 2),
            flush: false,
        };

        pipeline.fetch(&store, first).unwrap();
        let current = pipeline.take_completed().unwrap();
        // Overlap: issue the next read while "processing" the first
        pipeline.fetch(&store, second).unwrap();
        assert_eq!(
            pipeline.active_row_mut(current.locator.words as usize),
            &[1, 1]
        );
        let next = pipeline.take_completed().unwrap();
        assert_eq!(pipeline.active_row_mut(next.locator.words as usize), &[2, 2]);
    }

    #[test]
    fn write_back_targets_mutable_region_only() {
        let mut store = HostStore::new(16);
        store.write_words(0, &[5, 0, 0, 7, 8, 9]).unwrap();

        let mut pipeline = RowPipeline::new(8);
        pipeline
            .fetch(
                &store,
                PendingRow {
                    locator: RowLocator::new(0, 6),
                    flush: false,
                },
            )
            .unwrap();
        pipeline.take_completed().unwrap();
        pipeline.active_row_mut(6)[3] = 70;
        pipeline.active_row_mut(6)[5] = 90;

        pipeline
            .write_back(
                &mut store,
                RowLocator::new(0, 6),
                WriteBack { offset: 3, words: 2 },
            )
            .unwrap();
        // Words 3..5 written back, word 5 untouched in the store
        assert_eq!(store.words()[..6], [5, 0, 0, 70, 8, 9]);
    }

    #[test]
    fn oversized_row_is_fatal() {
        let store = HostStore::new(64);
        let mut pipeline = RowPipeline::new(4);
        let result = pipeline.fetch(
            &store,
            PendingRow {
                locator: RowLocator::new(0, 8),
                flush: false,
            },
        );
        assert!(matches!(result, Err(RuntimeError::RowTooLong { .. })));
    }
}
