//! Shared off-chip store.
//!
//! The only cross-core resource. Each core assumes exclusive write access
//! to its own plastic rows; control regions are read-only and safely
//! shared. On hardware this is SDRAM behind a DMA engine; for host-side
//! execution [`HostStore`] backs it with a plain word vector.

use crate::error::{Result, RuntimeError};

/// Word-addressed access to the shared store.
///
/// Transfers are single-attempt: a failure is a fatal fault, never
/// retried.
pub trait SharedStore {
    /// Copy `dst.len()` words starting at word `address` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StoreBounds`] if the transfer leaves the
    /// allocated words.
    fn read_words(&self, address: u32, dst: &mut [u32]) -> Result<()>;

    /// Copy `src` into the store starting at word `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StoreBounds`] if the transfer leaves the
    /// allocated words.
    fn write_words(&mut self, address: u32, src: &[u32]) -> Result<()>;

    /// Store size in words.
    fn size_words(&self) -> usize;
}

/// Host-memory store: the whole configuration blob loaded into a word
/// vector, addresses relative to its start.
#[derive(Debug, Clone)]
pub struct HostStore {
    words: Vec<u32>,
}

impl HostStore {
    /// Create a zeroed store of `size_words` words.
    #[must_use]
    pub fn new(size_words: usize) -> Self {
        Self {
            words: vec![0; size_words],
        }
    }

    /// Wrap an existing word image.
    #[must_use]
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Build a store from little-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte length is not a multiple of four.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(RuntimeError::invalid_header(format!(
                "store image of {} bytes is not word-aligned",
                bytes.len()
            )));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("chunk of 4")))
            .collect();
        Ok(Self { words })
    }

    /// The backing words.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    fn check(&self, address: u32, words: usize) -> Result<()> {
        let end = address as usize + words;
        if end > self.words.len() {
            return Err(RuntimeError::StoreBounds {
                address,
                words,
                size: self.words.len(),
            });
        }
        Ok(())
    }
}

impl SharedStore for HostStore {
    fn read_words(&self, address: u32, dst: &mut [u32]) -> Result<()> {
        self.check(address, dst.len())?;
        let base = address as usize;
        dst.copy_from_slice(&self.words[base..base + dst.len()]);
        Ok(())
    }

    fn write_words(&mut self, address: u32, src: &[u32]) -> Result<()> {
        self.check(address, src.len())?;
        let base = address as usize;
        self.words[base..base + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn size_words(&self) -> usize {
        self.words.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let mut store = HostStore::new(16);
        store.write_words(4, &[1, 2, 3]).unwrap();
        let mut out = [0u32; 3];
        store.read_words(4, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn out_of_bounds_is_fatal() {
        let store = HostStore::new(8);
        let mut out = [0u32; 4];
        assert!(matches!(
            store.read_words(6, &mut out),
            Err(RuntimeError::StoreBounds { .. })
        ));
    }

    #[test]
    fn from_bytes_is_little_endian() {
        let store = HostStore::from_bytes(&[0x78, 0x56, 0x34, 0x12]).unwrap();
        assert_eq!(store.words(), &[0x1234_5678]);
    }

    #[test]
    fn from_bytes_rejects_unaligned() {
        assert!(HostStore::from_bytes(&[1, 2, 3]).is_err());
    }
}
