//! Error types for runtime configuration and store access

use synmesh_core::CoreError;
use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while loading a configuration blob or driving
/// the shared store.
///
/// All of these are fatal: they either abort before `simulation_start` or
/// kill the run (a failed store transfer is a hardware fault with no
/// retry). Operational faults are counted in
/// [`Diagnostics`](crate::Diagnostics) instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration blob header is malformed
    #[error("config header invalid: {reason}")]
    InvalidHeader {
        /// Reason for rejection
        reason: String,
    },

    /// A region's declared length runs past the blob
    #[error("region {region} overruns the blob: need {needed} words, have {available}")]
    RegionOverrun {
        /// Region identifier
        region: u32,
        /// Words the region claims
        needed: usize,
        /// Words actually available
        available: usize,
    },

    /// A required region is absent
    #[error("missing required region: {region}")]
    MissingRegion {
        /// Region name
        region: &'static str,
    },

    /// A region's payload failed validation
    #[error("region {region} malformed: {reason}")]
    MalformedRegion {
        /// Region name
        region: &'static str,
        /// Reason for rejection
        reason: String,
    },

    /// Store transfer outside the allocated words
    #[error("store access out of bounds: address {address:#x}, {words} words, store holds {size}")]
    StoreBounds {
        /// Word address of the transfer
        address: u32,
        /// Transfer length in words
        words: usize,
        /// Store size in words
        size: usize,
    },

    /// A fetched row does not fit the pipeline buffers
    #[error("row of {words} words exceeds the {capacity}-word row buffer")]
    RowTooLong {
        /// Row length in words
        words: usize,
        /// Buffer capacity in words
        capacity: usize,
    },

    /// Core structure construction failed (key table, plasticity params)
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RuntimeError {
    /// Create an invalid header error
    pub fn invalid_header(reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            reason: reason.into(),
        }
    }

    /// Create a malformed region error
    pub fn malformed_region(region: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRegion {
            region,
            reason: reason.into(),
        }
    }
}
