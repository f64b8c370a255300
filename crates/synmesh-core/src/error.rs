//! Error types for synapse-core construction and parameter loading

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building core structures or reading
/// plasticity parameters.
///
/// Operational faults (queue overflow, ring saturation, unknown keys) are
/// never errors — they are counted and the simulation continues. Everything
/// here is fatal before `simulation_start`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key lookup table entries are not sorted by key base
    #[error("key lookup table mis-sorted at entry {index}")]
    TableUnsorted {
        /// Index of the first out-of-order entry
        index: usize,
    },

    /// Two key lookup ranges cover the same key
    #[error("key lookup entries {first} and {second} overlap")]
    TableOverlap {
        /// Index of the earlier entry
        first: usize,
        /// Index of the later, overlapping entry
        second: usize,
    },

    /// A parameter region ended before all expected words were read
    #[error("parameter region truncated: need {needed} words, have {available}")]
    ParamsTruncated {
        /// Words the reader expected
        needed: usize,
        /// Words actually present
        available: usize,
    },

    /// A parameter value is out of its valid range
    #[error("invalid parameter: {reason}")]
    InvalidParam {
        /// Reason for rejection
        reason: String,
    },
}

impl CoreError {
    /// Create an invalid parameter error
    pub fn invalid_param(reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            reason: reason.into(),
        }
    }
}
