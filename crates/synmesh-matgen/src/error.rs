//! Error types for matrix generation

use thiserror::Error;

/// Result type alias for matrix-generation operations
pub type Result<T> = std::result::Result<T, MatGenError>;

/// Errors that can occur while generating a synaptic matrix
#[derive(Debug, Error)]
pub enum MatGenError {
    /// A connector produced more synapses than a row can hold
    #[error("row {row} has {generated} synapses, limit is {limit}")]
    RowOverflow {
        /// Pre-synaptic row index
        row: u32,
        /// Synapses the connector produced
        generated: usize,
        /// Maximum synapses per row
        limit: usize,
    },

    /// A generator parameter is out of range
    #[error("invalid generator parameter: {reason}")]
    InvalidParameter {
        /// Reason for rejection
        reason: String,
    },
}

impl MatGenError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }
}
