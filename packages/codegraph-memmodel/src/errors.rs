//! Error types for codegraph-memmodel
//!
//! Every failure here is either an encoding problem in the consumed program
//! representation or a caller logic error. Nothing performs I/O except config
//! loading, so nothing is retryable.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for memory-model encoding
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Assignment whose sides are structurally incompatible
    #[error("Illegal assignment: {reason}")]
    IllegalAssignment { reason: String },

    /// Edge kind that has no formula encoding
    #[error("Unrecognized edge: {edge}")]
    UnrecognizedEdge { edge: String },

    /// Construct inside a known edge that cannot be encoded
    #[error("Unrecognized code in '{edge}': {reason}")]
    UnrecognizedCode { reason: String, edge: String },

    /// Deferred-allocation pool lookup for a pointer that owns none
    #[error("No deferred allocation is associated with pointer '{pointer}'")]
    UnknownDeferredAllocation { pointer: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EncodingError {
    /// Create an illegal-assignment error
    pub fn illegal_assignment(reason: impl Into<String>) -> Self {
        EncodingError::IllegalAssignment {
            reason: reason.into(),
        }
    }

    /// Create an unrecognized-edge error
    pub fn unrecognized_edge(edge: impl Into<String>) -> Self {
        EncodingError::UnrecognizedEdge { edge: edge.into() }
    }

    /// Create an unrecognized-code error
    pub fn unrecognized_code(reason: impl Into<String>, edge: impl Into<String>) -> Self {
        EncodingError::UnrecognizedCode {
            reason: reason.into(),
            edge: edge.into(),
        }
    }

    /// Create an unknown-pool error
    pub fn unknown_deferred_allocation(pointer: impl Into<String>) -> Self {
        EncodingError::UnknownDeferredAllocation {
            pointer: pointer.into(),
        }
    }
}

/// Result type alias for encoding operations
pub type Result<T> = std::result::Result<T, EncodingError>;
