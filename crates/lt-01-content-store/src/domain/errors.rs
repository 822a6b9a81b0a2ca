//! Error types for the content store.

use thiserror::Error;

/// Failures of the raw key-value port.
#[derive(Debug, Clone, Error)]
pub enum KvError {
    #[error("kv store I/O error: {0}")]
    Io(String),

    #[error("kv store corruption: {0}")]
    Corruption(String),

    #[error("kv backend error: {0}")]
    Backend(String),
}

/// Failures of the typed document layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Kv(#[from] KvError),

    #[error("document encoding error: {0}")]
    Serialization(String),

    #[error("invalid patch: {reason}")]
    InvalidPatch { reason: String },

    #[error("unsupported patch operator: {operator}")]
    UnsupportedOperator { operator: String },
}

impl StoreError {
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        StoreError::Serialization(err.to_string())
    }

    pub fn invalid_patch(reason: impl Into<String>) -> Self {
        StoreError::InvalidPatch {
            reason: reason.into(),
        }
    }
}
