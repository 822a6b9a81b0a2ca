//! Genesis import errors.

use lt_01_content_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Any store failure in the bulk path is fatal: this is a one-shot
    /// run, not expected to tolerate partial retries.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("genesis stream misuse: {0}")]
    Stream(String),

    #[error("reconciliation task failed: {0}")]
    Reconciliation(String),
}

impl ImportError {
    pub fn stream(reason: impl Into<String>) -> Self {
        ImportError::Stream(reason.into())
    }
}
