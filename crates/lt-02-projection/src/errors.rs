//! Error types of the live projection path.

use lt_01_content_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("dispersal worker failed: {0}")]
    Worker(String),
}

impl ProjectionError {
    pub fn payload(kind: &str, source: serde_json::Error) -> Self {
        ProjectionError::Payload {
            kind: kind.to_string(),
            source,
        }
    }
}
