//! Block envelope delivered by the chain subscription.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One chain block as pushed by the subscription transport.
///
/// The envelope is ephemeral: after dispersal only `block_num`,
/// `block_time` and `sequence` survive, as the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub block_num: u64,
    pub block_time: DateTime<Utc>,
    /// Position of the block in the subscription stream. Carried through
    /// to the checkpoint so an external restart can resubscribe precisely.
    pub sequence: u64,
    /// Operations signed into the block, in chain order.
    #[serde(default)]
    pub real_ops: Vec<RawOperation>,
    /// Operations synthesized by the chain itself (rewards, payouts).
    #[serde(default)]
    pub virtual_ops: Vec<RawOperation>,
}

/// A single operation before dispatch: a kind tag plus an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOperation {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl RawOperation {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}
