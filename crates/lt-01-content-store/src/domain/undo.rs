//! Undo frames and the processing checkpoint.
//!
//! Every processed block owns one [`UndoFrame`]: an ordered stack of
//! inverse-mutation records. On a fork the frames are drained newest
//! block first and each op is inverted last-in-first-out, which restores
//! the store to its exact pre-fork state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What undoing a mutation means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoKind {
    /// The mutation created the document; undo deletes it.
    Create,
    /// The mutation patched the document; undo applies the inverse patch.
    Update,
    /// The mutation removed the document; undo recreates it from the
    /// stored snapshot.
    Remove,
}

/// One inverse-mutation record.
///
/// `payload` is the inverse patch (`Update`) or the full snapshot
/// (`Remove`); it is stored with operator keys escaped so the patch
/// round-trips as opaque content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoOp {
    pub kind: UndoKind,
    pub collection: String,
    pub document_id: String,
    #[serde(default)]
    pub payload: Value,
}

/// Per-block stack of undo ops plus the block coordinates needed to
/// rewind the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoFrame {
    pub block_num: u64,
    pub block_time: DateTime<Utc>,
    pub sequence: u64,
    pub stack: Vec<UndoOp>,
}

impl UndoFrame {
    pub fn new(block_num: u64, block_time: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            block_num,
            block_time,
            sequence,
            stack: Vec::new(),
        }
    }
}

/// The last durably processed block. Singleton document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_block_num: u64,
    pub last_block_time: Option<DateTime<Utc>>,
    pub last_block_sequence: u64,
}

impl Checkpoint {
    pub fn advance(&mut self, block_num: u64, block_time: DateTime<Utc>, sequence: u64) {
        self.last_block_num = block_num;
        self.last_block_time = Some(block_time);
        self.last_block_sequence = sequence;
    }
}
