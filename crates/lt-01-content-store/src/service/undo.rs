//! Undo-frame and checkpoint persistence.
//!
//! Frames live at `undo/{block_num:020}` - zero-padded so the key order
//! is the block order - and the checkpoint is the singleton document at
//! `meta/checkpoint`.

use tracing::warn;

use crate::domain::errors::StoreError;
use crate::domain::undo::{Checkpoint, UndoFrame, UndoOp};
use crate::ports::{BatchOp, KeyValueStore};

use super::ContentStore;

const UNDO_PREFIX: &[u8] = b"undo/";
const CHECKPOINT_KEY: &[u8] = b"meta/checkpoint";

fn frame_key(block_num: u64) -> Vec<u8> {
    format!("undo/{:020}", block_num).into_bytes()
}

impl<K: KeyValueStore> ContentStore<K> {
    /// Persist a fresh frame for a block about to be processed.
    pub fn open_undo_frame(&self, frame: &UndoFrame) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(frame).map_err(StoreError::serialization)?;
        self.with_kv_write(|kv| kv.put(&frame_key(frame.block_num), &bytes))?;
        Ok(())
    }

    /// Append an undo op to the given block's frame. With no such frame
    /// the op has nowhere to go; that is logged rather than fatal because
    /// it can only mean the caller is mutating outside a block.
    pub fn append_undo_op(&self, block_num: u64, op: UndoOp) -> Result<(), StoreError> {
        let key = frame_key(block_num);
        let bytes = self.with_kv_read(|kv| kv.get(&key))?;
        let Some(bytes) = bytes else {
            warn!(
                block_num,
                collection = %op.collection,
                document_id = %op.document_id,
                "undo op registered with no open frame, dropping"
            );
            return Ok(());
        };

        let mut frame: UndoFrame =
            serde_json::from_slice(&bytes).map_err(StoreError::serialization)?;
        frame.stack.push(op);

        let bytes = serde_json::to_vec(&frame).map_err(StoreError::serialization)?;
        self.with_kv_write(|kv| kv.put(&key, &bytes))?;
        Ok(())
    }

    /// All frames, newest block first.
    pub fn undo_frames_desc(&self) -> Result<Vec<UndoFrame>, StoreError> {
        let entries = self.with_kv_read(|kv| kv.scan_prefix(UNDO_PREFIX))?;
        let mut frames = Vec::with_capacity(entries.len());
        for (_, bytes) in entries {
            let frame: UndoFrame =
                serde_json::from_slice(&bytes).map_err(StoreError::serialization)?;
            frames.push(frame);
        }
        frames.sort_by(|a, b| b.block_num.cmp(&a.block_num));
        Ok(frames)
    }

    pub fn delete_undo_frame(&self, block_num: u64) -> Result<(), StoreError> {
        self.with_kv_write(|kv| kv.delete(&frame_key(block_num)))?;
        Ok(())
    }

    /// Delete every frame with `block_num < edge`. Returns how many went.
    pub fn prune_undo_frames_below(&self, edge: u64) -> Result<u64, StoreError> {
        let frames = self.undo_frames_desc()?;
        let doomed: Vec<BatchOp> = frames
            .iter()
            .filter(|frame| frame.block_num < edge)
            .map(|frame| BatchOp::delete(frame_key(frame.block_num)))
            .collect();
        let count = doomed.len() as u64;
        if count > 0 {
            self.with_kv_write(|kv| kv.write_batch(doomed))?;
        }
        Ok(count)
    }

    /// The processing checkpoint; defaults to zero on a pristine store.
    pub fn checkpoint(&self) -> Result<Checkpoint, StoreError> {
        let bytes = self.with_kv_read(|kv| kv.get(CHECKPOINT_KEY))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(StoreError::serialization),
            None => Ok(Checkpoint::default()),
        }
    }

    pub fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(checkpoint).map_err(StoreError::serialization)?;
        self.with_kv_write(|kv| kv.put(CHECKPOINT_KEY, &bytes))?;
        Ok(())
    }
}
