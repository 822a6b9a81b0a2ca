//! # Fork/Revert Engine
//!
//! Registers inverse-mutation records per block and replays them when the
//! chain reorganizes. Frames drain newest block first, ops last-in
//! first-out, so the store lands exactly on its pre-fork state.

mod pruner;

pub use pruner::UndoPruner;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use lt_01_content_store::domain::escape::{escape_keys, unescape_keys};
use lt_01_content_store::{
    Checkpoint, ContentStore, KeyValueStore, StoreError, UndoFrame, UndoKind, UndoOp,
};

pub struct ForkEngine<K: KeyValueStore> {
    store: Arc<ContentStore<K>>,
    /// Block whose frame is currently open; zero before the first block.
    current_block: Arc<AtomicU64>,
}

impl<K: KeyValueStore> Clone for ForkEngine<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            current_block: Arc::clone(&self.current_block),
        }
    }
}

impl<K: KeyValueStore> ForkEngine<K> {
    pub fn new(store: Arc<ContentStore<K>>) -> Self {
        Self {
            store,
            current_block: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open the undo frame for a block about to be dispersed. Must happen
    /// before any of the block's mutations.
    pub fn init_block(
        &self,
        block_num: u64,
        block_time: chrono::DateTime<chrono::Utc>,
        sequence: u64,
    ) -> Result<(), StoreError> {
        self.store
            .open_undo_frame(&UndoFrame::new(block_num, block_time, sequence))?;
        self.current_block.store(block_num, Ordering::SeqCst);
        Ok(())
    }

    /// Record the inverse of a mutation just performed. Operator keys in
    /// the payload are escaped so the patch persists as opaque content.
    pub fn register_change(
        &self,
        kind: UndoKind,
        collection: &str,
        document_id: &str,
        payload: Value,
    ) -> Result<(), StoreError> {
        let block_num = self.current_block.load(Ordering::SeqCst);
        if block_num == 0 {
            warn!(
                collection,
                document_id, "change registered outside a block, dropping"
            );
            return Ok(());
        }

        let mut payload = payload;
        escape_keys(&mut payload);
        self.store.append_undo_op(
            block_num,
            UndoOp {
                kind,
                collection: collection.to_string(),
                document_id: document_id.to_string(),
                payload,
            },
        )
    }

    /// Unwind every frame, newest block first, and rewind the checkpoint
    /// to just before the oldest unwound block.
    pub fn revert(&self) -> Result<(), StoreError> {
        info!("revert on fork...");

        let frames = self.store.undo_frames_desc()?;
        let Some(oldest) = frames.last() else {
            warn!("empty undo log, nothing to revert");
            return Ok(());
        };
        let rewound_to = oldest.block_num.saturating_sub(1);

        for frame in &frames {
            self.unwind_frame(frame)?;
        }

        let mut checkpoint = self.store.checkpoint()?;
        checkpoint.last_block_num = rewound_to;
        self.store.set_checkpoint(&checkpoint)?;

        info!(rewound_to, frames = frames.len(), "revert on fork done");
        Ok(())
    }

    /// Unwind only the newest block's frame, for narrow resyncs.
    pub fn revert_last_block(&self) -> Result<(), StoreError> {
        info!("revert last block...");

        let frames = self.store.undo_frames_desc()?;
        let Some(current) = frames.first() else {
            warn!("empty undo log, nothing to revert");
            return Ok(());
        };

        self.unwind_frame(current)?;

        let checkpoint = match frames.get(1) {
            Some(previous) => Checkpoint {
                last_block_num: previous.block_num,
                last_block_time: Some(previous.block_time),
                last_block_sequence: previous.sequence,
            },
            None => Checkpoint::default(),
        };
        self.store.set_checkpoint(&checkpoint)?;

        info!(block_num = current.block_num, "revert last block done");
        Ok(())
    }

    /// Delete frames older than `edge`. Returns how many were deleted.
    pub fn prune(&self, edge: u64) -> Result<u64, StoreError> {
        self.store.prune_undo_frames_below(edge)
    }

    fn unwind_frame(&self, frame: &UndoFrame) -> Result<(), StoreError> {
        for op in frame.stack.iter().rev() {
            let mut payload = op.payload.clone();
            unescape_keys(&mut payload);

            match op.kind {
                UndoKind::Create => {
                    self.store
                        .find_one_and_delete(&op.collection, &op.document_id)?;
                }
                UndoKind::Update => {
                    self.store
                        .find_one_and_patch(&op.collection, &op.document_id, &payload)?;
                }
                UndoKind::Remove => {
                    self.store
                        .insert_document(&op.collection, &op.document_id, &payload)?;
                }
            }
        }
        self.store.delete_undo_frame(frame.block_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lt_01_content_store::MemoryKv;
    use serde_json::json;

    fn engine() -> (Arc<ContentStore<MemoryKv>>, ForkEngine<MemoryKv>) {
        let store = Arc::new(ContentStore::new(MemoryKv::new()));
        let engine = ForkEngine::new(Arc::clone(&store));
        (store, engine)
    }

    fn time(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_revert_restores_pre_block_state() {
        let (store, engine) = engine();

        store
            .insert_document("posts", "alice/p", &json!({"stats": {"n": 0}}))
            .unwrap();

        engine.init_block(100, time(100), 1).unwrap();

        // Mutation 1: patch the post.
        store
            .find_one_and_patch("posts", "alice/p", &json!({"$inc": {"stats.n": 1}}))
            .unwrap();
        engine
            .register_change(
                UndoKind::Update,
                "posts",
                "alice/p",
                json!({"$set": {"stats.n": 0}}),
            )
            .unwrap();

        // Mutation 2: create a comment.
        store
            .insert_document("comments", "bob/c", &json!({"body": "hi"}))
            .unwrap();
        engine
            .register_change(UndoKind::Create, "comments", "bob/c", Value::Null)
            .unwrap();

        engine.revert().unwrap();

        assert_eq!(
            store.get_document("posts", "alice/p").unwrap(),
            Some(json!({"stats": {"n": 0}}))
        );
        assert_eq!(store.get_document("comments", "bob/c").unwrap(), None);
        assert!(store.undo_frames_desc().unwrap().is_empty());
        assert_eq!(store.checkpoint().unwrap().last_block_num, 99);
    }

    #[test]
    fn test_revert_recreates_removed_documents() {
        let (store, engine) = engine();

        let original = json!({"community_id": "gls", "user_id": "dan", "active": true});
        store.insert_document("leaders", "gls/dan", &original).unwrap();

        engine.init_block(50, time(50), 1).unwrap();
        store.find_one_and_delete("leaders", "gls/dan").unwrap();
        engine
            .register_change(UndoKind::Remove, "leaders", "gls/dan", original.clone())
            .unwrap();

        engine.revert().unwrap();
        assert_eq!(
            store.get_document("leaders", "gls/dan").unwrap(),
            Some(original)
        );
    }

    #[test]
    fn test_revert_is_lifo_across_frames() {
        let (store, engine) = engine();

        store
            .insert_document("posts", "alice/p", &json!({"v": "genesis"}))
            .unwrap();

        // Block 1 sets v=one, block 2 sets v=two.
        engine.init_block(1, time(1), 1).unwrap();
        store
            .find_one_and_patch("posts", "alice/p", &json!({"$set": {"v": "one"}}))
            .unwrap();
        engine
            .register_change(
                UndoKind::Update,
                "posts",
                "alice/p",
                json!({"$set": {"v": "genesis"}}),
            )
            .unwrap();

        engine.init_block(2, time(2), 2).unwrap();
        store
            .find_one_and_patch("posts", "alice/p", &json!({"$set": {"v": "two"}}))
            .unwrap();
        engine
            .register_change(
                UndoKind::Update,
                "posts",
                "alice/p",
                json!({"$set": {"v": "one"}}),
            )
            .unwrap();

        engine.revert().unwrap();
        assert_eq!(
            store.get_document("posts", "alice/p").unwrap(),
            Some(json!({"v": "genesis"}))
        );
        assert_eq!(store.checkpoint().unwrap().last_block_num, 0);
    }

    #[test]
    fn test_revert_empty_log_is_noop() {
        let (store, engine) = engine();
        engine.revert().unwrap();
        assert_eq!(store.checkpoint().unwrap(), Checkpoint::default());
    }

    #[test]
    fn test_revert_last_block_restores_previous_checkpoint() {
        let (store, engine) = engine();

        engine.init_block(10, time(10), 5).unwrap();
        engine.init_block(11, time(11), 6).unwrap();
        store
            .insert_document("posts", "alice/p", &json!({"n": 1}))
            .unwrap();
        engine
            .register_change(UndoKind::Create, "posts", "alice/p", Value::Null)
            .unwrap();

        engine.revert_last_block().unwrap();

        assert_eq!(store.get_document("posts", "alice/p").unwrap(), None);
        let checkpoint = store.checkpoint().unwrap();
        assert_eq!(checkpoint.last_block_num, 10);
        assert_eq!(checkpoint.last_block_sequence, 5);

        // Only block 10's frame remains.
        let frames = store.undo_frames_desc().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].block_num, 10);
    }

    #[test]
    fn test_revert_last_block_without_predecessor_zeroes_checkpoint() {
        let (store, engine) = engine();
        engine.init_block(1, time(1), 1).unwrap();
        engine.revert_last_block().unwrap();
        assert_eq!(store.checkpoint().unwrap(), Checkpoint::default());
    }

    #[test]
    fn test_operator_payload_round_trips_through_frame() {
        let (store, engine) = engine();

        store
            .insert_document("leaders", "gls/dan", &json!({"votes": ["old"], "rating": 1}))
            .unwrap();

        engine.init_block(7, time(7), 1).unwrap();
        store
            .find_one_and_patch(
                "leaders",
                "gls/dan",
                &json!({"$addToSet": {"votes": "carol"}, "$set": {"rating": 9}}),
            )
            .unwrap();
        engine
            .register_change(
                UndoKind::Update,
                "leaders",
                "gls/dan",
                json!({"$set": {"votes": ["old"], "rating": 1}}),
            )
            .unwrap();

        // The persisted frame must hold escaped operator keys.
        let frames = store.undo_frames_desc().unwrap();
        let stored = serde_json::to_string(&frames[0].stack[0].payload).unwrap();
        assert!(stored.contains("@$set"));
        assert!(!stored.contains("\"$set\""));

        engine.revert().unwrap();
        assert_eq!(
            store.get_document("leaders", "gls/dan").unwrap(),
            Some(json!({"votes": ["old"], "rating": 1}))
        );
    }
}
