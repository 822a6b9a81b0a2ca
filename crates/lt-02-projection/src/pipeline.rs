//! # Block Dispersal Pipeline
//!
//! An unbounded in-memory buffer fed by the chain subscription and
//! drained by a single worker, strictly in arrival order, one block at a
//! time. The worker yields between blocks so it never starves the host
//! scheduler.
//!
//! A fork signal synchronously stops block acceptance (the sink drops
//! everything once the flag is up), the worker discards the buffered
//! remainder - it belongs to the invalidated chain - runs the full
//! revert, and resolves with [`PipelineOutcome::ForkReverted`]. The host
//! maps that to a deliberate zero exit so the external supervisor
//! restarts the process cleanly against the new chain head.
//!
//! Handler errors resolve the worker future with the error: fail fast and
//! replay from the checkpoint beats running with an undo log that no
//! longer matches the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use lt_01_content_store::KeyValueStore;
use shared_types::BlockEnvelope;

use crate::errors::ProjectionError;
use crate::handlers::Projector;

/// How the dispersal worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A fork was reverted; the process should exit zero and be
    /// restarted against the new chain head.
    ForkReverted,
    /// Every sink was dropped. The subscription is assumed reliable, so
    /// this is an abnormal end outside tests.
    SourceClosed,
}

/// Producer handle used by the subscription transport.
#[derive(Clone)]
pub struct BlockSink {
    block_tx: mpsc::UnboundedSender<BlockEnvelope>,
    fork_flag: Arc<AtomicBool>,
    fork_notify: Arc<Notify>,
}

impl BlockSink {
    /// Buffer a block for dispersal. Returns `false` when the block was
    /// dropped - a fork is in progress, or the worker is gone.
    pub fn submit_block(&self, block: BlockEnvelope) -> bool {
        if self.fork_flag.load(Ordering::SeqCst) {
            return false;
        }
        self.block_tx.send(block).is_ok()
    }

    /// Out-of-band fork notification. Halts acceptance before the worker
    /// even wakes up; no block is processed concurrently with the revert.
    pub fn signal_fork(&self) {
        self.fork_flag.store(true, Ordering::SeqCst);
        self.fork_notify.notify_one();
    }
}

pub struct DispersalPipeline {
    sink: BlockSink,
    worker: JoinHandle<Result<PipelineOutcome, ProjectionError>>,
}

impl DispersalPipeline {
    /// Spawn the dispersal worker over `projector`.
    pub fn spawn<K>(projector: Projector<K>) -> Self
    where
        K: KeyValueStore + 'static,
    {
        let (block_tx, block_rx) = mpsc::unbounded_channel();
        let fork_flag = Arc::new(AtomicBool::new(false));
        let fork_notify = Arc::new(Notify::new());

        let sink = BlockSink {
            block_tx,
            fork_flag,
            fork_notify: Arc::clone(&fork_notify),
        };

        let worker = tokio::spawn(run_worker(projector, block_rx, fork_notify));

        Self { sink, worker }
    }

    pub fn sink(&self) -> BlockSink {
        self.sink.clone()
    }

    /// Await the worker's outcome. The pipeline's own sink is released
    /// first, so once external sinks are gone the worker can end.
    pub async fn join(self) -> Result<PipelineOutcome, ProjectionError> {
        let Self { sink, worker } = self;
        drop(sink);
        worker
            .await
            .map_err(|err| ProjectionError::Worker(err.to_string()))?
    }
}

async fn run_worker<K>(
    projector: Projector<K>,
    mut block_rx: mpsc::UnboundedReceiver<BlockEnvelope>,
    fork_notify: Arc<Notify>,
) -> Result<PipelineOutcome, ProjectionError>
where
    K: KeyValueStore + 'static,
{
    loop {
        tokio::select! {
            biased;

            _ = fork_notify.notified() => {
                block_rx.close();
                let mut discarded = 0u64;
                while block_rx.try_recv().is_ok() {
                    discarded += 1;
                }
                if discarded > 0 {
                    warn!(discarded, "discarding buffered blocks of the invalidated chain");
                }

                info!("fork detected, reverting...");
                projector.fork().revert()?;
                info!("revert done, terminating for clean restart");
                return Ok(PipelineOutcome::ForkReverted);
            }

            block = block_rx.recv() => {
                match block {
                    Some(block) => {
                        projector.disperse(&block)?;
                        // Keep the host scheduler breathing between blocks.
                        tokio::task::yield_now().await;
                    }
                    None => return Ok(PipelineOutcome::SourceClosed),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectionConfig;
    use chrono::{TimeZone, Utc};
    use lt_01_content_store::{ContentStore, MemoryKv};
    use serde_json::json;
    use shared_types::RawOperation;

    fn block(num: u64, ops: Vec<RawOperation>) -> BlockEnvelope {
        BlockEnvelope {
            block_num: num,
            block_time: Utc.timestamp_opt(num as i64, 0).unwrap(),
            sequence: num,
            real_ops: ops,
            virtual_ops: Vec::new(),
        }
    }

    fn post_op(author: &str, permlink: &str) -> RawOperation {
        RawOperation::new(
            "createmssg",
            json!({"author": author, "permlink": permlink, "title": "t", "body": "b"}),
        )
    }

    #[tokio::test]
    async fn test_blocks_processed_in_order() {
        let store = Arc::new(ContentStore::new(MemoryKv::new()));
        let projector = Projector::new(Arc::clone(&store), ProjectionConfig::default());
        let pipeline = DispersalPipeline::spawn(projector);

        let sink = pipeline.sink();
        for num in 1..=3u64 {
            assert!(sink.submit_block(block(num, vec![post_op("alice", &format!("p{}", num))])));
        }
        drop(sink);

        let outcome = pipeline.join().await.unwrap();
        assert_eq!(outcome, PipelineOutcome::SourceClosed);

        assert_eq!(store.checkpoint().unwrap().last_block_num, 3);
        assert_eq!(store.scan_collection("posts").unwrap().len(), 3);
        assert_eq!(store.undo_frames_desc().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fork_reverts_and_rejects_new_blocks() {
        let store = Arc::new(ContentStore::new(MemoryKv::new()));
        let projector = Projector::new(Arc::clone(&store), ProjectionConfig::default());
        let pipeline = DispersalPipeline::spawn(projector);

        let sink = pipeline.sink();
        assert!(sink.submit_block(block(1, vec![post_op("alice", "p1")])));
        // Give the worker a chance to drain before the fork arrives.
        tokio::task::yield_now().await;

        sink.signal_fork();
        assert!(!sink.submit_block(block(2, vec![post_op("alice", "p2")])));

        let outcome = pipeline.join().await.unwrap();
        assert_eq!(outcome, PipelineOutcome::ForkReverted);

        // Everything block 1 did is gone again.
        assert!(store.scan_collection("posts").unwrap().is_empty());
        assert!(store.undo_frames_desc().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_is_not_fatal() {
        let store = Arc::new(ContentStore::new(MemoryKv::new()));
        let projector = Projector::new(Arc::clone(&store), ProjectionConfig::default());
        let pipeline = DispersalPipeline::spawn(projector);

        let sink = pipeline.sink();
        sink.submit_block(block(
            1,
            vec![
                RawOperation::new("transfer", json!({"from": "a", "to": "b"})),
                post_op("alice", "p1"),
            ],
        ));
        drop(sink);

        pipeline.join().await.unwrap();
        assert_eq!(store.scan_collection("posts").unwrap().len(), 1);
        assert_eq!(store.checkpoint().unwrap().last_block_num, 1);
    }
}
