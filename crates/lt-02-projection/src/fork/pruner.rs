//! Timed undo-frame pruning.
//!
//! Frames older than `checkpoint - safety_window` can no longer be
//! needed by any plausible fork, so a background task deletes them on a
//! fixed interval. A pruning failure is fatal: continuing with an
//! incomplete prune risks a silently broken revert, so the task resolves
//! with the error and the host process exits.

use std::sync::Arc;

use tracing::{debug, info};

use lattice_telemetry::metrics::UNDO_FRAMES_PRUNED;
use lt_01_content_store::{ContentStore, KeyValueStore};

use crate::config::ProjectionConfig;
use crate::errors::ProjectionError;
use crate::fork::ForkEngine;

pub struct UndoPruner<K: KeyValueStore> {
    store: Arc<ContentStore<K>>,
    engine: ForkEngine<K>,
    config: ProjectionConfig,
}

impl<K: KeyValueStore> UndoPruner<K> {
    pub fn new(store: Arc<ContentStore<K>>, config: ProjectionConfig) -> Self {
        let engine = ForkEngine::new(Arc::clone(&store));
        Self {
            store,
            engine,
            config,
        }
    }

    /// Run the pruning loop. Only returns on failure.
    pub async fn run(self) -> Result<(), ProjectionError> {
        let mut interval = tokio::time::interval(self.config.prune_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a fresh process
        // does not prune before processing anything.
        interval.tick().await;

        loop {
            interval.tick().await;
            self.prune_once()?;
        }
    }

    /// One pruning pass: delete frames behind the safety window.
    pub fn prune_once(&self) -> Result<u64, ProjectionError> {
        debug!("start undo frame pruning...");

        let checkpoint = self.store.checkpoint()?;
        if checkpoint.last_block_num == 0 {
            return Ok(0);
        }

        let edge = checkpoint
            .last_block_num
            .saturating_sub(self.config.safety_window());
        let pruned = self.engine.prune(edge)?;

        if pruned > 0 {
            UNDO_FRAMES_PRUNED.inc_by(pruned as f64);
            info!(edge, pruned, "undo frame pruning done");
        }
        Ok(pruned)
    }
}
