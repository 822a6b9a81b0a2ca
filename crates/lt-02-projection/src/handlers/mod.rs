//! # Content Projector
//!
//! Per-entity handlers mutating the store. Every mutation captures the
//! previous document state and registers the inverse with the fork
//! engine, in mutation order, so a revert restores the exact pre-block
//! view.

mod content;
mod leader;
mod profile;
mod proposal;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use lt_01_content_store::{ContentStore, KeyValueStore};

use crate::config::ProjectionConfig;
use crate::fork::ForkEngine;

/// Context shared by all operations of one block.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub community_id: String,
    pub block_time: DateTime<Utc>,
}

pub struct Projector<K: KeyValueStore> {
    store: Arc<ContentStore<K>>,
    fork: ForkEngine<K>,
    config: ProjectionConfig,
}

impl<K: KeyValueStore> Projector<K> {
    pub fn new(store: Arc<ContentStore<K>>, config: ProjectionConfig) -> Self {
        let fork = ForkEngine::new(Arc::clone(&store));
        Self {
            store,
            fork,
            config,
        }
    }

    pub fn store(&self) -> &ContentStore<K> {
        &self.store
    }

    pub fn store_handle(&self) -> Arc<ContentStore<K>> {
        Arc::clone(&self.store)
    }

    pub fn fork(&self) -> &ForkEngine<K> {
        &self.fork
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }
}
