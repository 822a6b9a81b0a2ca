//! # Batched Writer
//!
//! Accumulates documents of one collection and flushes them as a single
//! bulk store write once the threshold is reached, or on `finish()`. At
//! most one batch per collection is ever pending. A flush failure is
//! fatal to the run.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use lt_01_content_store::{ContentStore, KeyValueStore};

use crate::errors::ImportError;

pub struct BulkWriter<K: KeyValueStore> {
    store: Arc<ContentStore<K>>,
    collection: &'static str,
    threshold: usize,
    pending: Vec<(String, Value)>,
    saved: u64,
    finished: bool,
}

impl<K: KeyValueStore> BulkWriter<K> {
    pub fn new(store: Arc<ContentStore<K>>, collection: &'static str, threshold: usize) -> Self {
        Self {
            store,
            collection,
            threshold: threshold.max(1),
            pending: Vec::new(),
            saved: 0,
            finished: false,
        }
    }

    pub fn add_entry(&mut self, id: String, doc: Value) -> Result<(), ImportError> {
        if self.finished {
            return Err(ImportError::stream(format!(
                "entry for {} after finish",
                self.collection
            )));
        }
        self.pending.push((id, doc));
        if self.pending.len() >= self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush the tail and seal the writer. Returns the total saved.
    pub fn finish(&mut self) -> Result<u64, ImportError> {
        if !self.finished {
            self.flush()?;
            self.finished = true;
            info!(
                collection = self.collection,
                saved = self.saved,
                "bulk writer finished"
            );
        }
        Ok(self.saved)
    }

    pub fn queue_len(&self) -> usize {
        self.pending.len()
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }

    fn flush(&mut self) -> Result<(), ImportError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let count = batch.len() as u64;
        self.store.insert_documents(self.collection, &batch)?;
        self.saved += count;
        debug!(collection = self.collection, count, "bulk batch written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lt_01_content_store::MemoryKv;
    use serde_json::json;

    fn store() -> Arc<ContentStore<MemoryKv>> {
        Arc::new(ContentStore::new(MemoryKv::new()))
    }

    #[test]
    fn test_flushes_at_threshold() {
        let store = store();
        let mut writer = BulkWriter::new(Arc::clone(&store), "posts", 3);

        for i in 0..2 {
            writer.add_entry(format!("u{}/p", i), json!({"i": i})).unwrap();
        }
        // Below threshold: nothing written yet.
        assert!(store.scan_collection("posts").unwrap().is_empty());
        assert_eq!(writer.queue_len(), 2);

        writer.add_entry("u2/p".to_string(), json!({"i": 2})).unwrap();
        assert_eq!(store.scan_collection("posts").unwrap().len(), 3);
        assert_eq!(writer.queue_len(), 0);
    }

    #[test]
    fn test_finish_flushes_tail_and_seals() {
        let store = store();
        let mut writer = BulkWriter::new(Arc::clone(&store), "leaders", 100);

        writer.add_entry("gls/dan".to_string(), json!({})).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);
        assert_eq!(store.scan_collection("leaders").unwrap().len(), 1);

        let err = writer.add_entry("gls/erin".to_string(), json!({}));
        assert!(err.is_err());
    }

    #[test]
    fn test_finish_twice_is_idempotent() {
        let store = store();
        let mut writer = BulkWriter::new(store, "pins", 10);
        writer.add_entry("a/b".to_string(), json!({})).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);
        assert_eq!(writer.finish().unwrap(), 1);
    }
}
