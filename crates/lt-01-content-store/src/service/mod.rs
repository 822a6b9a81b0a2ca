//! # Content Store Service
//!
//! The typed facade the projector and the genesis importer talk to.
//! Documents live at `"{collection}/{id}"` keys as JSON; the store derives
//! the document id from the entity's natural key at insert time and undo
//! records reference documents by `(collection, id)`.
//!
//! All methods take `&self`; the key-value backend sits behind an internal
//! lock so the live worker, the pruner and the genesis task pool can share
//! one store handle.

mod undo;


use parking_lot::RwLock;
use serde_json::Value;

use crate::domain::errors::StoreError;
use crate::domain::patch;
use crate::ports::{BatchOp, KeyValueStore};

pub struct ContentStore<K: KeyValueStore> {
    kv: RwLock<K>,
}

impl<K: KeyValueStore> ContentStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv: RwLock::new(kv) }
    }

    /// Fetch a document, or `None` if it does not exist.
    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let kv = self.kv.read();
        let bytes = kv.get(&doc_key(collection, id))?;
        bytes
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::serialization))
            .transpose()
    }

    /// Create or replace a document wholesale.
    pub fn insert_document(
        &self,
        collection: &str,
        id: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(doc).map_err(StoreError::serialization)?;
        let mut kv = self.kv.write();
        kv.put(&doc_key(collection, id), &bytes)?;
        Ok(())
    }

    /// Patch a document, returning its previous state. A missing document
    /// is a no-op returning `None`, so callers can decide whether that is
    /// worth a warning.
    pub fn find_one_and_patch(
        &self,
        collection: &str,
        id: &str,
        update: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let key = doc_key(collection, id);
        let mut kv = self.kv.write();

        let bytes = match kv.get(&key)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let previous: Value =
            serde_json::from_slice(&bytes).map_err(StoreError::serialization)?;

        let mut next = previous.clone();
        patch::apply_update(&mut next, update)?;

        let bytes = serde_json::to_vec(&next).map_err(StoreError::serialization)?;
        kv.put(&key, &bytes)?;
        Ok(Some(previous))
    }

    /// Delete a document, returning what was removed.
    pub fn find_one_and_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let key = doc_key(collection, id);
        let mut kv = self.kv.write();

        let previous = match kv.get(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(StoreError::serialization)?,
            None => return Ok(None),
        };
        kv.delete(&key)?;
        Ok(Some(previous))
    }

    /// Bulk insert into one collection with a single backend write.
    pub fn insert_documents(
        &self,
        collection: &str,
        entries: &[(String, Value)],
    ) -> Result<(), StoreError> {
        let mut batch = Vec::with_capacity(entries.len());
        for (id, doc) in entries {
            let bytes = serde_json::to_vec(doc).map_err(StoreError::serialization)?;
            batch.push(BatchOp::put(doc_key(collection, id), bytes));
        }
        let mut kv = self.kv.write();
        kv.write_batch(batch)?;
        Ok(())
    }

    /// All `(id, document)` pairs of a collection.
    pub fn scan_collection(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let prefix = collection_prefix(collection);
        let kv = self.kv.read();
        let mut entries = Vec::new();
        for (key, bytes) in kv.scan_prefix(&prefix)? {
            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            let doc = serde_json::from_slice(&bytes).map_err(StoreError::serialization)?;
            entries.push((id, doc));
        }
        Ok(entries)
    }

    pub(crate) fn with_kv_read<R>(&self, f: impl FnOnce(&K) -> R) -> R {
        f(&self.kv.read())
    }

    pub(crate) fn with_kv_write<R>(&self, f: impl FnOnce(&mut K) -> R) -> R {
        f(&mut self.kv.write())
    }
}

fn doc_key(collection: &str, id: &str) -> Vec<u8> {
    let mut key = collection_prefix(collection);
    key.extend_from_slice(id.as_bytes());
    key
}

fn collection_prefix(collection: &str) -> Vec<u8> {
    format!("{}/", collection).into_bytes()
}
