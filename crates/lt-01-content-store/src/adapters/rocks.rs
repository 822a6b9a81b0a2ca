//! RocksDB-backed key-value store (feature `rocksdb`).

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};

use crate::domain::errors::KvError;
use crate::ports::{BatchOp, KeyValueStore};

pub struct RocksKv {
    db: DB,
}

impl RocksKv {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path).map_err(|err| KvError::Backend(err.to_string()))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for RocksKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        self.db
            .get(key)
            .map_err(|err| KvError::Backend(err.to_string()))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.db
            .put(key, value)
            .map_err(|err| KvError::Backend(err.to_string()))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.db
            .delete(key)
            .map_err(|err| KvError::Backend(err.to_string()))
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), KvError> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.put(key, value),
                BatchOp::Delete { key } => batch.delete(key),
            }
        }
        self.db
            .write(batch)
            .map_err(|err| KvError::Backend(err.to_string()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(|err| KvError::Backend(err.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}
