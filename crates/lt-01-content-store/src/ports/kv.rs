//! The key-value port under the document layer.

use crate::domain::errors::KvError;

/// Abstract ordered key-value store.
///
/// Production: `RocksKv` (behind the `rocksdb` feature) or the
/// checksummed `FileKv`. Testing: `MemoryKv`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError>;

    /// Apply a batch in one write. Backends that support atomic batches
    /// (RocksDB) apply all-or-nothing; the simple backends apply in order.
    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), KvError>;

    /// All `(key, value)` pairs whose key starts with `prefix`.
    /// No ordering guarantee; callers sort when they need one.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError>;
}

/// One entry of a batched write.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Delete { key: key.into() }
    }
}
