//! In-memory key-value store, for tests and ephemeral runs.

use std::collections::BTreeMap;

use crate::domain::errors::KvError;
use crate::ports::{BatchOp, KeyValueStore};

/// BTreeMap-backed store. Keys come back from `scan_prefix` already
/// sorted, which the simple backends get for free.
#[derive(Debug, Default)]
pub struct MemoryKv {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.data.remove(key);
        Ok(())
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), KvError> {
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let mut store = MemoryKv::new();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));

        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_scan_prefix_is_bounded() {
        let mut store = MemoryKv::new();
        store.put(b"posts/a", b"1").unwrap();
        store.put(b"posts/b", b"2").unwrap();
        store.put(b"profiles/a", b"3").unwrap();

        let posts = store.scan_prefix(b"posts/").unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].0, b"posts/a".to_vec());
    }

    #[test]
    fn test_write_batch() {
        let mut store = MemoryKv::new();
        store.put(b"x", b"old").unwrap();
        store
            .write_batch(vec![BatchOp::put(b"y", b"1"), BatchOp::delete(b"x")])
            .unwrap();
        assert_eq!(store.get(b"x").unwrap(), None);
        assert_eq!(store.get(b"y").unwrap(), Some(b"1".to_vec()));
    }
}
