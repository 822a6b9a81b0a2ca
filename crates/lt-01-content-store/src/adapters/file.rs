//! File-backed key-value store.
//!
//! Persists the whole map as one bincode image guarded by a CRC32
//! checksum, written atomically via a temp file. Durability without a
//! database dependency; suitable for development and light production.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::errors::KvError;
use crate::ports::{BatchOp, KeyValueStore};

#[derive(Serialize, Deserialize)]
struct Image {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    checksum: u32,
}

pub struct FileKv {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileKv {
    /// Open (or create) the store at `path`. A corrupt image is refused
    /// rather than silently truncated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let path = path.as_ref().to_path_buf();
        let data = match Self::load(&path)? {
            Some(data) => {
                info!(path = %path.display(), keys = data.len(), "loaded store image");
                data
            }
            None => {
                info!(path = %path.display(), "no store image found, starting empty");
                BTreeMap::new()
            }
        };
        Ok(Self { data, path })
    }

    fn load(path: &Path) -> Result<Option<BTreeMap<Vec<u8>, Vec<u8>>>, KvError> {
        let mut file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(KvError::Io(err.to_string())),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|err| KvError::Io(err.to_string()))?;

        let image: Image =
            bincode::deserialize(&bytes).map_err(|err| KvError::Corruption(err.to_string()))?;

        let actual = checksum_of(&image.entries);
        if actual != image.checksum {
            warn!(
                expected = image.checksum,
                actual, "store image checksum mismatch"
            );
            return Err(KvError::Corruption(format!(
                "checksum mismatch: expected {}, got {}",
                image.checksum, actual
            )));
        }

        Ok(Some(image.entries.into_iter().collect()))
    }

    fn persist(&self) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| KvError::Io(err.to_string()))?;
        }

        let entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .data
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let image = Image {
            checksum: checksum_of(&entries),
            entries,
        };
        let bytes = bincode::serialize(&image).map_err(|err| KvError::Io(err.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp).map_err(|err| KvError::Io(err.to_string()))?;
        file.write_all(&bytes)
            .map_err(|err| KvError::Io(err.to_string()))?;
        file.sync_all().map_err(|err| KvError::Io(err.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|err| KvError::Io(err.to_string()))?;
        Ok(())
    }
}

fn checksum_of(entries: &[(Vec<u8>, Vec<u8>)]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for (key, value) in entries {
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(key);
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value);
    }
    hasher.finalize()
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.data.insert(key.to_vec(), value.to_vec());
        self.persist()
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.data.remove(key);
        self.persist()
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
        self.persist()
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
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let mut store = FileKv::open(&path).unwrap();
            store.put(b"a", b"1").unwrap();
            store
                .write_batch(vec![BatchOp::put(b"b", b"2"), BatchOp::put(b"c", b"3")])
                .unwrap();
        }

        let store = FileKv::open(&path).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.scan_prefix(b"").unwrap().len(), 3);
    }

    #[test]
    fn test_corrupt_image_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let mut store = FileKv::open(&path).unwrap();
            store.put(b"a", b"1").unwrap();
        }

        // Flip a byte in the middle of the image.
        let mut bytes = std::fs::read(&path).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        assert!(FileKv::open(&path).is_err());
    }
}
