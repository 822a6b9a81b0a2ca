//! Key-value store adapters.

mod file;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use file::FileKv;
pub use memory::MemoryKv;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksKv;
