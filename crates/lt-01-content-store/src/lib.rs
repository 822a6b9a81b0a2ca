//! # Content Store
//!
//! Persistence subsystem for the Lattice projection. Entities are JSON
//! documents in named collections, mutated either by whole-document writes
//! or by operator-keyed patches; both paths sit on a pluggable key-value
//! port.
//!
//! ## Architecture
//!
//! - `domain/` - documents, patch engine, operator-key escape codec,
//!   undo frames, errors
//! - `ports/` - the `KeyValueStore` trait the host must satisfy
//! - `adapters/` - in-memory and checksummed file-backed stores
//!   (RocksDB behind the `rocksdb` feature)
//! - `service/` - the typed `ContentStore` facade used by the projector
//!   and the genesis importer

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileKv, MemoryKv};
pub use domain::documents::{self, collections};
pub use domain::errors::{KvError, StoreError};
pub use domain::undo::{Checkpoint, UndoFrame, UndoKind, UndoOp};
pub use ports::{BatchOp, KeyValueStore};
pub use service::ContentStore;
