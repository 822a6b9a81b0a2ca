//! Driven ports: interfaces the host must satisfy.

mod kv;

pub use kv::{BatchOp, KeyValueStore};
