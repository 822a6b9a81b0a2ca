//! # Lattice Projection Runtime
//!
//! Process wiring for the projection service: environment-driven
//! configuration, store backend construction, the live pipeline with its
//! pruner, and the one-shot genesis import mode.
//!
//! ## Exit-code contract
//!
//! - handler failure, pruning failure, genesis batch failure → non-zero
//!   exit; recovery is an external restart replaying from the checkpoint
//! - successful fork revert → deliberate **zero** exit, so the supervisor
//!   restarts the process cleanly against the new chain head

pub mod config;
pub mod genesis_source;
pub mod runner;
pub mod subscription;

pub use config::{RuntimeConfig, StoreBackend};
