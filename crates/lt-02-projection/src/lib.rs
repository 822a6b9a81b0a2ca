//! # Projection Subsystem - Live Path
//!
//! Consumes the ordered block stream and keeps the materialized view
//! exactly equivalent to chain state, across forks.
//!
//! ## Architecture
//!
//! ```text
//! subscription ──submit_block──→ [buffer] ──→ worker ──→ dispatcher
//!        │                                                   │
//!        └──signal_fork──→ revert (undo frames, newest first) │
//!                                                    handlers ┴→ store
//! ```
//!
//! - `dispatch` - enum-keyed routing of operation kinds to handlers;
//!   unknown kinds are logged and skipped, never fatal
//! - `handlers/` - per-entity projection (post, comment, profile, leader,
//!   proposal); every mutation registers its inverse first-class
//! - `ordering` - pure computation of comment position keys
//! - `fork/` - the undo-log engine and the frame pruner
//! - `pipeline` - the single-worker dispersal loop and fork handling
//!
//! Any handler failure is fatal by design: a partially applied,
//! undo-incomplete mutation is worse than a crash, so the pipeline
//! resolves with the error and the host process exits for an external
//! restart from the checkpoint.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod fork;
pub mod handlers;
pub mod ordering;
pub mod pipeline;

pub use config::ProjectionConfig;
pub use errors::ProjectionError;
pub use fork::{ForkEngine, UndoPruner};
pub use handlers::{OpContext, Projector};
pub use pipeline::{BlockSink, DispersalPipeline, PipelineOutcome};
