//! # Shared Types Crate
//!
//! Domain types shared across the Lattice projection subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Natural Keys**: content is addressed by `(user_id, permlink)`, leaders
//!   by `(community_id, user_id)` - never by store-internal handles.
//! - **Loose Payloads**: chain operations arrive as JSON; typed payload
//!   structs deserialize defensively (`#[serde(default)]`) because the chain
//!   is the authority on shape, not this service.

pub mod block;
pub mod genesis;
pub mod ids;
pub mod ops;
pub mod time;

pub use block::{BlockEnvelope, RawOperation};
pub use genesis::*;
pub use ids::ContentId;
pub use ops::*;
