//! Operation routing.
//!
//! One block carries real operations (signed by users) and virtual
//! operations (synthesized by the chain). Both are routed by kind through
//! an explicit enum; an unknown kind is logged and skipped, never fatal -
//! the chain evolves faster than this projection.

use tracing::{debug, error};

use lattice_telemetry::metrics::{BLOCKS_DISPERSED, BLOCK_DISPERSE_DURATION, UNKNOWN_OPERATIONS};
use lattice_telemetry::metrics::HistogramTimer;
use lt_01_content_store::KeyValueStore;
use serde::de::DeserializeOwned;
use shared_types::{BlockEnvelope, RawOperation};

use crate::errors::ProjectionError;
use crate::handlers::{OpContext, Projector};

/// Real operation kinds the projector understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    CreateMessage,
    UpdateMessage,
    DeleteMessage,
    Upvote,
    Downvote,
    Unvote,
    RegWitness,
    UnregWitness,
    StartWitness,
    StopWitness,
    VoteWitness,
    UnvoteWitness,
    Propose,
    ApproveProposal,
    ExecProposal,
}

impl OperationKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "createmssg" => Some(Self::CreateMessage),
            "updatemssg" => Some(Self::UpdateMessage),
            "deletemssg" => Some(Self::DeleteMessage),
            "upvote" => Some(Self::Upvote),
            "downvote" => Some(Self::Downvote),
            "unvote" => Some(Self::Unvote),
            "regwitness" => Some(Self::RegWitness),
            "unregwitness" => Some(Self::UnregWitness),
            "startwitness" => Some(Self::StartWitness),
            "stopwitness" => Some(Self::StopWitness),
            "votewitness" => Some(Self::VoteWitness),
            "unvotewitness" => Some(Self::UnvoteWitness),
            "propose" => Some(Self::Propose),
            "approve" => Some(Self::ApproveProposal),
            "exec" => Some(Self::ExecProposal),
            _ => None,
        }
    }
}

/// Virtual kinds reserved for reward/payout projection. Currently
/// no-ops; the dispatcher keeps them recognized so adding handlers does
/// not change the routing contract.
const VIRTUAL_KINDS: &[&str] = &[
    "author_reward",
    "curation_reward",
    "comment_reward",
    "comment_payout_update",
    "producer_reward",
];

impl<K: KeyValueStore> Projector<K> {
    /// Disperse one block: open its undo frame, route every operation in
    /// order, then advance the checkpoint.
    pub fn disperse(&self, block: &BlockEnvelope) -> Result<(), ProjectionError> {
        let _timer = HistogramTimer::new(&BLOCK_DISPERSE_DURATION);

        self.fork()
            .init_block(block.block_num, block.block_time, block.sequence)?;

        let ctx = OpContext {
            community_id: self.config().default_community.clone(),
            block_time: block.block_time,
        };

        for op in &block.real_ops {
            self.disperse_real(op, &ctx)?;
        }
        for op in &block.virtual_ops {
            self.disperse_virtual(op, &ctx)?;
        }

        let mut checkpoint = self.store().checkpoint()?;
        checkpoint.advance(block.block_num, block.block_time, block.sequence);
        self.store().set_checkpoint(&checkpoint)?;

        BLOCKS_DISPERSED.inc();
        Ok(())
    }

    pub fn disperse_real(
        &self,
        op: &RawOperation,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let Some(kind) = OperationKind::parse(&op.kind) else {
            error!(kind = %op.kind, "unknown real operation kind, skip");
            UNKNOWN_OPERATIONS.with_label_values(&["real"]).inc();
            return Ok(());
        };

        match kind {
            OperationKind::CreateMessage => {
                self.handle_message_create(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::UpdateMessage => {
                self.handle_message_update(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::DeleteMessage => {
                self.handle_message_delete(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::Upvote | OperationKind::Downvote | OperationKind::Unvote => {
                // Vote projection belongs to the read side; arrival is
                // still worth a trace for debugging feeds.
                debug!(kind = %op.kind, "vote operation ignored");
                Ok(())
            }
            OperationKind::RegWitness => {
                self.handle_leader_register(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::UnregWitness => {
                self.handle_leader_unregister(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::StartWitness => {
                self.handle_leader_activate(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::StopWitness => {
                self.handle_leader_deactivate(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::VoteWitness => {
                self.handle_leader_vote(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::UnvoteWitness => {
                self.handle_leader_unvote(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::Propose => self.handle_proposal_create(decode(&op.kind, &op.payload)?, ctx),
            OperationKind::ApproveProposal => {
                self.handle_proposal_approve(decode(&op.kind, &op.payload)?, ctx)
            }
            OperationKind::ExecProposal => {
                self.handle_proposal_exec(decode(&op.kind, &op.payload)?, ctx)
            }
        }
    }

    pub fn disperse_virtual(
        &self,
        op: &RawOperation,
        _ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        if VIRTUAL_KINDS.contains(&op.kind.as_str()) {
            // Reserved extension point for reward/payout projection.
            return Ok(());
        }
        error!(kind = %op.kind, "unknown virtual operation kind, skip");
        UNKNOWN_OPERATIONS.with_label_values(&["virtual"]).inc();
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(kind: &str, payload: &serde_json::Value) -> Result<T, ProjectionError> {
    serde_json::from_value(payload.clone()).map_err(|err| ProjectionError::payload(kind, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(
            OperationKind::parse("createmssg"),
            Some(OperationKind::CreateMessage)
        );
        assert_eq!(
            OperationKind::parse("votewitness"),
            Some(OperationKind::VoteWitness)
        );
        assert_eq!(OperationKind::parse("exec"), Some(OperationKind::ExecProposal));
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert_eq!(OperationKind::parse("transfer"), None);
        assert_eq!(OperationKind::parse(""), None);
    }
}
