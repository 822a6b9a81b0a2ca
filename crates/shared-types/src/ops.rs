//! Typed payloads for the chain operations the projector handles.
//!
//! Handlers deserialize [`crate::RawOperation::payload`] into these with
//! `serde_json::from_value`. Fields the chain may omit default to empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ContentId;

/// Payload of `createmssg` / `updatemssg`. A message without a parent
/// author is a post; with one it is a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub author: String,
    pub permlink: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Raw embedded metadata; malformed content is projected as empty.
    #[serde(default)]
    pub json_metadata: String,
    #[serde(default)]
    pub parent_author: String,
    #[serde(default)]
    pub parent_permlink: String,
}

impl MessagePayload {
    pub fn content_id(&self) -> ContentId {
        ContentId::new(self.author.clone(), self.permlink.clone())
    }

    pub fn parent_content_id(&self) -> Option<ContentId> {
        if self.parent_author.is_empty() {
            None
        } else {
            Some(ContentId::new(
                self.parent_author.clone(),
                self.parent_permlink.clone(),
            ))
        }
    }

    /// A message is a comment when it names a parent author.
    pub fn is_comment(&self) -> bool {
        !self.parent_author.is_empty()
    }
}

/// Payload of `deletemssg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMessagePayload {
    pub author: String,
    pub permlink: String,
}

impl DeleteMessagePayload {
    pub fn content_id(&self) -> ContentId {
        ContentId::new(self.author.clone(), self.permlink.clone())
    }
}

/// Payload of `upvote` / `downvote` / `unvote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotePayload {
    pub voter: String,
    pub author: String,
    pub permlink: String,
    #[serde(default)]
    pub weight: i64,
}

/// Payload of `regwitness`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessPayload {
    pub witness: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Payload of `unregwitness` / `startwitness` / `stopwitness`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessStatePayload {
    pub witness: String,
}

/// Payload of `votewitness` / `unvotewitness`. The chain attaches the
/// recomputed rating as the first emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessVotePayload {
    pub voter: String,
    pub witness: String,
    #[serde(default)]
    pub events: Vec<ChainEvent>,
}

impl WitnessVotePayload {
    /// Rating as recomputed by the chain, if the event made it through.
    pub fn rating(&self) -> Option<i64> {
        self.events.first().map(|event| event.args.weight)
    }
}

/// An event emitted alongside an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEvent {
    #[serde(default)]
    pub args: ChainEventArgs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainEventArgs {
    #[serde(default)]
    pub weight: i64,
}

/// An approval slot requested by, or granted on, a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalLevel {
    pub actor: String,
    #[serde(default)]
    pub permission: String,
}

/// Payload of `propose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposePayload {
    pub proposer: String,
    pub proposal_name: String,
    #[serde(default)]
    pub requested: Vec<ApprovalLevel>,
    pub trx: ProposalTrx,
}

/// The proposed transaction. Only single-action parameter-change
/// transactions are projected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalTrx {
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub actions: Vec<TrxAction>,
}

/// One action inside a proposed transaction. `data` is kept opaque; the
/// transport delivers it already deserialized from the chain ABI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrxAction {
    pub account: String,
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of `approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovePayload {
    pub proposer: String,
    pub proposal_name: String,
    pub level: ApprovalLevel,
}

/// Payload of `exec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecPayload {
    pub proposer: String,
    pub proposal_name: String,
    #[serde(default)]
    pub executer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_payload_post_vs_comment() {
        let post: MessagePayload = serde_json::from_value(json!({
            "author": "alice",
            "permlink": "hello",
            "title": "Hello",
            "body": "First!",
        }))
        .unwrap();
        assert!(!post.is_comment());
        assert_eq!(post.parent_content_id(), None);

        let comment: MessagePayload = serde_json::from_value(json!({
            "author": "bob",
            "permlink": "re-hello",
            "body": "welcome",
            "parent_author": "alice",
            "parent_permlink": "hello",
        }))
        .unwrap();
        assert!(comment.is_comment());
        assert_eq!(
            comment.parent_content_id(),
            Some(ContentId::new("alice", "hello"))
        );
    }

    #[test]
    fn test_witness_vote_rating_from_events() {
        let payload: WitnessVotePayload = serde_json::from_value(json!({
            "voter": "carol",
            "witness": "dan",
            "events": [{"args": {"weight": 420}}],
        }))
        .unwrap();
        assert_eq!(payload.rating(), Some(420));

        let bare: WitnessVotePayload = serde_json::from_value(json!({
            "voter": "carol",
            "witness": "dan",
        }))
        .unwrap();
        assert_eq!(bare.rating(), None);
    }
}
