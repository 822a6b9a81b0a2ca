//! Projected entity documents.
//!
//! Entities are persisted as JSON documents so that operator-keyed patches
//! (and their inverses) apply uniformly; these structs are the typed
//! builders the projector and importer use to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_types::ContentId;

/// Collection names of the materialized view.
pub mod collections {
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const PROFILES: &str = "profiles";
    pub const LEADERS: &str = "leaders";
    pub const PROPOSALS: &str = "proposals";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Extracted content shared by posts and comments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSection {
    pub title: String,
    pub body: ContentBody,
    /// Parsed embedded metadata; malformed input projects as `{}`.
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBody {
    pub preview: String,
    pub full: String,
}

/// Vote tallies kept on content documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteSet {
    pub up_votes: Vec<VoteEntry>,
    pub up_count: u64,
    pub down_votes: Vec<VoteEntry>,
    pub down_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEntry {
    pub user_id: String,
    pub weight: i64,
}

impl VoteSet {
    /// Sort a raw vote list into up/down tallies; zero weights are noise.
    pub fn from_weighted(votes: impl IntoIterator<Item = (String, i64)>) -> Self {
        let mut set = VoteSet::default();
        for (user_id, weight) in votes {
            let entry = VoteEntry { user_id, weight };
            if weight > 0 {
                set.up_votes.push(entry);
                set.up_count += 1;
            } else if weight < 0 {
                set.down_votes.push(entry);
                set.down_count += 1;
            }
        }
        set
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostStats {
    pub comments_count: u64,
    /// Monotonic counter feeding comment ordering keys. Never reset, so
    /// keys are never reused within the post.
    pub comment_order_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocument {
    pub content_id: ContentId,
    pub community_id: String,
    pub content: ContentSection,
    pub tags: Vec<String>,
    pub votes: VoteSet,
    pub stats: PostStats,
    pub meta: ContentMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMeta {
    pub time: DateTime<Utc>,
}

/// Parent linkage of a comment. Both fields stay `None` for an orphan
/// whose parent lies outside the observed window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentParent {
    pub post: Option<ContentId>,
    pub comment: Option<ContentId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentOrdering {
    /// Range-sortable position key; lexicographic order reproduces
    /// arrival order within one post.
    pub by_time: Option<String>,
    pub nested_level: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDocument {
    pub content_id: ContentId,
    pub community_id: String,
    pub content: ContentSection,
    pub votes: VoteSet,
    pub parent: CommentParent,
    pub ordering: CommentOrdering,
    pub meta: ContentMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    pub posts_count: u64,
    pub comments_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub user_id: String,
    /// Per-community usernames, keyed by community id.
    pub usernames: serde_json::Map<String, Value>,
    pub registration: ProfileRegistration,
    pub stats: ProfileStats,
    /// Communities where this user is currently an active leader.
    pub leader_in: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRegistration {
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderDocument {
    pub community_id: String,
    pub user_id: String,
    pub url: String,
    pub rating: i64,
    pub votes: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalChange {
    pub structure_name: String,
    pub values: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalApprove {
    pub user_id: String,
    pub permission: String,
    #[serde(default)]
    pub is_signed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDocument {
    pub community_id: String,
    pub proposer: String,
    pub proposal_id: String,
    /// Contract account the proposed action targets, e.g. `gls.publish`.
    pub code: String,
    pub action: String,
    pub block_time: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
    pub changes: Vec<ProposalChange>,
    pub approves: Vec<ProposalApprove>,
    pub is_executed: bool,
    pub executer: Option<String>,
    pub executed_block_time: Option<DateTime<Utc>>,
}

/// A subscription edge, written only by the genesis import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDocument {
    pub pinner: String,
    pub pinning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_set_from_weighted() {
        let set = VoteSet::from_weighted([
            ("alice".to_string(), 100),
            ("bob".to_string(), -50),
            ("carol".to_string(), 0),
        ]);
        assert_eq!(set.up_count, 1);
        assert_eq!(set.down_count, 1);
        assert_eq!(set.up_votes[0].user_id, "alice");
        assert_eq!(set.down_votes[0].user_id, "bob");
    }
}
