//! Natural identifiers for projected entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural id of a post or comment: the author plus the author-chosen
/// permanent link. Unique across the whole platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId {
    pub user_id: String,
    pub permlink: String,
}

impl ContentId {
    pub fn new(user_id: impl Into<String>, permlink: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            permlink: permlink.into(),
        }
    }

    /// Canonical `"user/permlink"` form, used as the storage document id.
    pub fn as_key(&self) -> String {
        format!("{}/{}", self.user_id, self.permlink)
    }

    /// Parse the canonical form back into an id. Permlinks cannot contain
    /// `/`, so splitting on the first one is unambiguous.
    pub fn from_key(key: &str) -> Option<Self> {
        let (user_id, permlink) = key.split_once('/')?;
        if user_id.is_empty() || permlink.is_empty() {
            return None;
        }
        Some(Self::new(user_id, permlink))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.permlink)
    }
}

/// Storage document id of a leader record: `"community/user"`.
pub fn leader_key(community_id: &str, user_id: &str) -> String {
    format!("{}/{}", community_id, user_id)
}

/// Storage document id of a proposal record: `"proposer/proposal"`.
pub fn proposal_key(proposer: &str, proposal_id: &str) -> String {
    format!("{}/{}", proposer, proposal_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_round_trip() {
        let id = ContentId::new("alice", "first-post");
        assert_eq!(id.as_key(), "alice/first-post");
        assert_eq!(ContentId::from_key("alice/first-post"), Some(id));
    }

    #[test]
    fn test_content_id_rejects_malformed_keys() {
        assert_eq!(ContentId::from_key("noslash"), None);
        assert_eq!(ContentId::from_key("/x"), None);
        assert_eq!(ContentId::from_key("x/"), None);
    }
}
