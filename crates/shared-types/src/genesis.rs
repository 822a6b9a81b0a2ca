//! Records delivered by the one-shot genesis-data collaborator.
//!
//! The bulk stream is typed: every record carries one of four kinds, and
//! each kind is terminated by an explicit end-of-type signal.

use serde::{Deserialize, Serialize};

/// The four record kinds of the historical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenesisRecordKind {
    Account,
    Message,
    Pin,
    WitnessState,
}

impl GenesisRecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenesisRecordKind::Account => "account",
            GenesisRecordKind::Message => "message",
            GenesisRecordKind::Pin => "pin",
            GenesisRecordKind::WitnessState => "witnessstate",
        }
    }
}

/// One record of the genesis stream, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum GenesisRecord {
    Account(GenesisAccount),
    Message(GenesisMessage),
    Pin(GenesisPin),
    WitnessState(GenesisWitnessState),
}

impl GenesisRecord {
    pub fn kind(&self) -> GenesisRecordKind {
        match self {
            GenesisRecord::Account(_) => GenesisRecordKind::Account,
            GenesisRecord::Message(_) => GenesisRecordKind::Message,
            GenesisRecord::Pin(_) => GenesisRecordKind::Pin,
            GenesisRecord::WitnessState(_) => GenesisRecordKind::WitnessState,
        }
    }
}

/// A platform account. `created` is the chain's local-time string; the
/// epoch sentinel `1970-01-01T00:00:00.000` means "unknown".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub created: String,
}

/// A historical post or comment. Parent fields follow the same
/// convention as live messages: an empty parent author marks a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisMessage {
    pub author: String,
    pub permlink: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub votes: Vec<GenesisVote>,
    #[serde(default)]
    pub parent_author: String,
    #[serde(default)]
    pub parent_permlink: String,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisVote {
    pub voter: String,
    pub weight: i64,
}

/// A historical subscription edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisPin {
    pub pinner: String,
    pub pinning: String,
}

/// Final state of a historical witness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisWitnessState {
    pub witness: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tag_round_trip() {
        let json = r#"{"type":"witnessstate","data":{"witness":"dan","weight":7,"active":true}}"#;
        let record: GenesisRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind(), GenesisRecordKind::WitnessState);
        match record {
            GenesisRecord::WitnessState(state) => {
                assert_eq!(state.witness, "dan");
                assert_eq!(state.weight, 7);
                assert!(state.active);
            }
            _ => panic!("wrong variant"),
        }
    }
}
