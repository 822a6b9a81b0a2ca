//! Governance proposal projection.
//!
//! Only single-action parameter-change proposals against the recognized
//! contract scopes are projected; everything else is someone else's
//! multisig traffic and silently ignored.

use serde_json::{json, Value};
use tracing::warn;

use lt_01_content_store::documents::collections::PROPOSALS;
use lt_01_content_store::documents::{ProposalApprove, ProposalChange, ProposalDocument};
use lt_01_content_store::{KeyValueStore, StoreError, UndoKind};
use shared_types::ids::proposal_key;
use shared_types::{ApprovePayload, ExecPayload, ProposePayload, TrxAction};

use super::{OpContext, Projector};
use crate::errors::ProjectionError;

const ACTION_SET_PARAMS: &str = "setparams";
const ACTION_SET_RESTORER: &str = "setrestorer";

fn allowed_scopes(action: &str) -> Option<&'static [&'static str]> {
    match action {
        ACTION_SET_PARAMS => Some(&["publish", "ctrl", "referral", "emit", "vesting"]),
        ACTION_SET_RESTORER => Some(&["charge"]),
        _ => None,
    }
}

impl<K: KeyValueStore> Projector<K> {
    pub fn handle_proposal_create(
        &self,
        payload: ProposePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        if payload.trx.actions.len() != 1 {
            return Ok(());
        }
        let action = &payload.trx.actions[0];

        let Some((community_id, scope)) = action.account.split_once('.') else {
            return Ok(());
        };
        let Some(scopes) = allowed_scopes(&action.name) else {
            return Ok(());
        };
        if !scopes.contains(&scope) {
            return Ok(());
        }

        let doc = ProposalDocument {
            community_id: community_id.to_string(),
            proposer: payload.proposer.clone(),
            proposal_id: payload.proposal_name.clone(),
            code: action.account.clone(),
            action: action.name.clone(),
            block_time: ctx.block_time,
            expiration: shared_types::time::parse_chain_time(&payload.trx.expiration),
            changes: extract_changes(action),
            approves: payload
                .requested
                .iter()
                .map(|level| ProposalApprove {
                    user_id: level.actor.clone(),
                    permission: level.permission.clone(),
                    is_signed: false,
                })
                .collect(),
            is_executed: false,
            executer: None,
            executed_block_time: None,
        };

        let id = proposal_key(&payload.proposer, &payload.proposal_name);
        let doc = serde_json::to_value(&doc).map_err(StoreError::serialization)?;
        self.store().insert_document(PROPOSALS, &id, &doc)?;
        self.fork()
            .register_change(UndoKind::Create, PROPOSALS, &id, Value::Null)?;
        Ok(())
    }

    pub fn handle_proposal_approve(
        &self,
        payload: ApprovePayload,
        _ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = proposal_key(&payload.proposer, &payload.proposal_name);

        let Some(proposal) = self.store().get_document(PROPOSALS, &id)? else {
            warn!(proposal = %id, "approve for unknown proposal, skip");
            return Ok(());
        };

        let mut approves = proposal["approves"].clone();
        let Some(slot) = approves
            .as_array_mut()
            .and_then(|items| {
                items
                    .iter_mut()
                    .find(|item| item["user_id"].as_str() == Some(payload.level.actor.as_str()))
            })
        else {
            warn!(
                proposal = %id,
                actor = %payload.level.actor,
                "approve by actor not in requested list, skip"
            );
            return Ok(());
        };
        slot["is_signed"] = Value::Bool(true);

        let previous = self
            .store()
            .find_one_and_patch(PROPOSALS, &id, &json!({"$set": {"approves": approves}}))?;

        if previous.is_some() {
            self.fork().register_change(
                UndoKind::Update,
                PROPOSALS,
                &id,
                json!({"$set": {"approves": proposal["approves"]}}),
            )?;
        }
        Ok(())
    }

    pub fn handle_proposal_exec(
        &self,
        payload: ExecPayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = proposal_key(&payload.proposer, &payload.proposal_name);

        let update = json!({"$set": {
            "executer": payload.executer,
            "is_executed": true,
            "executed_block_time": ctx.block_time,
        }});

        // Unknown proposal: it was never a community-settings proposal,
        // nothing to project.
        let Some(previous) = self.store().find_one_and_patch(PROPOSALS, &id, &update)? else {
            return Ok(());
        };

        self.fork().register_change(
            UndoKind::Update,
            PROPOSALS,
            &id,
            json!({"$set": {
                "executer": previous["executer"],
                "is_executed": previous["is_executed"],
                "executed_block_time": previous["executed_block_time"],
            }}),
        )?;
        Ok(())
    }
}

fn extract_changes(action: &TrxAction) -> Vec<ProposalChange> {
    if action.name == ACTION_SET_PARAMS {
        // `setparams` data carries `[[structure_name, values], ...]` pairs.
        if let Some(params) = action.data.get("params").and_then(Value::as_array) {
            return params
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    Some(ProposalChange {
                        structure_name: pair.first()?.as_str()?.to_string(),
                        values: pair.get(1).cloned().unwrap_or(Value::Null),
                    })
                })
                .collect();
        }
        return Vec::new();
    }

    vec![ProposalChange {
        structure_name: action.name.clone(),
        values: action.data.clone(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_changes_setparams_pairs() {
        let action = TrxAction {
            account: "gls.publish".to_string(),
            name: "setparams".to_string(),
            data: json!({"params": [["st_max_vote_changes", {"value": 5}], ["st_cashout_window", {"window": 120}]]}),
        };
        let changes = extract_changes(&action);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].structure_name, "st_max_vote_changes");
        assert_eq!(changes[1].values, json!({"window": 120}));
    }

    #[test]
    fn test_extract_changes_other_action_wraps_data() {
        let action = TrxAction {
            account: "gls.charge".to_string(),
            name: "setrestorer".to_string(),
            data: json!({"func": "t"}),
        };
        let changes = extract_changes(&action);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].structure_name, "setrestorer");
    }
}
