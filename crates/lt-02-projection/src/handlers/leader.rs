//! Leader (witness) projection.

use serde_json::{json, Value};
use tracing::warn;

use lt_01_content_store::documents::collections::LEADERS;
use lt_01_content_store::documents::LeaderDocument;
use lt_01_content_store::{KeyValueStore, StoreError, UndoKind};
use shared_types::ids::leader_key;
use shared_types::{WitnessPayload, WitnessStatePayload, WitnessVotePayload};

use super::{OpContext, Projector};
use crate::errors::ProjectionError;

impl<K: KeyValueStore> Projector<K> {
    pub fn handle_leader_register(
        &self,
        payload: WitnessPayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = leader_key(&ctx.community_id, &payload.witness);

        let mut update = json!({"$set": {"active": true}});
        if let Some(url) = &payload.url {
            update["$set"]["url"] = Value::from(url.clone());
        }

        match self.store().find_one_and_patch(LEADERS, &id, &update)? {
            Some(previous) => {
                self.fork().register_change(
                    UndoKind::Update,
                    LEADERS,
                    &id,
                    json!({"$set": {
                        "active": previous["active"],
                        "url": previous["url"],
                    }}),
                )?;
            }
            None => {
                let doc = LeaderDocument {
                    community_id: ctx.community_id.clone(),
                    user_id: payload.witness.clone(),
                    url: payload.url.clone().unwrap_or_default(),
                    rating: 0,
                    votes: Vec::new(),
                    active: true,
                };
                let doc = serde_json::to_value(&doc).map_err(StoreError::serialization)?;
                self.store().insert_document(LEADERS, &id, &doc)?;
                self.fork()
                    .register_change(UndoKind::Create, LEADERS, &id, Value::Null)?;
            }
        }

        self.recompute_leader_in(&payload.witness)
    }

    pub fn handle_leader_unregister(
        &self,
        payload: WitnessStatePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = leader_key(&ctx.community_id, &payload.witness);

        let Some(previous) = self.store().find_one_and_delete(LEADERS, &id)? else {
            return Ok(());
        };
        self.fork()
            .register_change(UndoKind::Remove, LEADERS, &id, previous)?;

        self.recompute_leader_in(&payload.witness)
    }

    pub fn handle_leader_activate(
        &self,
        payload: WitnessStatePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        self.set_leader_active_state(&payload.witness, &ctx.community_id, true)?;
        self.recompute_leader_in(&payload.witness)
    }

    pub fn handle_leader_deactivate(
        &self,
        payload: WitnessStatePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        self.set_leader_active_state(&payload.witness, &ctx.community_id, false)?;
        self.recompute_leader_in(&payload.witness)
    }

    pub fn handle_leader_vote(
        &self,
        payload: WitnessVotePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = leader_key(&ctx.community_id, &payload.witness);

        let mut update = json!({"$addToSet": {"votes": payload.voter}});
        if let Some(rating) = payload.rating() {
            update["$set"] = json!({"rating": rating});
        }

        let Some(previous) = self.store().find_one_and_patch(LEADERS, &id, &update)? else {
            warn!(witness = %payload.witness, "vote for unknown leader, skip");
            return Ok(());
        };

        // Snapshot inverse: $pull would over-remove a voter who was
        // already in the set before this block.
        self.fork().register_change(
            UndoKind::Update,
            LEADERS,
            &id,
            json!({"$set": {
                "votes": previous["votes"],
                "rating": previous["rating"],
            }}),
        )?;
        Ok(())
    }

    pub fn handle_leader_unvote(
        &self,
        payload: WitnessVotePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = leader_key(&ctx.community_id, &payload.witness);

        let mut update = json!({"$pull": {"votes": payload.voter}});
        if let Some(rating) = payload.rating() {
            update["$set"] = json!({"rating": rating});
        }

        let Some(previous) = self.store().find_one_and_patch(LEADERS, &id, &update)? else {
            warn!(witness = %payload.witness, "unvote for unknown leader, skip");
            return Ok(());
        };

        self.fork().register_change(
            UndoKind::Update,
            LEADERS,
            &id,
            json!({"$set": {
                "votes": previous["votes"],
                "rating": previous["rating"],
            }}),
        )?;
        Ok(())
    }

    fn set_leader_active_state(
        &self,
        user_id: &str,
        community_id: &str,
        active: bool,
    ) -> Result<(), ProjectionError> {
        let id = leader_key(community_id, user_id);
        let previous = self
            .store()
            .find_one_and_patch(LEADERS, &id, &json!({"$set": {"active": active}}))?;

        if let Some(previous) = previous {
            self.fork().register_change(
                UndoKind::Update,
                LEADERS,
                &id,
                json!({"$set": {"active": previous["active"]}}),
            )?;
        }
        Ok(())
    }
}
