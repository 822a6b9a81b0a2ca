//! Profile side-effects of content and leader projection.

use serde_json::{json, Value};
use tracing::debug;

use lt_01_content_store::documents::collections::{LEADERS, PROFILES};
use lt_01_content_store::domain::patch::get_path;
use lt_01_content_store::{KeyValueStore, UndoKind};

use super::Projector;
use crate::errors::ProjectionError;

impl<K: KeyValueStore> Projector<K> {
    /// Adjust a counter on the author's profile. Profiles are seeded by
    /// the genesis import; content from users outside the imported set is
    /// simply not counted.
    pub(super) fn change_profile_counter(
        &self,
        user_id: &str,
        path: &str,
        delta: i64,
    ) -> Result<(), ProjectionError> {
        let previous = self.store().find_one_and_patch(
            PROFILES,
            user_id,
            &json!({"$inc": {path: delta}}),
        )?;

        match previous {
            Some(previous) => {
                let prev_value = get_path(&previous, path).cloned().unwrap_or(Value::Null);
                self.fork().register_change(
                    UndoKind::Update,
                    PROFILES,
                    user_id,
                    json!({"$set": {path: prev_value}}),
                )?;
            }
            None => debug!(user_id, "no profile for counter update"),
        }
        Ok(())
    }

    /// Recompute the list of communities where `user_id` is an active
    /// leader, after any leader-state change.
    pub(super) fn recompute_leader_in(&self, user_id: &str) -> Result<(), ProjectionError> {
        let mut communities: Vec<String> = self
            .store()
            .scan_collection(LEADERS)?
            .into_iter()
            .filter(|(_, doc)| {
                doc["user_id"].as_str() == Some(user_id) && doc["active"].as_bool() == Some(true)
            })
            .filter_map(|(_, doc)| doc["community_id"].as_str().map(str::to_string))
            .collect();
        communities.sort();

        let previous = self.store().find_one_and_patch(
            PROFILES,
            user_id,
            &json!({"$set": {"leader_in": communities}}),
        )?;

        if let Some(previous) = previous {
            self.fork().register_change(
                UndoKind::Update,
                PROFILES,
                user_id,
                json!({"$set": {"leader_in": previous["leader_in"]}}),
            )?;
        }
        Ok(())
    }
}
