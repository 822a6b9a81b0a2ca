//! Post and comment projection.

use serde_json::{json, Value};
use tracing::{debug, warn};

use lt_01_content_store::documents::collections::{COMMENTS, POSTS};
use lt_01_content_store::documents::{
    CommentDocument, CommentOrdering, CommentParent, ContentMeta, ContentSection, PostDocument,
    PostStats, VoteSet,
};
use lt_01_content_store::{KeyValueStore, StoreError, UndoKind};
use shared_types::{ContentId, DeleteMessagePayload, MessagePayload};

use crate::errors::ProjectionError;
use crate::extract;
use crate::ordering::{self, ParentContext};

use super::{OpContext, Projector};

/// Where a comment's parent turned out to live.
enum ParentResolution {
    Post(ContentId),
    Comment {
        parent_id: ContentId,
        context: ParentContext,
    },
    /// Neither a known post nor a known comment. The referenced content
    /// may legitimately lie outside the observed window.
    Unresolved,
}

impl<K: KeyValueStore> Projector<K> {
    pub fn handle_message_create(
        &self,
        payload: MessagePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        match payload.parent_content_id() {
            Some(parent_id) => self.handle_comment_create(payload, parent_id, ctx),
            None => self.handle_post_create(payload, ctx),
        }
    }

    fn handle_post_create(
        &self,
        payload: MessagePayload,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let content_id = payload.content_id();
        let id = content_id.as_key();

        let doc = PostDocument {
            content_id,
            community_id: ctx.community_id.clone(),
            content: self.extract_content(&payload.title, &payload.body, &payload.json_metadata),
            tags: payload.tags.clone(),
            votes: VoteSet::default(),
            stats: PostStats::default(),
            meta: ContentMeta {
                time: ctx.block_time,
            },
        };

        self.store()
            .insert_document(POSTS, &id, &to_doc_value(&doc)?)?;
        self.fork()
            .register_change(UndoKind::Create, POSTS, &id, Value::Null)?;

        self.change_profile_counter(&payload.author, "stats.posts_count", 1)?;
        Ok(())
    }

    fn handle_comment_create(
        &self,
        payload: MessagePayload,
        parent_id: ContentId,
        ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let content_id = payload.content_id();
        let id = content_id.as_key();

        let (parent, order) = match self.resolve_parent(&parent_id)? {
            ParentResolution::Post(post_id) => {
                let seq = self.bump_post_counters(&post_id)?;
                (
                    CommentParent {
                        post: Some(post_id),
                        comment: None,
                    },
                    Some(ordering::child_of_post(seq)),
                )
            }
            ParentResolution::Comment { parent_id, context } => {
                let seq = self.bump_post_counters(&context.post)?;
                let key = ordering::child_of_comment(
                    &context,
                    seq,
                    self.config().max_nested_index_depth,
                );
                (
                    CommentParent {
                        post: Some(context.post.clone()),
                        comment: Some(parent_id),
                    },
                    Some(key),
                )
            }
            ParentResolution::Unresolved => {
                warn!(
                    comment = %content_id,
                    parent = %parent_id,
                    "no parent post/comment for comment, storing unlinked"
                );
                (CommentParent::default(), None)
            }
        };

        let doc = CommentDocument {
            content_id,
            community_id: ctx.community_id.clone(),
            content: self.extract_content(&payload.title, &payload.body, &payload.json_metadata),
            votes: VoteSet::default(),
            parent,
            ordering: match order {
                Some(key) => CommentOrdering {
                    by_time: Some(key.by_time),
                    nested_level: Some(key.nested_level),
                },
                None => CommentOrdering::default(),
            },
            meta: ContentMeta {
                time: ctx.block_time,
            },
        };

        self.store()
            .insert_document(COMMENTS, &id, &to_doc_value(&doc)?)?;
        self.fork()
            .register_change(UndoKind::Create, COMMENTS, &id, Value::Null)?;

        self.change_profile_counter(&payload.author, "stats.comments_count", 1)?;
        Ok(())
    }

    pub fn handle_message_update(
        &self,
        payload: MessagePayload,
        _ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let id = payload.content_id().as_key();
        let content = self.extract_content(&payload.title, &payload.body, &payload.json_metadata);
        let update = json!({"$set": {"content": to_doc_value(&content)?}});

        for collection in [POSTS, COMMENTS] {
            if let Some(previous) = self.store().find_one_and_patch(collection, &id, &update)? {
                self.fork().register_change(
                    UndoKind::Update,
                    collection,
                    &id,
                    json!({"$set": {"content": previous["content"]}}),
                )?;
                return Ok(());
            }
        }

        warn!(content = %id, "update for unknown content, skip");
        Ok(())
    }

    pub fn handle_message_delete(
        &self,
        payload: DeleteMessagePayload,
        _ctx: &OpContext,
    ) -> Result<(), ProjectionError> {
        let content_id = payload.content_id();
        let id = content_id.as_key();

        if let Some(previous) = self.store().find_one_and_delete(POSTS, &id)? {
            self.fork()
                .register_change(UndoKind::Remove, POSTS, &id, previous)?;
            self.change_profile_counter(&payload.author, "stats.posts_count", -1)?;
            return Ok(());
        }

        if let Some(previous) = self.store().find_one_and_delete(COMMENTS, &id)? {
            self.fork()
                .register_change(UndoKind::Remove, COMMENTS, &id, previous.clone())?;

            // The ordering counter is deliberately left alone; keys are
            // never reused within a post.
            if let Some(post_id) = parent_post_of(&previous) {
                let post_key = post_id.as_key();
                if let Some(prev_post) = self.store().find_one_and_patch(
                    POSTS,
                    &post_key,
                    &json!({"$inc": {"stats.comments_count": -1}}),
                )? {
                    self.fork().register_change(
                        UndoKind::Update,
                        POSTS,
                        &post_key,
                        json!({"$set": {
                            "stats.comments_count": prev_post["stats"]["comments_count"]
                        }}),
                    )?;
                }
            }

            self.change_profile_counter(&payload.author, "stats.comments_count", -1)?;
            return Ok(());
        }

        warn!(content = %id, "delete for unknown content, skip");
        Ok(())
    }

    /// Increment the post's ordering counter and comment count in one
    /// patch, register the inverse, and return the fresh counter value.
    fn bump_post_counters(&self, post_id: &ContentId) -> Result<u64, ProjectionError> {
        let post_key = post_id.as_key();
        let previous = self
            .store()
            .find_one_and_patch(
                POSTS,
                &post_key,
                &json!({"$inc": {
                    "stats.comment_order_seq": 1,
                    "stats.comments_count": 1,
                }}),
            )?
            .ok_or_else(|| {
                // The parent resolved a moment ago; the live path has a
                // single writer, so a vanished post is store corruption.
                StoreError::invalid_patch(format!("post {} vanished mid-block", post_key))
            })?;

        let prev_seq = previous["stats"]["comment_order_seq"].as_u64().unwrap_or(0);
        let prev_count = previous["stats"]["comments_count"].as_u64().unwrap_or(0);

        self.fork().register_change(
            UndoKind::Update,
            POSTS,
            &post_key,
            json!({"$set": {
                "stats.comment_order_seq": prev_seq,
                "stats.comments_count": prev_count,
            }}),
        )?;

        Ok(prev_seq + 1)
    }

    fn resolve_parent(&self, parent_id: &ContentId) -> Result<ParentResolution, ProjectionError> {
        let parent_key = parent_id.as_key();

        if self.store().get_document(POSTS, &parent_key)?.is_some() {
            return Ok(ParentResolution::Post(parent_id.clone()));
        }

        if let Some(comment) = self.store().get_document(COMMENTS, &parent_key)? {
            let post = comment["parent"]["post"].clone();
            let post: Option<ContentId> = serde_json::from_value(post).unwrap_or(None);
            let order_key = comment["ordering"]["by_time"].as_str().map(str::to_string);

            if let (Some(post), Some(order_key)) = (post, order_key) {
                let nested_level = comment["ordering"]["nested_level"]
                    .as_u64()
                    .map(|level| level as u32)
                    .unwrap_or_else(|| ordering::level_from_key(&order_key));
                return Ok(ParentResolution::Comment {
                    parent_id: parent_id.clone(),
                    context: ParentContext {
                        post,
                        nested_level,
                        order_key,
                    },
                });
            }
            // The parent is itself an unlinked orphan; its children
            // cannot be ordered either.
            debug!(parent = %parent_id, "parent comment is unlinked");
        }

        Ok(ParentResolution::Unresolved)
    }

    fn extract_content(&self, title: &str, body: &str, json_metadata: &str) -> ContentSection {
        extract::extract_content(title, body, json_metadata, self.config().preview_length)
    }
}

fn parent_post_of(comment: &Value) -> Option<ContentId> {
    serde_json::from_value(comment["parent"]["post"].clone()).unwrap_or(None)
}

fn to_doc_value<T: serde::Serialize>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(StoreError::serialization)
}
