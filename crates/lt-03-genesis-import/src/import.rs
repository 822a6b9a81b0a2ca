//! # Genesis Content Controller
//!
//! Consumes the typed genesis stream. Accounts become profiles, messages
//! become posts and comments (ordered by the same assigner as the live
//! path), pins become subscriptions, witness states become leaders.
//!
//! The post index is owned by the run: historical records interleave
//! posts and comments in arbitrary relative order, so every comment's
//! parent chain resolves through the index first and then the bounded
//! parent cache, which falls back to the persistent store. After the
//! message pass, a bounded task pool reconciles per-post comment counts
//! and per-user totals.

use std::collections::HashMap;

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use lattice_telemetry::metrics::{
    GENESIS_ORPHANED_COMMENTS, GENESIS_RECONCILIATIONS, GENESIS_RECORDS,
};
use lt_01_content_store::documents::collections::{
    COMMENTS, LEADERS, POSTS, PROFILES, SUBSCRIPTIONS,
};
use lt_01_content_store::documents::{
    CommentDocument, CommentOrdering, CommentParent, ContentMeta, LeaderDocument, PostDocument,
    PostStats, ProfileDocument, ProfileRegistration, SubscriptionDocument, VoteSet,
};
use lt_01_content_store::{ContentStore, KeyValueStore, StoreError};
use lt_02_projection::{extract, ordering};
use shared_types::ids::leader_key;
use shared_types::time::{parse_chain_time, EPOCH_SENTINEL};
use shared_types::{
    ContentId, GenesisAccount, GenesisMessage, GenesisPin, GenesisRecord, GenesisRecordKind,
    GenesisWitnessState,
};

use crate::bulk::BulkWriter;
use crate::cache::{CachedParent, ParentCache, StoreParentSource};
use crate::config::ImportConfig;
use crate::errors::ImportError;
use crate::pool::{PoolReport, TaskPool};

/// Run-scoped ordering state of one imported post.
struct PostInfo {
    content_id: ContentId,
    comment_order_seq: u64,
    comments_count: u64,
}

#[derive(Default)]
struct UserCounters {
    posts_count: u64,
    comments_count: u64,
}

/// Totals of a completed run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub profiles: u64,
    pub posts: u64,
    pub comments: u64,
    pub leaders: u64,
    pub subscriptions: u64,
    pub orphaned_comments: u64,
    pub post_reconciliation: PoolReport,
    pub user_reconciliation: PoolReport,
}

pub struct GenesisImporter<K: KeyValueStore + 'static> {
    store: Arc<ContentStore<K>>,
    config: ImportConfig,

    posts: HashMap<String, PostInfo>,
    users: HashMap<String, UserCounters>,
    cache: ParentCache<StoreParentSource<K>>,

    profiles_bulk: BulkWriter<K>,
    posts_bulk: BulkWriter<K>,
    comments_bulk: BulkWriter<K>,
    leaders_bulk: BulkWriter<K>,
    subscriptions_bulk: BulkWriter<K>,

    orphaned_comments: u64,
    post_reconciliation: PoolReport,
    user_reconciliation: PoolReport,
}

impl<K: KeyValueStore + 'static> GenesisImporter<K> {
    pub fn new(store: Arc<ContentStore<K>>, config: ImportConfig) -> Self {
        let cache = ParentCache::new(
            StoreParentSource::new(Arc::clone(&store)),
            config.cache_capacity,
        );
        let batch = config.batch_size;
        Self {
            profiles_bulk: BulkWriter::new(Arc::clone(&store), PROFILES, batch),
            posts_bulk: BulkWriter::new(Arc::clone(&store), POSTS, batch),
            comments_bulk: BulkWriter::new(Arc::clone(&store), COMMENTS, batch),
            leaders_bulk: BulkWriter::new(Arc::clone(&store), LEADERS, batch),
            subscriptions_bulk: BulkWriter::new(Arc::clone(&store), SUBSCRIPTIONS, batch),
            posts: HashMap::new(),
            users: HashMap::new(),
            cache,
            orphaned_comments: 0,
            post_reconciliation: PoolReport::default(),
            user_reconciliation: PoolReport::default(),
            store,
            config,
        }
    }

    pub async fn handle(&mut self, record: GenesisRecord) -> Result<(), ImportError> {
        GENESIS_RECORDS
            .with_label_values(&[record.kind().as_str()])
            .inc();

        match record {
            GenesisRecord::Account(account) => self.handle_account(account),
            GenesisRecord::Message(message) => self.handle_message(message).await,
            GenesisRecord::Pin(pin) => self.handle_pin(pin),
            GenesisRecord::WitnessState(state) => self.handle_witness_state(state),
        }
    }

    /// The stream terminates each record kind explicitly; that is when
    /// the kind's writers flush their tails.
    pub async fn end_of_type(&mut self, kind: GenesisRecordKind) -> Result<(), ImportError> {
        match kind {
            GenesisRecordKind::Account => {
                self.profiles_bulk.finish()?;
            }
            GenesisRecordKind::Message => self.finish_messages().await?,
            GenesisRecordKind::Pin => {
                self.subscriptions_bulk.finish()?;
            }
            GenesisRecordKind::WitnessState => {
                self.leaders_bulk.finish()?;
            }
        }
        Ok(())
    }

    /// Seal the run and return its totals.
    pub fn finish(self) -> ImportReport {
        ImportReport {
            profiles: self.profiles_bulk.saved(),
            posts: self.posts_bulk.saved(),
            comments: self.comments_bulk.saved(),
            leaders: self.leaders_bulk.saved(),
            subscriptions: self.subscriptions_bulk.saved(),
            orphaned_comments: self.orphaned_comments,
            post_reconciliation: self.post_reconciliation,
            user_reconciliation: self.user_reconciliation,
        }
    }

    /// Entries buffered across all writers, for progress monitoring.
    pub fn pending_entries(&self) -> usize {
        self.profiles_bulk.queue_len()
            + self.posts_bulk.queue_len()
            + self.comments_bulk.queue_len()
            + self.leaders_bulk.queue_len()
            + self.subscriptions_bulk.queue_len()
    }

    fn handle_account(&mut self, account: GenesisAccount) -> Result<(), ImportError> {
        let registration_time = if account.created == EPOCH_SENTINEL {
            None
        } else {
            parse_chain_time(&account.created)
        };

        let mut usernames = serde_json::Map::new();
        usernames.insert(
            self.config.default_community.clone(),
            Value::from(account.name),
        );

        let doc = ProfileDocument {
            user_id: account.owner.clone(),
            usernames,
            registration: ProfileRegistration {
                time: registration_time,
            },
            ..ProfileDocument::default()
        };

        self.profiles_bulk
            .add_entry(account.owner, to_doc_value(&doc)?)
    }

    async fn handle_message(&mut self, message: GenesisMessage) -> Result<(), ImportError> {
        if message.parent_author.is_empty() {
            self.process_post(message)
        } else {
            self.process_comment(message).await
        }
    }

    fn process_post(&mut self, message: GenesisMessage) -> Result<(), ImportError> {
        let content_id = ContentId::new(message.author.clone(), message.permlink.clone());
        let key = content_id.as_key();

        let doc = PostDocument {
            content_id: content_id.clone(),
            community_id: self.config.default_community.clone(),
            content: extract::extract_content(
                &message.title,
                &message.body,
                "",
                self.config.preview_length,
            ),
            tags: message.tags,
            votes: VoteSet::from_weighted(
                message.votes.into_iter().map(|vote| (vote.voter, vote.weight)),
            ),
            stats: PostStats::default(),
            meta: ContentMeta {
                time: parse_chain_time(&message.created)
                    .unwrap_or(chrono::DateTime::UNIX_EPOCH),
            },
        };

        self.posts.insert(
            key.clone(),
            PostInfo {
                content_id,
                comment_order_seq: 0,
                comments_count: 0,
            },
        );
        self.users.entry(message.author).or_default().posts_count += 1;
        self.posts_bulk.add_entry(key, to_doc_value(&doc)?)
    }

    async fn process_comment(&mut self, message: GenesisMessage) -> Result<(), ImportError> {
        let content_id = ContentId::new(message.author.clone(), message.permlink.clone());
        let key = content_id.as_key();
        let parent_key =
            ContentId::new(message.parent_author.clone(), message.parent_permlink.clone())
                .as_key();

        let (parent, comment_ordering) = self
            .resolve_comment_parent(&content_id, &key, &parent_key)
            .await;

        let doc = CommentDocument {
            content_id,
            community_id: self.config.default_community.clone(),
            content: extract::extract_content(
                &message.title,
                &message.body,
                "",
                self.config.preview_length,
            ),
            votes: VoteSet::from_weighted(
                message.votes.into_iter().map(|vote| (vote.voter, vote.weight)),
            ),
            parent,
            ordering: comment_ordering,
            meta: ContentMeta {
                time: parse_chain_time(&message.created)
                    .unwrap_or(chrono::DateTime::UNIX_EPOCH),
            },
        };

        self.users.entry(message.author).or_default().comments_count += 1;
        self.comments_bulk.add_entry(key, to_doc_value(&doc)?)
    }

    /// Resolve a comment's parent: the run's post index first, then the
    /// cache (with store fallback). An unresolvable parent leaves the
    /// comment unlinked - referenced content may legitimately lie outside
    /// the imported window.
    async fn resolve_comment_parent(
        &mut self,
        content_id: &ContentId,
        key: &str,
        parent_key: &str,
    ) -> (CommentParent, CommentOrdering) {
        if let Some(info) = self.posts.get_mut(parent_key) {
            info.comment_order_seq += 1;
            info.comments_count += 1;
            let order = ordering::child_of_post(info.comment_order_seq);
            let parent = CommentParent {
                post: Some(info.content_id.clone()),
                comment: None,
            };
            let cached = CachedParent {
                content_id: content_id.clone(),
                post_key: parent_key.to_string(),
                order_key: order.by_time.clone(),
                nested_level: order.nested_level,
            };
            self.cache.add(key.to_string(), cached);
            return (
                parent,
                CommentOrdering {
                    by_time: Some(order.by_time),
                    nested_level: Some(order.nested_level),
                },
            );
        }

        if let Some(cached_parent) = self.cache.get(parent_key).await {
            if let Some(info) = self.posts.get_mut(&cached_parent.post_key) {
                info.comment_order_seq += 1;
                info.comments_count += 1;
                let context = ordering::ParentContext {
                    post: info.content_id.clone(),
                    nested_level: cached_parent.nested_level,
                    order_key: cached_parent.order_key.clone(),
                };
                let order = ordering::child_of_comment(
                    &context,
                    info.comment_order_seq,
                    self.config.max_nested_index_depth,
                );
                let parent = CommentParent {
                    post: Some(info.content_id.clone()),
                    comment: Some(cached_parent.content_id.clone()),
                };
                let cached = CachedParent {
                    content_id: content_id.clone(),
                    post_key: cached_parent.post_key.clone(),
                    order_key: order.by_time.clone(),
                    nested_level: order.nested_level,
                };
                self.cache.add(key.to_string(), cached);
                return (
                    parent,
                    CommentOrdering {
                        by_time: Some(order.by_time),
                        nested_level: Some(order.nested_level),
                    },
                );
            }
            warn!(
                comment = %content_id,
                post = %cached_parent.post_key,
                "parent comment's post is not in the run index"
            );
        } else {
            warn!(
                comment = %content_id,
                parent = %parent_key,
                "no parent post/comment in cache"
            );
        }

        GENESIS_ORPHANED_COMMENTS.inc();
        self.orphaned_comments += 1;
        (CommentParent::default(), CommentOrdering::default())
    }

    fn handle_pin(&mut self, pin: GenesisPin) -> Result<(), ImportError> {
        let id = format!("{}/{}", pin.pinner, pin.pinning);
        let doc = SubscriptionDocument {
            pinner: pin.pinner,
            pinning: pin.pinning,
        };
        self.subscriptions_bulk.add_entry(id, to_doc_value(&doc)?)
    }

    fn handle_witness_state(&mut self, state: GenesisWitnessState) -> Result<(), ImportError> {
        let id = leader_key(&self.config.default_community, &state.witness);
        let doc = LeaderDocument {
            community_id: self.config.default_community.clone(),
            user_id: state.witness,
            url: String::new(),
            rating: state.weight,
            votes: Vec::new(),
            active: state.active,
        };
        self.leaders_bulk.add_entry(id, to_doc_value(&doc)?)
    }

    async fn finish_messages(&mut self) -> Result<(), ImportError> {
        info!("finishing message bulk writers");
        self.posts_bulk.finish()?;
        self.comments_bulk.finish()?;

        info!("updating post and user counters");
        self.post_reconciliation = self.reconcile_posts().await;
        self.user_reconciliation = self.reconcile_users().await;

        info!(
            posts = self.post_reconciliation.completed,
            post_failures = self.post_reconciliation.failed,
            users = self.user_reconciliation.completed,
            user_failures = self.user_reconciliation.failed,
            "genesis message processing finished"
        );
        Ok(())
    }

    async fn reconcile_posts(&mut self) -> PoolReport {
        struct PostFixup {
            key: String,
            comments_count: u64,
            comment_order_seq: u64,
        }

        let tasks: Vec<PostFixup> = self
            .posts
            .values()
            .map(|info| PostFixup {
                key: info.content_id.as_key(),
                comments_count: info.comments_count,
                comment_order_seq: info.comment_order_seq,
            })
            .collect();

        let pool = TaskPool::new(self.config.pool_concurrency);
        let store = Arc::clone(&self.store);
        pool.run_all(tasks, move |task| {
            let store = Arc::clone(&store);
            async move {
                let update = serde_json::json!({"$set": {
                    "stats.comments_count": task.comments_count,
                    "stats.comment_order_seq": task.comment_order_seq,
                }});
                let result = store.find_one_and_patch(POSTS, &task.key, &update);
                match result {
                    Ok(Some(_)) => {
                        GENESIS_RECONCILIATIONS
                            .with_label_values(&["post", "ok"])
                            .inc();
                        Ok(())
                    }
                    Ok(None) => {
                        GENESIS_RECONCILIATIONS
                            .with_label_values(&["post", "failed"])
                            .inc();
                        Err(ImportError::Reconciliation(format!(
                            "post {} missing at reconciliation",
                            task.key
                        )))
                    }
                    Err(err) => {
                        GENESIS_RECONCILIATIONS
                            .with_label_values(&["post", "failed"])
                            .inc();
                        Err(ImportError::Reconciliation(format!(
                            "updating post {} failed: {}",
                            task.key, err
                        )))
                    }
                }
            }
        })
        .await
    }

    async fn reconcile_users(&mut self) -> PoolReport {
        struct UserFixup {
            user_id: String,
            posts_count: u64,
            comments_count: u64,
        }

        let tasks: Vec<UserFixup> = self
            .users
            .iter()
            .map(|(user_id, counters)| UserFixup {
                user_id: user_id.clone(),
                posts_count: counters.posts_count,
                comments_count: counters.comments_count,
            })
            .collect();

        let pool = TaskPool::new(self.config.pool_concurrency);
        let store = Arc::clone(&self.store);
        pool.run_all(tasks, move |task| {
            let store = Arc::clone(&store);
            async move {
                let update = serde_json::json!({"$set": {
                    "stats.posts_count": task.posts_count,
                    "stats.comments_count": task.comments_count,
                }});
                match store.find_one_and_patch(PROFILES, &task.user_id, &update) {
                    Ok(Some(_)) => {
                        GENESIS_RECONCILIATIONS
                            .with_label_values(&["user", "ok"])
                            .inc();
                        Ok(())
                    }
                    Ok(None) => {
                        // Content by users outside the imported account
                        // set; a miss, not a failure.
                        GENESIS_RECONCILIATIONS
                            .with_label_values(&["user", "miss"])
                            .inc();
                        Ok(())
                    }
                    Err(err) => {
                        GENESIS_RECONCILIATIONS
                            .with_label_values(&["user", "failed"])
                            .inc();
                        Err(ImportError::Reconciliation(format!(
                            "updating profile {} failed: {}",
                            task.user_id, err
                        )))
                    }
                }
            }
        })
        .await
    }
}

fn to_doc_value<T: serde::Serialize>(doc: &T) -> Result<Value, ImportError> {
    serde_json::to_value(doc)
        .map_err(StoreError::serialization)
        .map_err(ImportError::from)
}
