//! # Bounded Parent Cache
//!
//! Maps a comment's canonical key to its ordering context. Hits resolve
//! from memory; a miss triggers a single fetch from the persistent store,
//! and concurrent misses for the same key are coalesced into one
//! in-flight fetch. Capacity is bounded with LRU eviction - evicted
//! parents are simply refetched, since every imported comment has been
//! bulk-written by the time its children can reference it from outside
//! the cache window.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::warn;

use lattice_telemetry::metrics::GENESIS_CACHE_FETCHES;
use lt_01_content_store::documents::collections::COMMENTS;
use lt_01_content_store::{ContentStore, KeyValueStore, StoreError};
use lt_02_projection::ordering;
use shared_types::ContentId;

/// Ordering context of an already-imported comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedParent {
    pub content_id: ContentId,
    /// Canonical key of the post owning the thread.
    pub post_key: String,
    pub order_key: String,
    pub nested_level: u32,
}

/// Where cache misses are resolved from.
#[async_trait]
pub trait ParentSource: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Option<CachedParent>, StoreError>;
}

/// Production source: the comments collection of the persistent store.
pub struct StoreParentSource<K: KeyValueStore> {
    store: Arc<ContentStore<K>>,
}

impl<K: KeyValueStore> StoreParentSource<K> {
    pub fn new(store: Arc<ContentStore<K>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<K: KeyValueStore> ParentSource for StoreParentSource<K> {
    async fn fetch(&self, key: &str) -> Result<Option<CachedParent>, StoreError> {
        let Some(doc) = self.store.get_document(COMMENTS, key)? else {
            return Ok(None);
        };

        let content_id = match ContentId::from_key(key) {
            Some(content_id) => content_id,
            None => return Ok(None),
        };
        let post: Option<ContentId> =
            serde_json::from_value(doc["parent"]["post"].clone()).unwrap_or(None);
        let order_key = doc["ordering"]["by_time"].as_str().map(str::to_string);

        // An unlinked orphan has no ordering context to offer.
        let (Some(post), Some(order_key)) = (post, order_key) else {
            return Ok(None);
        };

        let nested_level = doc["ordering"]["nested_level"]
            .as_u64()
            .map(|level| level as u32)
            .unwrap_or_else(|| ordering::level_from_key(&order_key));

        Ok(Some(CachedParent {
            content_id,
            post_key: post.as_key(),
            order_key,
            nested_level,
        }))
    }
}

pub struct ParentCache<S: ParentSource> {
    source: S,
    cache: Mutex<LruCache<String, CachedParent>>,
    inflight: tokio::sync::Mutex<HashMap<String, Arc<OnceCell<Option<CachedParent>>>>>,
}

impl<S: ParentSource> ParentCache<S> {
    pub fn new(source: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
            inflight: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Look up a parent's ordering context. A store failure during the
    /// fetch degrades to "unresolved" - the comment is stored unlinked
    /// and the integrity warning is on the caller.
    pub async fn get(&self, key: &str) -> Option<CachedParent> {
        if let Some(hit) = self.cache.lock().get(key).cloned() {
            return Some(hit);
        }

        let cell = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let value = cell
            .get_or_init(|| async {
                GENESIS_CACHE_FETCHES.inc();
                match self.source.fetch(key).await {
                    Ok(found) => found,
                    Err(err) => {
                        warn!(key, %err, "parent fetch failed, treating as unresolved");
                        None
                    }
                }
            })
            .await
            .clone();

        // First waiter through moves the result into the LRU window and
        // retires the in-flight slot.
        let mut inflight = self.inflight.lock().await;
        if inflight.remove(key).is_some() {
            if let Some(parent) = &value {
                self.cache.lock().put(key.to_string(), parent.clone());
            }
        }

        value
    }

    /// Seed the cache with a freshly imported comment.
    pub fn add(&self, key: String, parent: CachedParent) {
        self.cache.lock().put(key, parent);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct CountingSource {
        fetches: AtomicU64,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                fetches: AtomicU64::new(0),
            }
        }

        fn parent(key: &str) -> CachedParent {
            CachedParent {
                content_id: ContentId::from_key(key).unwrap(),
                post_key: "alice/p".to_string(),
                order_key: "1".to_string(),
                nested_level: 1,
            }
        }
    }

    #[async_trait]
    impl ParentSource for CountingSource {
        async fn fetch(&self, key: &str) -> Result<Option<CachedParent>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            // Hold the fetch open so concurrent misses pile up on it.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if key.starts_with("missing") {
                Ok(None)
            } else {
                Ok(Some(Self::parent(key)))
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce_into_one_fetch() {
        let cache = Arc::new(ParentCache::new(CountingSource::new(), 16));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get("bob/c1").await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        assert_eq!(cache.source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hit_skips_the_source() {
        let cache = ParentCache::new(CountingSource::new(), 16);
        cache.add("bob/c1".to_string(), CountingSource::parent("bob/c1"));

        assert!(cache.get("bob/c1").await.is_some());
        assert_eq!(cache.source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_eviction_refetches() {
        let cache = ParentCache::new(CountingSource::new(), 1);
        cache.add("bob/c1".to_string(), CountingSource::parent("bob/c1"));
        cache.add("bob/c2".to_string(), CountingSource::parent("bob/c2"));

        // c1 was evicted by c2; the next get goes to the source again.
        assert!(cache.get("bob/c1").await.is_some());
        assert_eq!(cache.source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolved_parent_is_none_and_not_cached() {
        let cache = ParentCache::new(CountingSource::new(), 16);
        assert!(cache.get("missing/x").await.is_none());
        assert!(cache.is_empty());
    }
}
