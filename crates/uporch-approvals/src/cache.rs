//! Workspace-keyed approval policy cache using moka
//!
//! Entries are only ever filled from a server fetch and only ever removed by
//! invalidation; nothing patches a cached list in place. Each key carries a
//! generation bumped on invalidation, and an entry filled by a fetch that
//! started before the latest invalidation is never served.

use crate::error::PolicyError;
use crate::types::{ApprovalPolicy, WorkspaceId};
use moka::future::Cache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Cached query key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolicyCacheKey {
    /// Policies of one workspace
    ApprovalPolicies(WorkspaceId),
}

impl PolicyCacheKey {
    #[inline]
    #[must_use]
    pub fn approval_policies(workspace_id: &WorkspaceId) -> Self {
        Self::ApprovalPolicies(workspace_id.clone())
    }
}

/// Emitted once per invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub key: PolicyCacheKey,
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

#[derive(Debug, Clone)]
struct CachedPolicies {
    generation: u64,
    policies: Arc<Vec<ApprovalPolicy>>,
}

/// Approval policy cache
#[derive(Debug, Clone)]
pub struct PolicyCache {
    inner: Cache<PolicyCacheKey, CachedPolicies>,
    generations: Arc<Mutex<HashMap<PolicyCacheKey, u64>>>,
    events: broadcast::Sender<InvalidationEvent>,
}

impl PolicyCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self::from_cache(Cache::new(max_capacity))
    }

    /// Create cache whose entries also expire after `ttl`
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self::from_cache(
            Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        )
    }

    fn from_cache(inner: Cache<PolicyCacheKey, CachedPolicies>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner,
            generations: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    fn generation(&self, key: &PolicyCacheKey) -> u64 {
        self.generations.lock().get(key).copied().unwrap_or_default()
    }

    /// Cached policies, if present and not invalidated
    pub async fn get(&self, key: &PolicyCacheKey) -> Option<Arc<Vec<ApprovalPolicy>>> {
        let cached = self.inner.get(key).await?;
        (cached.generation == self.generation(key)).then_some(cached.policies)
    }

    /// Get cached policies or fetch them
    ///
    /// Concurrent misses on the same key share one fetch. A failed fetch
    /// caches nothing. When the key is invalidated while a fetch is in
    /// flight, its result is evicted and `fetch` runs again.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: PolicyCacheKey,
        fetch: F,
    ) -> Result<Arc<Vec<ApprovalPolicy>>, PolicyError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<ApprovalPolicy>, PolicyError>>,
    {
        loop {
            let generation = self.generation(&key);
            let cached = self
                .inner
                .try_get_with(key.clone(), async {
                    fetch().await.map(|policies| CachedPolicies {
                        generation,
                        policies: Arc::new(policies),
                    })
                })
                .await
                .map_err(|err: Arc<PolicyError>| (*err).clone())?;

            if cached.generation == self.generation(&key) {
                return Ok(cached.policies);
            }
            tracing::debug!(?key, "policy list fetched before invalidation; fetching again");
            self.inner.invalidate(&key).await;
        }
    }

    /// Mark an entry stale and notify subscribers
    pub async fn invalidate(&self, key: PolicyCacheKey) {
        *self.generations.lock().entry(key.clone()).or_default() += 1;
        self.inner.invalidate(&key).await;
        tracing::debug!(?key, "policy cache entry invalidated");
        // No subscribers is fine.
        let _ = self.events.send(InvalidationEvent { key });
    }

    /// Subscribe to invalidation events
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.events.subscribe()
    }

    /// Check if a fresh entry exists
    #[inline]
    pub async fn contains(&self, key: &PolicyCacheKey) -> bool {
        self.get(key).await.is_some()
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for PolicyCache {
    /// Create cache with default capacity (1,000 workspaces)
    fn default() -> Self {
        Self::new(1_000)
    }
}
