//! Approval policy mutations and queries
//!
//! Every successful mutation invalidates the cached policy list of the
//! workspace it names; failures invalidate nothing. Lists are read through
//! the cache, so the read after an invalidation goes to the server.

use crate::api::PolicyApi;
use crate::cache::{PolicyCache, PolicyCacheKey};
use crate::error::PolicyResult;
use crate::types::{
    ApprovalPolicy, CreatePolicyRequest, DeletePolicyRequest, UpdatePolicyRequest, WorkspaceId,
};
use std::sync::Arc;

/// Client for the approval policy collection
#[derive(Clone)]
pub struct ApprovalPolicyService {
    api: Arc<dyn PolicyApi>,
    cache: PolicyCache,
}

impl ApprovalPolicyService {
    #[inline]
    #[must_use]
    pub fn new(api: Arc<dyn PolicyApi>, cache: PolicyCache) -> Self {
        Self { api, cache }
    }

    /// Create a policy
    ///
    /// # Errors
    /// Transport failures propagate; the cache is left untouched.
    pub async fn create(&self, request: CreatePolicyRequest) -> PolicyResult<serde_json::Value> {
        let payload = self.api.create_policy(&request).await?;
        tracing::info!(workspace_id = %request.workspace_id, environment = %request.environment, "approval policy created");
        self.invalidate(&request.workspace_id).await;
        Ok(payload)
    }

    /// Update a policy; the cache key is the workspace supplied with the request
    ///
    /// # Errors
    /// Transport failures propagate; the cache is left untouched.
    pub async fn update(&self, request: UpdatePolicyRequest) -> PolicyResult<serde_json::Value> {
        let payload = self.api.update_policy(&request).await?;
        tracing::info!(policy_id = %request.id, workspace_id = %request.workspace_id, "approval policy updated");
        self.invalidate(&request.workspace_id).await;
        Ok(payload)
    }

    /// Delete a policy
    ///
    /// # Errors
    /// Transport failures propagate; the cache is left untouched.
    pub async fn delete(&self, request: DeletePolicyRequest) -> PolicyResult<serde_json::Value> {
        let payload = self.api.delete_policy(&request.id).await?;
        tracing::info!(policy_id = %request.id, workspace_id = %request.workspace_id, "approval policy deleted");
        self.invalidate(&request.workspace_id).await;
        Ok(payload)
    }

    /// Policies of a workspace, fetched on a cache miss
    pub async fn list(&self, workspace_id: &WorkspaceId) -> PolicyResult<Arc<Vec<ApprovalPolicy>>> {
        self.cache
            .get_or_fetch(PolicyCacheKey::approval_policies(workspace_id), || {
                let api = Arc::clone(&self.api);
                let id = workspace_id.clone();
                async move {
                    tracing::debug!(workspace_id = %id, "fetching approval policies");
                    api.list_policies(&id).await.map_err(Into::into)
                }
            })
            .await
    }

    async fn invalidate(&self, workspace_id: &WorkspaceId) {
        self.cache
            .invalidate(PolicyCacheKey::approval_policies(workspace_id))
            .await;
    }

    /// Underlying cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &PolicyCache {
        &self.cache
    }
}

impl std::fmt::Debug for ApprovalPolicyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalPolicyService")
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}
