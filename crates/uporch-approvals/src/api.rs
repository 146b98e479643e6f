//! Remote approval policy endpoints

use crate::types::{
    ApprovalPolicy, CreatePolicyRequest, PolicyId, UpdatePolicyRequest, WorkspaceId,
};
use async_trait::async_trait;
use uporch_core::TransportError;

/// Transport for the `/api/v1/secret-approvals` collection
///
/// Mutations return the server payload untouched.
#[async_trait]
pub trait PolicyApi: Send + Sync {
    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<serde_json::Value, TransportError>;

    async fn update_policy(
        &self,
        request: &UpdatePolicyRequest,
    ) -> Result<serde_json::Value, TransportError>;

    async fn delete_policy(&self, id: &PolicyId) -> Result<serde_json::Value, TransportError>;

    async fn list_policies(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<ApprovalPolicy>, TransportError>;
}

#[cfg(test)]
mockall::mock! {
    pub PolicyApi {}

    #[async_trait]
    impl PolicyApi for PolicyApi {
        async fn create_policy(
            &self,
            request: &CreatePolicyRequest,
        ) -> Result<serde_json::Value, TransportError>;
        async fn update_policy(
            &self,
            request: &UpdatePolicyRequest,
        ) -> Result<serde_json::Value, TransportError>;
        async fn delete_policy(&self, id: &PolicyId) -> Result<serde_json::Value, TransportError>;
        async fn list_policies(
            &self,
            workspace_id: &WorkspaceId,
        ) -> Result<Vec<ApprovalPolicy>, TransportError>;
    }
}
