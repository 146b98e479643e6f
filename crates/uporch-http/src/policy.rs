//! Secret approval policy endpoints

use crate::client::HttpClient;
use reqwest::Method;
use uporch_approvals::{
    ApprovalPolicy, CreatePolicyRequest, PolicyApi, PolicyId, PolicyList, UpdatePolicyRequest,
    WorkspaceId,
};
use uporch_core::TransportError;

const COLLECTION: [&str; 3] = ["api", "v1", "secret-approvals"];

impl HttpClient {
    fn policy_url(&self, id: &PolicyId) -> reqwest::Url {
        let [api, version, collection] = COLLECTION;
        self.endpoint(&[api, version, collection, id.as_str()])
    }
}

#[async_trait::async_trait]
impl PolicyApi for HttpClient {
    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let url = self.endpoint(&COLLECTION);
        self.send_json(self.request(Method::POST, url).json(request))
            .await
    }

    async fn update_policy(
        &self,
        request: &UpdatePolicyRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let url = self.policy_url(&request.id);
        self.send_json(self.request(Method::PATCH, url).json(request))
            .await
    }

    async fn delete_policy(&self, id: &PolicyId) -> Result<serde_json::Value, TransportError> {
        let url = self.policy_url(id);
        self.send_json(self.request(Method::DELETE, url)).await
    }

    async fn list_policies(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<ApprovalPolicy>, TransportError> {
        let url = self.endpoint(&COLLECTION);
        let list: PolicyList = self
            .send_json(
                self.request(Method::GET, url)
                    .query(&[("workspaceId", workspace_id.as_str())]),
            )
            .await?;
        Ok(list.approvals)
    }
}
