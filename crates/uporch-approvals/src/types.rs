//! Approval policy request and response types
//!
//! Request bodies mirror the `/api/v1/secret-approvals` endpoints; fields the
//! server does not expect in a body (`id`, `workspaceId` on update) are kept
//! on the request for routing and cache keys only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workspace (tenant) identifier policies are grouped under
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Server-assigned policy identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolicyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Approval policy as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPolicy {
    pub id: PolicyId,
    #[serde(default)]
    pub workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub secret_path: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub approvals: u32,
    #[serde(default)]
    pub approvers: Vec<String>,
}

/// List endpoint envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyList {
    #[serde(default)]
    pub approvals: Vec<ApprovalPolicy>,
}

/// `POST /api/v1/secret-approvals`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyRequest {
    pub environment: String,
    pub workspace_id: WorkspaceId,
    pub approvals: u32,
    pub approver_user_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `PATCH /api/v1/secret-approvals/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicyRequest {
    #[serde(skip)]
    pub id: PolicyId,
    #[serde(skip)]
    pub workspace_id: WorkspaceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approvals: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_user_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UpdatePolicyRequest {
    /// Update with no field changes yet
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<PolicyId>, workspace_id: impl Into<WorkspaceId>) -> Self {
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            approvals: None,
            approver_user_ids: None,
            secret_path: None,
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_approvals(mut self, approvals: u32) -> Self {
        self.approvals = Some(approvals);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_approvers(mut self, approver_user_ids: Vec<String>) -> Self {
        self.approver_user_ids = Some(approver_user_ids);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_secret_path(mut self, secret_path: impl Into<String>) -> Self {
        self.secret_path = Some(secret_path.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// `DELETE /api/v1/secret-approvals/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePolicyRequest {
    pub id: PolicyId,
    pub workspace_id: WorkspaceId,
}

impl DeletePolicyRequest {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<PolicyId>, workspace_id: impl Into<WorkspaceId>) -> Self {
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn create_body_shape() {
        let request = CreatePolicyRequest {
            environment: "prod".into(),
            workspace_id: "ws-1".into(),
            approvals: 2,
            approver_user_ids: vec!["u1".into(), "u2".into()],
            secret_path: Some("/app".into()),
            name: Some("prod gate".into()),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "environment": "prod",
                "workspaceId": "ws-1",
                "approvals": 2,
                "approverUserIds": ["u1", "u2"],
                "secretPath": "/app",
                "name": "prod gate"
            })
        );
    }

    #[test]
    fn update_body_omits_routing_fields_and_unset_values() {
        let request = UpdatePolicyRequest::new("pol-1", "ws-1").with_approvals(3);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "approvals": 3 })
        );
    }

    #[test]
    fn policy_list_tolerates_sparse_entries() {
        let list: PolicyList =
            serde_json::from_value(json!({ "approvals": [{ "id": "pol-1" }] })).unwrap();
        assert_eq!(list.approvals.len(), 1);
        assert_eq!(list.approvals[0].id, PolicyId::new("pol-1"));
        assert_eq!(list.approvals[0].approvals, 0);
    }
}
