//! Core types for the upgrade orchestrator
//!
//! Defines the values the controller works with:
//! - Project identity, version and the caller's role
//! - Upgrade job status as reported by the server
//! - The upgrade request and the credential it carries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Server-assigned project identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Wrap a project identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifies one mounted controller instance in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MountId(pub Ulid);

impl MountId {
    /// Generate new mount ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Project storage version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectVersion {
    /// Legacy version, eligible for upgrade
    V1,
    /// Current version
    V2,
}

impl ProjectVersion {
    /// Whether this is the legacy version the upgrade job migrates from
    #[inline]
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self, ProjectVersion::V1)
    }

    /// Wire representation
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectVersion::V1 => "v1",
            ProjectVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(ProjectVersion::V1),
            "v2" => Ok(ProjectVersion::V2),
            other => Err(format!("unknown project version: '{other}'")),
        }
    }
}

/// Caller's role within a project, as resolved by the permission subsystem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Member,
    Viewer,
    NoAccess,
    /// Project-defined role, identified by slug
    Custom(String),
}

impl Role {
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Member => f.write_str("member"),
            Role::Viewer => f.write_str("viewer"),
            Role::NoAccess => f.write_str("no-access"),
            Role::Custom(slug) => f.write_str(slug),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("role must not be empty".to_string()),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "viewer" => Ok(Role::Viewer),
            "no-access" => Ok(Role::NoAccess),
            slug => Ok(Role::Custom(slug.to_string())),
        }
    }
}

/// The project the controller is mounted for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub version: ProjectVersion,
}

impl Project {
    /// Create new project
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ProjectId>, version: ProjectVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Non-null upgrade job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeJobStatus {
    InProgress,
    Failed,
}

/// Status endpoint response; `None` means no job running (or just finished)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpgradeStatusResponse {
    #[serde(default)]
    pub status: Option<UpgradeJobStatus>,
}

impl UpgradeStatusResponse {
    #[inline]
    #[must_use]
    pub fn new(status: Option<UpgradeJobStatus>) -> Self {
        Self { status }
    }
}

/// Private key used to re-encrypt project secrets during the upgrade
///
/// Debug output is redacted. The value is never held longer than one submit.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Body of the upgrade command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub project_id: ProjectId,
    pub private_key: PrivateKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mount_id_generation() {
        let id1 = MountId::new();
        let id2 = MountId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn version_parsing() {
        assert_eq!("v1".parse::<ProjectVersion>().unwrap(), ProjectVersion::V1);
        assert_eq!("v2".parse::<ProjectVersion>().unwrap(), ProjectVersion::V2);
        assert!("v3".parse::<ProjectVersion>().is_err());
        assert!(ProjectVersion::V1.is_legacy());
        assert!(!ProjectVersion::V2.is_legacy());
    }

    #[test]
    fn role_parsing_keeps_custom_slugs() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("no-access".parse::<Role>().unwrap(), Role::NoAccess);
        assert_eq!(
            "auditor".parse::<Role>().unwrap(),
            Role::Custom("auditor".to_string())
        );
        assert!("  ".parse::<Role>().is_err());
    }

    #[test]
    fn status_response_wire_format() {
        let running: UpgradeStatusResponse =
            serde_json::from_str(r#"{"status":"IN_PROGRESS"}"#).unwrap();
        assert_eq!(running.status, Some(UpgradeJobStatus::InProgress));

        let failed: UpgradeStatusResponse = serde_json::from_str(r#"{"status":"FAILED"}"#).unwrap();
        assert_eq!(failed.status, Some(UpgradeJobStatus::Failed));

        let idle: UpgradeStatusResponse = serde_json::from_str(r#"{"status":null}"#).unwrap();
        assert_eq!(idle.status, None);

        let missing: UpgradeStatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.status, None);
    }

    #[test]
    fn upgrade_request_body_is_camel_case() {
        let request = UpgradeRequest {
            project_id: ProjectId::new("proj-1"),
            private_key: PrivateKey::new("secret"),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "projectId": "proj-1", "privateKey": "secret" })
        );
    }

    #[test]
    fn private_key_debug_is_redacted() {
        let key = PrivateKey::new("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
