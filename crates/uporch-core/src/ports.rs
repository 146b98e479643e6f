//! Ports to the collaborators the controller depends on
//!
//! The controller never touches HTTP, storage, UI notifications or page
//! navigation directly; it only sees these traits.

use crate::error::TransportError;
use crate::types::{PrivateKey, ProjectId, UpgradeRequest, UpgradeStatusResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote upgrade job endpoints
#[async_trait]
pub trait UpgradeApi: Send + Sync {
    /// Fetch the current upgrade job status of a project
    async fn upgrade_status(
        &self,
        project_id: &ProjectId,
    ) -> Result<UpgradeStatusResponse, TransportError>;

    /// Submit the upgrade job; success only means the job was accepted
    async fn start_upgrade(&self, request: &UpgradeRequest) -> Result<(), TransportError>;
}

/// Read-only access to the locally stored private key
pub trait CredentialProvider: Send + Sync {
    /// Current credential, if one is stored
    fn credential(&self) -> Option<PrivateKey>;
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// User-visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    #[inline]
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            text: text.into(),
        }
    }
}

/// Displays notifications (toasts, stderr, ...)
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Refreshes the whole client session after a completed upgrade
///
/// Replaces a full page reload; invoked at most once per controller.
pub trait SessionRefresher: Send + Sync {
    fn refresh(&self);
}

#[cfg(test)]
mockall::mock! {
    pub UpgradeApi {}

    #[async_trait]
    impl UpgradeApi for UpgradeApi {
        async fn upgrade_status(
            &self,
            project_id: &ProjectId,
        ) -> Result<UpgradeStatusResponse, TransportError>;
        async fn start_upgrade(&self, request: &UpgradeRequest) -> Result<(), TransportError>;
    }
}

#[cfg(test)]
mockall::mock! {
    pub Credentials {}

    impl CredentialProvider for Credentials {
        fn credential(&self) -> Option<PrivateKey>;
    }
}

#[cfg(test)]
mockall::mock! {
    pub Notifier {}

    impl Notifier for Notifier {
        fn notify(&self, notification: Notification);
    }
}

#[cfg(test)]
mockall::mock! {
    pub Refresher {}

    impl SessionRefresher for Refresher {
        fn refresh(&self);
    }
}
