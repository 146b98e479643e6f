//! Stock implementations of the credential, notification and refresh ports

use crate::ports::{CredentialProvider, Notification, NotificationKind, Notifier, SessionRefresher};
use crate::types::PrivateKey;
use std::path::PathBuf;

/// Reads the private key from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    key: String,
}

impl EnvCredentials {
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl CredentialProvider for EnvCredentials {
    fn credential(&self) -> Option<PrivateKey> {
        std::env::var(&self.key)
            .ok()
            .filter(|value| !value.is_empty())
            .map(PrivateKey::new)
    }
}

/// Reads the private key from `<dir>/<key>` on every call
#[derive(Debug, Clone)]
pub struct FileCredentials {
    dir: PathBuf,
    key: String,
}

impl FileCredentials {
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(&self.key)
    }
}

impl CredentialProvider for FileCredentials {
    fn credential(&self) -> Option<PrivateKey> {
        match std::fs::read_to_string(self.path()) {
            Ok(raw) => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| PrivateKey::new(trimmed))
            }
            Err(err) => {
                tracing::debug!(path = %self.path().display(), error = %err, "credential file unreadable");
                None
            }
        }
    }
}

/// Fixed credential, or none
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<PrivateKey>);

impl StaticCredentials {
    #[inline]
    #[must_use]
    pub fn new(key: Option<PrivateKey>) -> Self {
        Self(key)
    }
}

impl CredentialProvider for StaticCredentials {
    fn credential(&self) -> Option<PrivateKey> {
        self.0.clone()
    }
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => tracing::error!(text = %notification.text, "notification"),
            NotificationKind::Info | NotificationKind::Success => {
                tracing::info!(text = %notification.text, "notification")
            }
        }
    }
}

/// Session refresher backed by a closure
pub struct FnRefresher<F>(F);

impl<F> FnRefresher<F>
where
    F: Fn() + Send + Sync,
{
    #[inline]
    #[must_use]
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> SessionRefresher for FnRefresher<F>
where
    F: Fn() + Send + Sync,
{
    fn refresh(&self) {
        (self.0)()
    }
}

impl<F> std::fmt::Debug for FnRefresher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnRefresher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn file_credentials_trim_and_reject_empty() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileCredentials::new(dir.path(), "PRIVATE_KEY");
        assert!(provider.credential().is_none());

        std::fs::write(dir.path().join("PRIVATE_KEY"), "  \n").unwrap();
        assert!(provider.credential().is_none());

        std::fs::write(dir.path().join("PRIVATE_KEY"), "abc123\n").unwrap();
        assert_eq!(provider.credential(), Some(PrivateKey::new("abc123")));
    }

    #[test]
    fn static_credentials_return_clone() {
        let provider = StaticCredentials::new(Some(PrivateKey::new("k")));
        assert_eq!(provider.credential(), Some(PrivateKey::new("k")));
        assert!(StaticCredentials::default().credential().is_none());
    }

    #[test]
    fn fn_refresher_invokes_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let refresher = FnRefresher::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        refresher.refresh();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
