//! Client configuration
//!
//! Values come from an optional TOML file, then environment overrides:
//! `UPORCH_API_URL`, `UPORCH_TOKEN`, `UPORCH_TIMEOUT_SECS`,
//! `UPORCH_CREDENTIAL_KEY` and `SHOW_UPGRADE_PROJECT`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the upgrade feature toggle
pub const SHOW_UPGRADE_PROJECT_ENV: &str = "SHOW_UPGRADE_PROJECT";

/// Default key under which the private key is stored
pub const DEFAULT_CREDENTIAL_KEY: &str = "PRIVATE_KEY";

/// Global feature toggles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Show the project upgrade control
    #[serde(default)]
    pub show_upgrade_project: bool,
}

impl FeatureFlags {
    /// Parse a toggle value; only the exact string `true` enables it
    #[inline]
    #[must_use]
    pub fn parse_toggle(raw: &str) -> bool {
        raw == "true"
    }

    /// With upgrade control visibility
    #[inline]
    #[must_use]
    pub fn with_show_upgrade_project(mut self, enabled: bool) -> Self {
        self.show_upgrade_project = enabled;
        self
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API, without trailing slash
    pub api_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Key of the private key in credential storage
    pub credential_key: String,
    /// Feature toggles
    pub features: FeatureFlags,
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API base URL
    #[inline]
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// With bearer token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// With per-request timeout in seconds
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// With feature toggles
    #[inline]
    #[must_use]
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Load from a TOML file, apply process environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("UPORCH_API_URL") {
            self.api_url = url;
        }
        if let Some(token) = lookup("UPORCH_TOKEN") {
            self.token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(raw) = lookup("UPORCH_TIMEOUT_SECS") {
            self.timeout_secs = raw
                .parse()
                .map_err(|_| ConfigError::invalid("timeout_secs", format!("not a number: '{raw}'")))?;
        }
        if let Some(key) = lookup("UPORCH_CREDENTIAL_KEY") {
            self.credential_key = key;
        }
        if let Some(raw) = lookup(SHOW_UPGRADE_PROJECT_ENV) {
            self.features.show_upgrade_project = FeatureFlags::parse_toggle(&raw);
        }
        Ok(self)
    }

    /// Check invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "api_url",
                format!("expected an http(s) URL, got '{}'", self.api_url),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs", "must be greater than zero"));
        }
        if self.credential_key.trim().is_empty() {
            return Err(ConfigError::invalid("credential_key", "must not be empty"));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            token: None,
            timeout_secs: 30,
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
            features: FeatureFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = ClientConfig::new();
        assert!(config.validate().is_ok());
        assert!(!config.features.show_upgrade_project);
        assert_eq!(config.credential_key, "PRIVATE_KEY");
    }

    #[test]
    fn toggle_requires_exact_true() {
        assert!(FeatureFlags::parse_toggle("true"));
        assert!(!FeatureFlags::parse_toggle("TRUE"));
        assert!(!FeatureFlags::parse_toggle("1"));
        assert!(!FeatureFlags::parse_toggle(""));
    }

    #[test]
    fn env_overrides_apply() {
        let config = ClientConfig::new()
            .apply_env_with(env(&[
                ("UPORCH_API_URL", "https://vault.example.com/"),
                ("UPORCH_TOKEN", "tok"),
                ("UPORCH_TIMEOUT_SECS", "5"),
                ("SHOW_UPGRADE_PROJECT", "true"),
            ]))
            .unwrap();

        assert_eq!(config.base_url(), "https://vault.example.com");
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.timeout_secs, 5);
        assert!(config.features.show_upgrade_project);
    }

    #[test]
    fn bad_timeout_override_is_rejected() {
        let result = ClientConfig::new().apply_env_with(env(&[("UPORCH_TIMEOUT_SECS", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "timeout_secs", .. })
        ));
    }

    #[test]
    fn non_http_url_fails_validation() {
        let config = ClientConfig::new().with_api_url("ftp://example.com");
        assert!(config.validate().is_err());
    }
}
