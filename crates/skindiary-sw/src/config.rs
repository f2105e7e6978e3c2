//! Agent configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skindiary_common::{CommonError, RetryConfig};
use skindiary_net::UrlPattern;
use url::Url;

use crate::manifest::AssetManifest;
use crate::{Result, ServiceWorkerError};

/// Name of the current cache bucket. Bumping the suffix is what retires old buckets.
pub const CACHE_NAME: &str = "skindiary-v1";

/// Root-relative path of the offline fallback document.
pub const OFFLINE_PAGE: &str = "/static/offline.html";

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Origin the app is served from
    pub origin: Url,

    /// Current cache bucket name
    pub cache_name: String,

    /// Assets primed on install
    pub manifest: AssetManifest,

    /// Document served when a navigation fails
    pub offline_page: String,

    /// Requests that are never intercepted
    pub exclusions: ExclusionConfig,

    /// Cross-origin hosts whose requests are still handled
    pub allowed_origins: Vec<UrlPattern>,

    /// Enable navigation preload on activation
    pub navigation_preload: bool,

    /// Upper bound on a single network attempt
    pub network_timeout: Duration,

    /// Platform retry policy for failed installs
    pub install_retry: RetryConfig,

    /// Push notification presentation
    pub notifications: NotificationConfig,
}

/// Versioned list of patterns that bypass the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    pub version: u32,
    pub patterns: Vec<UrlPattern>,
}

impl ExclusionConfig {
    /// Check if a URL is excluded.
    pub fn excludes(&self, url: &Url) -> bool {
        self.patterns.iter().any(|p| p.matches(url))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Fixed notification title
    pub title: String,

    /// Body used when the push payload is empty
    pub default_body: String,

    pub icon: String,

    pub badge: String,

    /// Page opened on click
    pub click_url: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:5000/").expect("static origin is valid"),
            cache_name: CACHE_NAME.to_string(),
            manifest: AssetManifest::skindiary(),
            offline_page: OFFLINE_PAGE.to_string(),
            exclusions: ExclusionConfig::default(),
            allowed_origins: vec![UrlPattern::host_prefix("cdn.")],
            navigation_preload: true,
            network_timeout: Duration::from_secs(30),
            install_retry: RetryConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            version: 1,
            patterns: vec![
                // OAuth login route and the identity provider itself
                UrlPattern::contains("google_login"),
                UrlPattern::contains("accounts.google.com"),
            ],
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "Skin Diary".to_string(),
            default_body: "New update from Skin Diary".to_string(),
            icon: "/static/icons/icon-192x192.png".to_string(),
            badge: "/static/icons/icon-72x72.png".to_string(),
            click_url: "/".to_string(),
        }
    }
}

impl AgentConfig {
    /// Default configuration for an app served from `origin`.
    pub fn for_origin(origin: Url) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CommonError::config_with_source(format!("cannot read {}", path.display()), e)
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            CommonError::config_with_source(format!("cannot parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.cache_name.trim().is_empty() {
            return Err(ServiceWorkerError::ConfigError(
                "cache_name must not be empty".to_string(),
            ));
        }
        if !self.manifest.contains(&self.offline_page) {
            return Err(ServiceWorkerError::ConfigError(format!(
                "offline page {} is not in the asset manifest",
                self.offline_page
            )));
        }
        if self.network_timeout.is_zero() {
            return Err(ServiceWorkerError::ConfigError(
                "network_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute URL of the offline fallback document.
    pub fn offline_url(&self) -> Result<Url> {
        Ok(self.origin.join(&self.offline_page)?)
    }

    /// Absolute URL opened on notification click.
    pub fn click_url(&self) -> Result<Url> {
        Ok(self.origin.join(&self.notifications.click_url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert_eq!(config.cache_name, "skindiary-v1");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.offline_url().unwrap().as_str(),
            "http://localhost:5000/static/offline.html"
        );
    }

    #[test]
    fn test_default_exclusions() {
        let exclusions = ExclusionConfig::default();
        assert_eq!(exclusions.version, 1);
        assert!(exclusions.excludes(&Url::parse("http://localhost:5000/google_login").unwrap()));
        assert!(exclusions.excludes(&Url::parse("https://accounts.google.com/o/oauth2/auth").unwrap()));
        assert!(!exclusions.excludes(&Url::parse("http://localhost:5000/history").unwrap()));
    }

    #[test]
    fn test_identity_provider_anywhere_in_url_is_excluded() {
        let exclusions = ExclusionConfig::default();
        assert!(exclusions.excludes(
            &Url::parse("http://localhost:5000/oauth/start?next=https://accounts.google.com/o/oauth2")
                .unwrap()
        ));
    }

    #[test]
    fn test_offline_page_must_be_in_manifest() {
        let config = AgentConfig {
            manifest: AssetManifest::new(["/"]),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServiceWorkerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"origin":"https://skindiary.example/","cache_name":"skindiary-v2"}"#,
        )
        .unwrap();

        assert_eq!(config.cache_name, "skindiary-v2");
        assert_eq!(config.origin.as_str(), "https://skindiary.example/");
        assert_eq!(config.notifications.title, "Skin Diary");
        assert_eq!(config.manifest, AssetManifest::skindiary());
    }

    #[test]
    fn test_from_file_missing_is_config_error() {
        let err = AgentConfig::from_file("/nonexistent/agent.json").unwrap_err();
        assert!(matches!(
            err,
            ServiceWorkerError::Common(CommonError::Config { .. })
        ));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("skindiary-agent-{}.json", std::process::id()));
        let config = AgentConfig::for_origin(Url::parse("https://skindiary.example/").unwrap());
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AgentConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.origin, config.origin);
        assert_eq!(loaded.exclusions, config.exclusions);
        assert_eq!(loaded.network_timeout, config.network_timeout);
    }
}
