//! Configuration loading and parsing.
//!
//! Defines the client config schema (server session + request limits) and
//! resolves defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "jellify.toml";
const DEFAULT_CACHE_DIR: &str = ".cache";
const DEFAULT_DEVICE_NAME: &str = "Jellify-RS";
const CLIENT_NAME: &str = "jellify-rs";

/// Top-level client configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Jellyfin server, e.g. https://jellyfin.local:8096
    pub server_url: String,
    /// Access token issued by the server for this device.
    pub access_token: String,
    /// Id of the authenticated user.
    pub user_id: String,
    /// Id of the music library (collection folder) to browse.
    pub library_id: String,
    /// Device name reported to the server.
    pub device_name: Option<String>,
    /// Stable device id (defaults to `<device name>-<hostname>`).
    pub device_id: Option<String>,
    /// Directory for persisted JSON blobs (defaults to `.cache`).
    pub cache_dir: Option<PathBuf>,
    /// Page sizes and batch caps.
    #[serde(default)]
    pub limits: Limits,
}

/// Request limits used by paginated queries and library shuffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Items per page for library tabs.
    pub library: usize,
    /// Items per page for home rows (frequently played, etc.).
    pub home: usize,
    /// Maximum number of tracks fetched for a library shuffle.
    pub library_shuffle: usize,
    /// Pages kept in memory per library query.
    pub library_max_pages: usize,
    /// Pages kept in memory per home query.
    pub home_max_pages: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            library: 100,
            home: 50,
            library_shuffle: 100,
            library_max_pages: 4,
            home_max_pages: 2,
        }
    }
}

impl Config {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        if config.server_url.trim().is_empty() {
            anyhow::bail!("server_url must not be empty");
        }
        if config.limits.library == 0 || config.limits.library_shuffle == 0 {
            anyhow::bail!("limits.library and limits.library_shuffle must be positive");
        }
        Ok(config)
    }

    pub fn server_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    pub fn device_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME)
    }

    /// Resolve the device id, generating one from the hostname when unset.
    pub fn device_id(&self) -> String {
        if let Some(id) = &self.device_id {
            return id.clone();
        }
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}-{}", self.device_name(), hostname)
    }

    pub fn client_name(&self) -> &'static str {
        CLIENT_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_default_limits() {
        let config = Config::parse(
            r#"
            server_url = "http://jellyfin.local:8096/"
            access_token = "token"
            user_id = "user"
            library_id = "music"
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url(), "http://jellyfin.local:8096");
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.cache_dir(), PathBuf::from(".cache"));
        assert_eq!(config.device_name(), "Jellify-RS");
    }

    #[test]
    fn partial_limits_table_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            server_url = "http://host"
            access_token = "t"
            user_id = "u"
            library_id = "l"
            device_id = "fixed"

            [limits]
            library_shuffle = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.library_shuffle, 250);
        assert_eq!(config.limits.library, 100);
        assert_eq!(config.device_id(), "fixed");
    }

    #[test]
    fn rejects_zero_page_size() {
        let result = Config::parse(
            r#"
            server_url = "http://host"
            access_token = "t"
            user_id = "u"
            library_id = "l"

            [limits]
            library = 0
            "#,
        );
        assert!(result.is_err());
    }
}
