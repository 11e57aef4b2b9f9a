//! Sync configuration: dataset coordinates, remote endpoint, site settings.
//!
//! Persisted as TOML (by default `$XDG_CONFIG_HOME/wordlift-sync/config.toml`).
//! A `SyncConfig` is passed explicitly to every component that needs the
//! dataset base URI or the remote endpoint; nothing reads it from globals.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(wl::config::read),
        help("Create one with `wl-sync init` or pass `--config <path>`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(wl::config::parse),
        help("Check the TOML syntax in the config file. Parser said: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(wl::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(wl::config::invalid))]
    Invalid { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Dataset, endpoint and site settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Account identifier on the triple-store service.
    pub user_id: String,
    /// Dataset identifier.
    pub dataset_id: String,
    /// Application key, sent as the `key` query parameter.
    #[serde(default)]
    pub application_key: String,
    /// Root under which dataset URIs are minted.
    #[serde(default = "default_data_uri")]
    pub data_uri: String,
    /// Root of the SPARQL Update API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Public site root, used for permalinks.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Language tag for localized literals.
    #[serde(default = "default_site_language")]
    pub site_language: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
    /// Suffix probes before a user URI falls back to a random suffix.
    #[serde(default = "default_max_uri_attempts")]
    pub max_uri_attempts: u32,
}

fn default_data_uri() -> String {
    "http://data.redlink.io".into()
}
fn default_api_url() -> String {
    "https://api.redlink.io".into()
}
fn default_api_version() -> String {
    "1.0-ALPHA".into()
}
fn default_site_url() -> String {
    "http://localhost".into()
}
fn default_site_language() -> String {
    "en".into()
}
fn default_timeout_secs() -> u64 {
    45
}
fn default_max_redirects() -> u32 {
    5
}
fn default_max_uri_attempts() -> u32 {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            dataset_id: String::new(),
            application_key: String::new(),
            data_uri: default_data_uri(),
            api_url: default_api_url(),
            api_version: default_api_version(),
            site_url: default_site_url(),
            site_language: default_site_language(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_uri_attempts: default_max_uri_attempts(),
        }
    }
}

impl SyncConfig {
    /// Config for the given account and dataset (other fields default).
    pub fn new(user_id: &str, dataset_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            dataset_id: dataset_id.to_string(),
            ..Default::default()
        }
    }

    /// `{data_uri}/{user_id}/{dataset_id}`, the prefix of every minted URI.
    pub fn dataset_base_uri(&self) -> String {
        format!(
            "{}/{}/{}",
            self.data_uri.trim_end_matches('/'),
            self.user_id,
            self.dataset_id
        )
    }

    /// The SPARQL Update endpoint, including the application key.
    pub fn update_endpoint(&self) -> String {
        format!(
            "{}/{}/data/{}/sparql/update?key={}",
            self.api_url.trim_end_matches('/'),
            self.api_version,
            self.dataset_id,
            self.application_key
        )
    }

    /// Reject configs that would mint malformed URIs.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [("user_id", &self.user_id), ("dataset_id", &self.dataset_id)] {
            if value.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("`{field}` must be set"),
                });
            }
            if value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid {
                    message: format!("`{field}` must be a single path segment, got {value:?}"),
                });
            }
        }
        if self.site_language.is_empty() {
            return Err(ConfigError::Invalid {
                message: "`site_language` must be a language tag such as \"en\"".into(),
            });
        }
        if let Some(bad) = self
            .application_key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')))
        {
            return Err(ConfigError::Invalid {
                message: format!("`application_key` contains {bad:?}, which cannot appear unescaped in a URL query"),
            });
        }
        if self.max_uri_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "`max_uri_attempts` must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
