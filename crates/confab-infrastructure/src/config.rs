//! Client configuration.
//!
//! Loaded from `config.toml` in the confab config directory. A missing file
//! yields the defaults; a malformed one is a configuration error.

use confab_core::{ConfabError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable that overrides `api_base_url`.
pub const API_BASE_URL_ENV: &str = "CONFAB_API_BASE_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/";
const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OAUTH_STATE_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the conversational backend
    pub api_base_url: String,
    /// Messages per history page
    pub page_size: usize,
    /// Per-request timeout enforced by the HTTP gateway
    pub request_timeout_secs: u64,
    /// Tools attached to every send unless the user changes the selection
    pub default_tools: Vec<String>,
    /// How long a pending OAuth state token stays valid
    pub oauth_state_ttl_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            default_tools: Vec::new(),
            oauth_state_ttl_secs: DEFAULT_OAUTH_STATE_TTL_SECS,
        }
    }
}

impl ClientConfig {
    /// Loads the configuration file, applying environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Self::default()
            } else {
                toml::from_str(&content).map_err(|e| {
                    ConfabError::config(format!("Invalid {}: {}", path.display(), e))
                })?
            }
        } else {
            tracing::debug!("[Config] No config at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(url) = std::env::var(API_BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            config.api_base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and the base URL.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ConfabError::config("page_size must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfabError::config("request_timeout_secs must be at least 1"));
        }
        self.base_url()?;
        Ok(())
    }

    /// The base URL, normalised to end with `/` so relative joins append.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| ConfabError::config(format!("Invalid api_base_url '{}': {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfabError::config(format!(
                "api_base_url must be http or https, got '{}'",
                scheme
            ))),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn oauth_state_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.oauth_state_ttl_secs.min(i64::MAX as u64) as i64)
    }
}
