//! Secret configuration file storage.
//!
//! Loads the API token from `secret.json` in the confab config directory.

use confab_core::ConfabError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable that overrides the stored API token.
pub const API_TOKEN_ENV: &str = "CONFAB_API_TOKEN";

/// Contents of `secret.json`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Bearer token for the conversational backend
    #[serde(default)]
    pub api_token: Option<String>,
}

impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// Configuration file not found.
    NotFound(PathBuf),
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::NotFound(path) => {
                write!(f, "Secret file not found at: {}", path.display())
            }
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

impl From<SecretStorageError> for ConfabError {
    fn from(e: SecretStorageError) -> Self {
        ConfabError::config(e.to_string())
    }
}

/// Storage for `secret.json`.
///
/// Read-mostly: `save` exists for first-run setup and always writes the
/// file with owner-only permissions.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads and parses the secret file.
    ///
    /// # Returns
    ///
    /// - `Ok(SecretConfig)`: Successfully loaded and parsed
    /// - `Err(SecretStorageError::NotFound)`: File doesn't exist
    /// - `Err(SecretStorageError::ParseError)`: Invalid JSON format
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the secret file with 600 permissions on Unix.
    pub fn save(&self, config: &SecretConfig) -> Result<(), SecretStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        super::atomic_toml::restrict_to_owner(&self.path)?;
        Ok(())
    }

    /// Resolves the API token: environment first, then `secret.json`.
    pub fn resolve_api_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(API_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            return Some(token);
        }

        match self.load() {
            Ok(config) => config.api_token.filter(|token| !token.trim().is_empty()),
            Err(SecretStorageError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!("[Config] Ignoring unreadable secret file: {}", e);
                None
            }
        }
    }
}
