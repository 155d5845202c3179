//! Unified path management for confab files.
//!
//! ```text
//! ~/.config/confab/            # Config directory
//! ├── config.toml              # Client configuration
//! ├── secret.json              # API token
//! └── oauth/
//!     ├── pending_state.toml   # Pending OAuth state tokens (sealed)
//!     └── seal.key             # Per-install sealing key
//!
//! ~/.local/share/confab/       # Data directory
//! ├── cache/conversations/     # One TOML file per cached conversation
//! └── logs/                    # confab.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "confab";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for confab_core::ConfabError {
    fn from(err: PathError) -> Self {
        confab_core::ConfabError::config(err.to_string())
    }
}

/// Resolves every file location confab uses.
///
/// With a root override (tests, portable installs) both the config and the
/// data directory live under that root.
#[derive(Debug, Clone, Default)]
pub struct ConfabPaths {
    root: Option<PathBuf>,
}

impl ConfabPaths {
    /// Creates a resolver, optionally rooted at `root`.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Returns the confab configuration directory (e.g. `~/.config/confab/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.root {
            Some(root) => Ok(root.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the confab data directory (e.g. `~/.local/share/confab/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.root {
            Some(root) => Ok(root.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// This file must keep 600 permissions on Unix.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    pub fn oauth_state_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("oauth").join("pending_state.toml"))
    }

    pub fn oauth_seal_key_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("oauth").join("seal.key"))
    }

    pub fn conversation_cache_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("cache").join("conversations"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}
