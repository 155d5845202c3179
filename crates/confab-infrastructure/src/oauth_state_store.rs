//! File-backed OAuth state token store.
//!
//! Pending tokens live in one owner-only TOML file. Each record is sealed
//! with HMAC-SHA256 under a per-install key, so a record edited on disk is
//! detected and discarded. `take` removes the record under the file lock
//! before anything else looks at it, which makes every token single-use
//! across processes.

use crate::storage::AtomicTomlFile;
use crate::storage::atomic_toml::restrict_to_owner;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use confab_core::provider::OAuthStateStore;
use confab_core::{ConfabError, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 32;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PendingStateFile {
    #[serde(default)]
    pending: BTreeMap<String, SealedState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedState {
    state: String,
    issued_at: DateTime<Utc>,
    /// hex HMAC over provider, state and issue time
    seal: String,
}

/// Durable `OAuthStateStore` backed by a sealed, locked TOML file.
pub struct FileOAuthStateStore {
    file: Arc<AtomicTomlFile<PendingStateFile>>,
    key: Arc<Vec<u8>>,
    ttl: chrono::Duration,
}

impl FileOAuthStateStore {
    /// Opens the store, creating the sealing key on first use.
    ///
    /// # Arguments
    ///
    /// * `state_path` - file holding the pending tokens
    /// * `key_path` - file holding the sealing key
    /// * `ttl` - how long a token stays valid after `put`
    pub fn open(state_path: PathBuf, key_path: &Path, ttl: chrono::Duration) -> Result<Self> {
        let key = load_or_create_key(key_path)?;
        Ok(Self {
            file: Arc::new(AtomicTomlFile::new(state_path).private()),
            key: Arc::new(key),
            ttl,
        })
    }

    fn seal(&self, provider: &str, state: &str, issued_at: DateTime<Utc>) -> Result<String> {
        let mac = self.mac(provider, state, issued_at)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, provider: &str, record: &SealedState) -> bool {
        let Ok(expected) = hex::decode(&record.seal) else {
            return false;
        };
        match self.mac(provider, &record.state, record.issued_at) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, provider: &str, state: &str, issued_at: DateTime<Utc>) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| ConfabError::internal(format!("Invalid sealing key: {}", e)))?;
        mac.update(provider.as_bytes());
        mac.update(&[0]);
        mac.update(state.as_bytes());
        mac.update(&[0]);
        mac.update(issued_at.to_rfc3339().as_bytes());
        Ok(mac)
    }

    async fn run_blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&AtomicTomlFile<PendingStateFile>) -> Result<R> + Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| ConfabError::internal(format!("Failed to join task: {}", e)))?
    }
}

#[async_trait]
impl OAuthStateStore for FileOAuthStateStore {
    async fn put(&self, provider: &str, state: &str) -> Result<()> {
        let issued_at = Utc::now();
        let record = SealedState {
            state: state.to_string(),
            issued_at,
            seal: self.seal(provider, state, issued_at)?,
        };
        let provider = provider.to_string();

        self.run_blocking(move |file| {
            file.update(PendingStateFile::default(), |contents| {
                contents.pending.insert(provider, record);
                Ok(())
            })
            .map_err(ConfabError::from)
        })
        .await?;

        tracing::debug!("[OAuth] Stored pending state token");
        Ok(())
    }

    async fn take(&self, provider: &str) -> Result<Option<String>> {
        let key = provider.to_string();
        let record = self
            .run_blocking(move |file| {
                file.update(PendingStateFile::default(), |contents| {
                    Ok(contents.pending.remove(&key))
                })
                .map_err(ConfabError::from)
            })
            .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        if !self.verify(provider, &record) {
            tracing::warn!(
                "[OAuth] Discarding pending state for '{}': seal verification failed",
                provider
            );
            return Ok(None);
        }

        if Utc::now() - record.issued_at > self.ttl {
            tracing::warn!("[OAuth] Discarding expired pending state for '{}'", provider);
            return Ok(None);
        }

        Ok(Some(record.state))
    }
}

fn load_or_create_key(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        let encoded = fs::read_to_string(path)?;
        let key = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfabError::storage(format!("Corrupt sealing key: {}", e)))?;
        if key.len() != KEY_LEN {
            return Err(ConfabError::storage("Corrupt sealing key: wrong length"));
        }
        return Ok(key);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut key = vec![0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    fs::write(path, BASE64_STANDARD.encode(&key))?;
    restrict_to_owner(path)?;
    tracing::info!("[OAuth] Created state sealing key at {}", path.display());
    Ok(key)
}
