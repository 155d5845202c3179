//! Wires configuration, secrets and the concrete collaborators together.

use anyhow::Result;
use confab_application::{ChatSession, ProviderHandshake};
use confab_infrastructure::storage::SecretStorage;
use confab_infrastructure::{
    ClientConfig, ConfabPaths, FileOAuthStateStore, HttpRemoteGateway, TomlMessageCache,
};
use std::sync::Arc;

pub struct AppContext {
    pub paths: ConfabPaths,
    pub config: ClientConfig,
    pub gateway: Arc<HttpRemoteGateway>,
}

impl AppContext {
    pub fn load(paths: ConfabPaths) -> Result<Self> {
        let config = ClientConfig::load(&paths.config_file()?)?;

        let api_token = SecretStorage::with_path(paths.secret_file()?).resolve_api_token();
        if api_token.is_none() {
            tracing::warn!("[Config] No API token configured; run `confab login`");
        }

        let gateway = Arc::new(HttpRemoteGateway::new(&config, api_token)?);
        tracing::debug!("[Config] Using backend at {}", config.api_base_url);

        Ok(Self {
            paths,
            config,
            gateway,
        })
    }

    pub fn chat_session(&self) -> Result<ChatSession> {
        let cache = TomlMessageCache::new(self.paths.conversation_cache_dir()?);
        Ok(ChatSession::from_config(
            &self.config,
            self.gateway.clone(),
            Arc::new(cache),
        ))
    }

    pub fn handshake(&self) -> Result<ProviderHandshake> {
        let state_store = FileOAuthStateStore::open(
            self.paths.oauth_state_file()?,
            &self.paths.oauth_seal_key_file()?,
            self.config.oauth_state_ttl(),
        )?;
        Ok(ProviderHandshake::new(
            self.gateway.clone(),
            Arc::new(state_store),
        ))
    }
}
