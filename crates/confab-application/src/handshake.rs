//! Provider OAuth handshake.
//!
//! `start` persists the CSRF state token before the authorization URL leaves
//! the process; `exchange` takes the stored token (read and clear in one
//! step) and refuses to call the token endpoint unless it matches.

use confab_core::provider::{HandshakePhase, OAuthStateStore, ProviderConnection};
use confab_core::{ConfabError, RemoteGateway, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connects and disconnects third-party providers.
pub struct ProviderHandshake {
    gateway: Arc<dyn RemoteGateway>,
    state_store: Arc<dyn OAuthStateStore>,
    connections: RwLock<Vec<ProviderConnection>>,
    phases: RwLock<HashMap<String, HandshakePhase>>,
}

impl ProviderHandshake {
    pub fn new(gateway: Arc<dyn RemoteGateway>, state_store: Arc<dyn OAuthStateStore>) -> Self {
        Self {
            gateway,
            state_store,
            connections: RwLock::new(Vec::new()),
            phases: RwLock::new(HashMap::new()),
        }
    }

    /// Last known provider list.
    pub async fn providers(&self) -> Vec<ProviderConnection> {
        self.connections.read().await.clone()
    }

    /// Reloads the provider list from the backend.
    ///
    /// Providers in the middle of a handshake keep their phase.
    pub async fn refresh(&self) -> Result<Vec<ProviderConnection>> {
        let providers = self.gateway.list_providers().await?;

        {
            let mut phases = self.phases.write().await;
            for provider in &providers {
                let in_progress = matches!(
                    phases.get(&provider.name),
                    Some(HandshakePhase::PendingState | HandshakePhase::AwaitingExchange)
                );
                if !in_progress {
                    phases.insert(provider.name.clone(), settled_phase(provider.connected));
                }
            }
        }

        *self.connections.write().await = providers.clone();
        tracing::debug!("[OAuth] Refreshed {} providers", providers.len());
        Ok(providers)
    }

    /// Current handshake phase of `provider`.
    pub async fn phase(&self, provider: &str) -> HandshakePhase {
        if let Some(phase) = self.phases.read().await.get(provider) {
            return phase.clone();
        }
        let connected = self
            .connections
            .read()
            .await
            .iter()
            .any(|c| c.name == provider && c.connected);
        settled_phase(connected)
    }

    /// Begins the OAuth flow for `provider`.
    ///
    /// # Returns
    ///
    /// The authorization URL to open. The state token has already been
    /// stored durably when this returns.
    pub async fn start(&self, provider: &str) -> Result<String> {
        let start = match self.gateway.start_provider_oauth(provider).await {
            Ok(start) => start,
            Err(e) => {
                self.set_phase(provider, HandshakePhase::Failed(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        self.set_phase(provider, HandshakePhase::PendingState).await;
        if let Err(e) = self.state_store.put(provider, &start.state).await {
            tracing::error!("[OAuth] Failed to persist state token for '{}': {}", provider, e);
            self.set_phase(provider, HandshakePhase::Failed(e.to_string()))
                .await;
            return Err(e);
        }

        self.set_phase(provider, HandshakePhase::AwaitingExchange)
            .await;
        tracing::info!("[OAuth] Started authorization for '{}'", provider);
        Ok(start.auth_url)
    }

    /// Completes the OAuth flow with the `code` and `state` from the callback.
    ///
    /// The stored token is consumed before it is compared, so a state value
    /// can succeed at most once. On mismatch the token endpoint is not called.
    pub async fn exchange(
        &self,
        provider: &str,
        code: &str,
        state: &str,
    ) -> Result<ProviderConnection> {
        let stored = match self.state_store.take(provider).await {
            Ok(stored) => stored,
            Err(e) => {
                self.set_phase(provider, HandshakePhase::Failed(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let matches = stored
            .as_deref()
            .is_some_and(|expected| tokens_match(expected, state));
        if !matches {
            tracing::warn!("[OAuth] State mismatch for '{}'; exchange refused", provider);
            let error = ConfabError::OAuthStateMismatch;
            self.set_phase(provider, HandshakePhase::Failed(error.to_string()))
                .await;
            return Err(error);
        }

        let mut connection = match self.gateway.exchange_provider_oauth(provider, code, state).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("[OAuth] Exchange failed for '{}': {}", provider, e);
                self.set_phase(provider, HandshakePhase::Failed(e.to_string()))
                    .await;
                return Err(e);
            }
        };
        connection.connected = true;

        {
            let mut connections = self.connections.write().await;
            match connections.iter_mut().find(|c| c.name == connection.name) {
                Some(existing) => *existing = connection.clone(),
                None => connections.push(connection.clone()),
            }
        }
        self.set_phase(provider, HandshakePhase::Connected).await;
        tracing::info!("[OAuth] Connected '{}'", provider);
        Ok(connection)
    }

    /// Revokes the connection to `provider`.
    pub async fn disconnect(&self, provider: &str) -> Result<()> {
        self.gateway.disconnect_provider(provider).await?;

        if let Some(connection) = self
            .connections
            .write()
            .await
            .iter_mut()
            .find(|c| c.name == provider)
        {
            connection.connected = false;
        }
        self.set_phase(provider, HandshakePhase::Disconnected)
            .await;
        tracing::info!("[OAuth] Disconnected '{}'", provider);
        Ok(())
    }

    async fn set_phase(&self, provider: &str, phase: HandshakePhase) {
        self.phases
            .write()
            .await
            .insert(provider.to_string(), phase);
    }
}

fn settled_phase(connected: bool) -> HandshakePhase {
    if connected {
        HandshakePhase::Connected
    } else {
        HandshakePhase::Disconnected
    }
}

/// Compares two tokens without stopping at the first differing byte.
fn tokens_match(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }
    expected
        .iter()
        .zip(actual)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
