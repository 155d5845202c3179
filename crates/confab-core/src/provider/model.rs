//! Provider connection domain model.

use serde::{Deserialize, Serialize};
use strum::Display;

/// How a provider authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthType {
    #[serde(rename = "oauth2")]
    #[strum(serialize = "oauth2")]
    OAuth2,
    ApiKey,
    #[serde(other)]
    Other,
}

/// A third-party account connection (Gmail, GitHub, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConnection {
    /// Stable provider key used in API paths (e.g. "gmail")
    pub name: String,
    /// Name shown to the user
    pub display_name: String,
    pub auth_type: AuthType,
    pub connected: bool,
}

/// Where a provider is in the connect handshake.
///
/// `Disconnected → PendingState → AwaitingExchange → Connected | Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum HandshakePhase {
    Disconnected,
    /// State token issued and persisted, URL not yet handed off.
    PendingState,
    /// The user is on the external consent screen.
    AwaitingExchange,
    Connected,
    Failed(String),
}

/// The result of starting an OAuth flow.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStart {
    /// URL to open in the external browser
    pub auth_url: String,
    /// Opaque single-use CSRF token
    pub state: String,
}

impl std::fmt::Debug for OAuthStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStart")
            .field("auth_url", &self.auth_url)
            .field("state", &"<redacted>")
            .finish()
    }
}
