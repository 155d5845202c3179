//! OAuth state token store trait.

use crate::error::Result;
use async_trait::async_trait;

/// Durable storage for pending OAuth CSRF state tokens, keyed by provider.
///
/// Written when a handshake starts and consumed when the external flow
/// redirects back, possibly after the process was suspended or restarted.
///
/// # Implementation Notes
///
/// - `take` must read and clear in one step: two concurrent `take` calls for
///   the same provider return the token at most once.
/// - Tokens are secrets and must never be logged.
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    /// Stores `state` for `provider`, replacing any earlier token.
    async fn put(&self, provider: &str, state: &str) -> Result<()>;

    /// Atomically removes and returns the token for `provider`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(state))`: a valid token was pending
    /// - `Ok(None)`: nothing pending (or the record was unusable)
    /// - `Err(_)`: the store could not be accessed
    async fn take(&self, provider: &str) -> Result<Option<String>>;
}
