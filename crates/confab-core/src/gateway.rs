//! Remote gateway trait.
//!
//! Defines the backend surface the client consumes. Implementations do no
//! business logic: they return typed results or typed failures.

use crate::conversation::{Conversation, Message};
use crate::error::Result;
use crate::location::LocationFix;
use crate::provider::{OAuthStart, ProviderConnection};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Payload of a `send_message` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessageRequest {
    pub text: String,
    pub conversation_id: String,
    /// Tools the backend may invoke for this turn
    pub tools: Vec<String>,
    /// Device location, once the user supplied one
    pub location: Option<LocationFix>,
}

/// An abstract gateway to the conversational backend.
///
/// Failures are reported as `ConfabError::{Network, NotAuthenticated,
/// TokenExpired, Validation, Server}`; timeouts are `Network`.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Creates a conversation and returns it with its backend id.
    async fn create_conversation(&self, title: &str, tools: &[String]) -> Result<Conversation>;

    /// Sends one user turn and returns the assistant reply.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message>;

    /// Fetches up to `limit` messages older than `before`, newest first.
    ///
    /// `before = None` fetches the newest page.
    async fn get_messages(
        &self,
        conversation_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Lists the user's conversations.
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    /// Deletes a conversation and every message it owns.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;

    /// Lists the available providers and their connection status.
    async fn list_providers(&self) -> Result<Vec<ProviderConnection>>;

    /// Starts the OAuth flow for a provider.
    async fn start_provider_oauth(&self, provider: &str) -> Result<OAuthStart>;

    /// Exchanges the authorization `code` for a connection.
    async fn exchange_provider_oauth(
        &self,
        provider: &str,
        code: &str,
        state: &str,
    ) -> Result<ProviderConnection>;

    /// Revokes a provider connection.
    async fn disconnect_provider(&self, provider: &str) -> Result<()>;
}
