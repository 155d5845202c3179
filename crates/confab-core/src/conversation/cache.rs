//! Message cache trait.
//!
//! Defines the interface for the local conversation/message cache.

use super::message::Message;
use crate::error::Result;
use async_trait::async_trait;

/// A local cache of conversation messages.
///
/// The backend is the source of truth; the cache only lets the client show
/// history before the first page arrives. Implementations keep messages per
/// conversation, de-duplicated by id and ordered by `created_at`.
#[async_trait]
pub trait MessageCache: Send + Sync {
    /// Loads the cached messages of a conversation, oldest first.
    ///
    /// Returns an empty list when nothing is cached.
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Merges `messages` into the cached history of a conversation.
    ///
    /// Messages whose id is already cached are replaced.
    async fn merge(&self, conversation_id: &str, messages: &[Message]) -> Result<()>;

    /// Drops a single message (used when an optimistic message is rolled back).
    async fn remove_message(&self, conversation_id: &str, message_id: &str) -> Result<()>;

    /// Drops everything cached for a conversation.
    ///
    /// Succeeds when nothing was cached.
    async fn remove_conversation(&self, conversation_id: &str) -> Result<()>;
}
