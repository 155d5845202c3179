//! Message cache implementations.

use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use confab_core::conversation::{Message, MessageCache};
use confab_core::{ConfabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Newest messages kept per conversation.
const MAX_CACHED_MESSAGES: usize = 500;

/// Merges `incoming` into `existing`, keeping the newest
/// `MAX_CACHED_MESSAGES` in ascending `created_at` order.
///
/// A message already cached under the same local or server id is replaced,
/// keeping its local id. The backend's copy of a locally sent message
/// replaces the local one the same way; a local message whose backend copy is
/// already cached is dropped.
fn merge_messages(existing: &mut Vec<Message>, incoming: &[Message]) {
    for message in incoming {
        let slot = match existing.iter().position(|m| m.is_same_message(message)) {
            Some(index) => Some(index),
            None => existing.iter().position(|m| m.is_same_turn(message)),
        };
        match slot {
            Some(index) if existing[index].is_confirmed() && !message.is_confirmed() => {}
            Some(index) => {
                let local_id = std::mem::take(&mut existing[index].id);
                existing[index] = message.clone();
                existing[index].id = local_id;
            }
            None => existing.push(message.clone()),
        }
    }
    existing.sort_by_key(|m| m.created_at);
    if existing.len() > MAX_CACHED_MESSAGES {
        let excess = existing.len() - MAX_CACHED_MESSAGES;
        existing.drain(..excess);
    }
}

/// In-process cache, used when no persistent cache is wanted.
#[derive(Default)]
pub struct InMemoryMessageCache {
    conversations: Mutex<HashMap<String, Vec<Message>>>,
}

impl InMemoryMessageCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageCache for InMemoryMessageCache {
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conversations = self.conversations.lock().await;
        Ok(conversations.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn merge(&self, conversation_id: &str, messages: &[Message]) -> Result<()> {
        let mut conversations = self.conversations.lock().await;
        let entry = conversations.entry(conversation_id.to_string()).or_default();
        merge_messages(entry, messages);
        Ok(())
    }

    async fn remove_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        let mut conversations = self.conversations.lock().await;
        if let Some(messages) = conversations.get_mut(conversation_id) {
            messages.retain(|m| m.id != message_id);
        }
        Ok(())
    }

    async fn remove_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.lock().await.remove(conversation_id);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CachedConversation {
    conversation_id: String,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Persistent cache: one atomic TOML file per conversation.
///
/// # Directory Structure
///
/// ```text
/// cache/conversations/
/// ├── conversation-<hex id>.toml
/// └── conversation-<hex id>.lock
/// ```
pub struct TomlMessageCache {
    dir: PathBuf,
}

impl TomlMessageCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The file name is the hex-encoded id, so every id maps to its own
    /// file and none can escape `dir`.
    fn file_for(&self, conversation_id: &str) -> AtomicTomlFile<CachedConversation> {
        let stem = hex::encode(conversation_id);
        AtomicTomlFile::new(self.dir.join(format!("conversation-{}.toml", stem)))
    }

    async fn run_blocking<R, F>(&self, conversation_id: &str, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(AtomicTomlFile<CachedConversation>) -> Result<R> + Send + 'static,
    {
        let file = self.file_for(conversation_id);
        tokio::task::spawn_blocking(move || f(file))
            .await
            .map_err(|e| ConfabError::internal(format!("Failed to join task: {}", e)))?
    }
}

#[async_trait]
impl MessageCache for TomlMessageCache {
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let cached = self
            .run_blocking(conversation_id, |file| file.load().map_err(ConfabError::from))
            .await?;
        Ok(cached.map(|c| c.messages).unwrap_or_default())
    }

    async fn merge(&self, conversation_id: &str, messages: &[Message]) -> Result<()> {
        let id = conversation_id.to_string();
        let messages = messages.to_vec();
        self.run_blocking(conversation_id, move |file| {
            let default = CachedConversation {
                conversation_id: id,
                messages: Vec::new(),
            };
            file.update(default, |cached| {
                merge_messages(&mut cached.messages, &messages);
                Ok(())
            })
            .map_err(ConfabError::from)
        })
        .await
    }

    async fn remove_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        let id = conversation_id.to_string();
        let message_id = message_id.to_string();
        self.run_blocking(conversation_id, move |file| {
            if !file.path().exists() {
                return Ok(());
            }
            let default = CachedConversation {
                conversation_id: id,
                messages: Vec::new(),
            };
            file.update(default, |cached| {
                cached.messages.retain(|m| m.id != message_id);
                Ok(())
            })
            .map_err(ConfabError::from)
        })
        .await
    }

    async fn remove_conversation(&self, conversation_id: &str) -> Result<()> {
        self.run_blocking(conversation_id, |file| file.remove().map_err(ConfabError::from))
            .await
    }
}
