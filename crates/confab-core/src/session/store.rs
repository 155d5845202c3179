//! In-memory state of the active conversation.

use super::cursor::PaginationCursor;
use crate::conversation::{Conversation, Message};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A session store shared by the orchestrator, the pager and the UI.
///
/// Callers must not hold the lock across an `.await` on the network.
pub type SharedSessionStore = Arc<RwLock<SessionStore>>;

/// Holds the active conversation, its loaded messages and the pager cursor.
///
/// Pure state container: no I/O. Messages are kept in display order (oldest
/// first); `append` never reorders. Every change of the active conversation
/// bumps `epoch`, which in-flight loads compare against before applying
/// their result.
#[derive(Debug, Default)]
pub struct SessionStore {
    conversation_id: Option<String>,
    conversation: Option<Conversation>,
    messages: Vec<Message>,
    cursor: PaginationCursor,
    epoch: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a fresh store for sharing between components.
    pub fn shared() -> SharedSessionStore {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Details of the active conversation, when known.
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut PaginationCursor {
        &mut self.cursor
    }

    /// Current load token.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Makes `conversation_id` the active conversation.
    ///
    /// Always starts a new load session, even when the id is unchanged:
    /// messages are cleared, the cursor is reset and the epoch advances.
    ///
    /// # Returns
    ///
    /// The new epoch.
    pub fn activate(&mut self, conversation_id: impl Into<String>) -> u64 {
        let conversation_id = conversation_id.into();
        if self.conversation_id.as_deref() != Some(conversation_id.as_str()) {
            self.conversation = None;
        }
        self.conversation_id = Some(conversation_id);
        self.start_load_session()
    }

    /// Drops the active conversation; the next send creates a new one.
    pub fn clear(&mut self) -> u64 {
        self.conversation_id = None;
        self.conversation = None;
        self.start_load_session()
    }

    fn start_load_session(&mut self) -> u64 {
        self.messages.clear();
        self.cursor.reset();
        self.epoch += 1;
        self.epoch
    }

    /// Stores the details of the active conversation.
    ///
    /// Ignored when `conversation` is not the active one.
    pub fn set_details(&mut self, conversation: Conversation) {
        if self.conversation_id.as_deref() == Some(conversation.id.as_str()) {
            self.conversation = Some(conversation);
        }
    }

    /// Appends a message at the end of the list.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes a message by local id.
    pub fn remove(&mut self, message_id: &str) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == message_id)?;
        Some(self.messages.remove(index))
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    /// Replaces the loaded messages with `messages`, sorted oldest first.
    pub fn replace_messages(&mut self, mut messages: Vec<Message>) {
        sort_ascending(&mut messages);
        self.messages = messages;
    }

    /// Creation time of the oldest loaded message.
    pub fn oldest_loaded(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().map(|m| m.created_at).min()
    }

    /// Inserts an older page in front of the loaded messages.
    ///
    /// The page is sorted oldest first. Messages already loaded are skipped,
    /// including the backend's copy of a message sent from here, which only
    /// stamps its server id onto the loaded one. Relative order of the
    /// existing messages is untouched.
    ///
    /// # Returns
    ///
    /// The number of messages actually inserted.
    pub fn prepend_older(&mut self, mut page: Vec<Message>) -> usize {
        page.retain(|incoming| !self.absorb(incoming));
        sort_ascending(&mut page);

        let inserted = page.len();
        page.append(&mut self.messages);
        self.messages = page;
        inserted
    }

    /// Whether `incoming` is already loaded, under either of its ids or as an
    /// unacknowledged local message, which then takes the server id.
    fn absorb(&mut self, incoming: &Message) -> bool {
        if self.messages.iter().any(|m| m.is_same_message(incoming)) {
            return true;
        }
        match self.messages.iter_mut().find(|m| m.is_same_turn(incoming)) {
            Some(local) => {
                local.confirm_with(incoming);
                true
            }
            None => false,
        }
    }

    /// Updates the denormalised preview of the active conversation.
    pub fn record_exchange(&mut self, preview: &str, added: u32, at: DateTime<Utc>) {
        if let Some(conversation) = self.conversation.as_mut() {
            conversation.record_exchange(preview, added, at);
        }
    }
}

fn sort_ascending(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.created_at);
}
