//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including roles, metadata and tool traces.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// One tool call the backend made while producing a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name as known to the backend (e.g. "weather")
    pub name: String,
    /// Raw arguments, as the backend reported them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Tool output summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Optional side data attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// The backend needs the device location before it can answer.
    #[serde(default)]
    pub requires_location: bool,
    /// Tools invoked while producing this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
}

/// How far the backend's timestamp for a message may be from the local one
/// while the message still counts as the same turn.
const SAME_TURN_WINDOW_MINUTES: i64 = 10;

/// A single message in a conversation history.
///
/// `id` is generated locally for messages the user types, so the message can
/// be tracked (and rolled back) before the backend has seen it. Messages that
/// come from the backend reuse the server id as their local id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Local identifier
    pub id: String,
    /// Identifier assigned by the backend, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Owning conversation
    pub conversation_id: String,
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Timestamp when the message was created.
    pub created_at: DateTime<Utc>,
    /// Optional metadata bag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Creates a user message with a fresh local id, stamped now.
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            server_id: None,
            conversation_id: conversation_id.into(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            metadata: None,
        }
    }

    /// Whether the backend has acknowledged this message with its own id.
    pub fn is_confirmed(&self) -> bool {
        self.server_id.is_some()
    }

    /// Whether `other` carries the same identity: equal local ids or equal
    /// server ids.
    pub fn is_same_message(&self, other: &Message) -> bool {
        if self.id == other.id {
            return true;
        }
        matches!((&self.server_id, &other.server_id), (Some(a), Some(b)) if a == b)
    }

    /// Whether one of `self` and `other` is a local message the backend has
    /// not acknowledged yet and the other is the backend's copy of it.
    ///
    /// Matches on conversation, role and content, with creation times no
    /// more than `SAME_TURN_WINDOW_MINUTES` apart.
    pub fn is_same_turn(&self, other: &Message) -> bool {
        self.is_confirmed() != other.is_confirmed()
            && self.conversation_id == other.conversation_id
            && self.role == other.role
            && self.content == other.content
            && (self.created_at - other.created_at).num_seconds().abs()
                <= Duration::minutes(SAME_TURN_WINDOW_MINUTES).num_seconds()
    }

    /// Records the server id of `confirmed`, keeping the local id.
    pub fn confirm_with(&mut self, confirmed: &Message) {
        if self.server_id.is_none() {
            self.server_id = confirmed.server_id.clone();
        }
    }

    /// Whether the backend flagged this message as needing the device location.
    pub fn requires_location(&self) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(|metadata| metadata.requires_location)
    }
}
