//! Conversation domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of characters kept when deriving a title or a preview.
const SNIPPET_CHARS: usize = 48;

/// A conversation as known to the client.
///
/// The id is assigned by the backend; a conversation only exists once the
/// first send created it. `last_message_preview` and `message_count` are
/// denormalised copies kept current by every successful send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Backend-assigned identifier
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Timestamp when the conversation was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last change (new message, rename)
    pub updated_at: DateTime<Utc>,
    /// Short preview of the newest message
    #[serde(default)]
    pub last_message_preview: Option<String>,
    /// Number of messages in the conversation
    #[serde(default)]
    pub message_count: u32,
}

impl Conversation {
    /// Records a successful exchange on the denormalised fields.
    pub fn record_exchange(&mut self, preview: &str, added: u32, at: DateTime<Utc>) {
        self.last_message_preview = Some(snippet(preview));
        self.message_count = self.message_count.saturating_add(added);
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

/// Derives a conversation title from the first message of the conversation.
pub fn title_from_text(text: &str) -> String {
    let title = snippet(text);
    if title.is_empty() {
        "New Chat".to_string()
    } else {
        title
    }
}

/// Single-line, char-boundary-safe prefix of `text`.
fn snippet(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= SNIPPET_CHARS {
        return line;
    }
    let mut cut: String = line.chars().take(SNIPPET_CHARS).collect();
    cut.push('…');
    cut
}
