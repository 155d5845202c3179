//! Wire formats of the conversational backend.
//!
//! The backend speaks camelCase JSON. These types stay private to the HTTP
//! gateway; everything above it sees the domain types.

use chrono::{DateTime, Utc};
use confab_core::LocationFix;
use confab_core::conversation::{
    Conversation, Message, MessageMetadata, MessageRole, ToolInvocation,
};
use confab_core::provider::{AuthType, ProviderConnection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateConversationBody<'a> {
    pub title: &'a str,
    pub tools: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMessageBody<'a> {
    pub text: &'a str,
    pub tools: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationBody>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LocationBody {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

impl From<LocationFix> for LocationBody {
    fn from(fix: LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExchangeBody<'a> {
    pub code: &'a str,
    pub state: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireConversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message_preview: Option<String>,
    #[serde(default)]
    pub message_count: Option<u32>,
}

impl From<WireConversation> for Conversation {
    fn from(wire: WireConversation) -> Self {
        Self {
            id: wire.id,
            title: wire.title,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            last_message_preview: wire.last_message_preview,
            message_count: wire.message_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMetadata {
    #[serde(default)]
    pub requires_location: bool,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMessage {
    pub id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<WireMetadata>,
}

impl WireMessage {
    /// Converts to a domain message owned by `conversation_id` unless the
    /// backend names the owner itself.
    pub fn into_message(self, conversation_id: &str) -> Message {
        Message {
            id: self.id.clone(),
            server_id: Some(self.id),
            conversation_id: self
                .conversation_id
                .unwrap_or_else(|| conversation_id.to_string()),
            role: self.role,
            content: self.content,
            created_at: self.created_at,
            metadata: self.metadata.map(|metadata| MessageMetadata {
                requires_location: metadata.requires_location,
                tool_calls: metadata
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolInvocation {
                        name: call.name,
                        arguments: call.arguments.map(json_text),
                        output: call.output.map(json_text),
                    })
                    .collect(),
            }),
        }
    }
}

/// Plain strings stay as-is; any other JSON value is kept in compact form.
fn json_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProvider {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub auth_type: AuthType,
    #[serde(default)]
    pub connected: bool,
}

impl From<WireProvider> for ProviderConnection {
    fn from(wire: WireProvider) -> Self {
        Self {
            display_name: wire.display_name.unwrap_or_else(|| wire.name.clone()),
            name: wire.name,
            auth_type: wire.auth_type,
            connected: wire.connected,
        }
    }
}

/// Error body shapes the backend is known to use.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
