#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use confab_core::conversation::{Conversation, Message, MessageMetadata, MessageRole};
use confab_core::provider::{AuthType, OAuthStart, ProviderConnection};
use confab_core::{ConfabError, RemoteGateway, Result, SendMessageRequest};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn conversation(id: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        title: format!("Conversation {id}"),
        created_at: base_time(),
        updated_at: base_time(),
        last_message_preview: None,
        message_count: 0,
    }
}

pub fn assistant(conversation_id: &str, id: &str, content: &str) -> Message {
    Message {
        id: id.to_string(),
        server_id: Some(id.to_string()),
        conversation_id: conversation_id.to_string(),
        role: MessageRole::Assistant,
        content: content.to_string(),
        created_at: Utc::now(),
        metadata: None,
    }
}

/// The backend's copy of a user message, as returned by `get_messages`.
pub fn server_user(conversation_id: &str, id: &str, content: &str, at: DateTime<Utc>) -> Message {
    Message {
        role: MessageRole::User,
        created_at: at,
        ..assistant(conversation_id, id, content)
    }
}

pub fn location_prompt(conversation_id: &str, id: &str) -> Message {
    let mut message = assistant(conversation_id, id, "I need your location for that.");
    message.metadata = Some(MessageMetadata {
        requires_location: true,
        tool_calls: Vec::new(),
    });
    message
}

/// `count` server messages of `conversation_id`, one minute apart, the
/// newest one minute before `base_time()`.
pub fn history(conversation_id: &str, count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let mut message = assistant(conversation_id, &format!("{conversation_id}-h{i}"), "old");
            message.created_at = base_time() - Duration::minutes(i as i64 + 1);
            message
        })
        .collect()
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.clone()).collect()
}

/// Yields to other tasks until `condition` holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Gateway double with scripted answers and call recording.
#[derive(Default)]
pub struct ScriptedGateway {
    pub create_error: Mutex<Option<ConfabError>>,
    pub created: Mutex<Vec<(String, Vec<String>)>>,
    pub send_script: Mutex<VecDeque<Result<Message>>>,
    pub sent: Mutex<Vec<SendMessageRequest>>,
    /// When set, every `send_message` waits for a permit.
    pub send_gate: Mutex<Option<Arc<Semaphore>>>,
    pub history: Mutex<Vec<Message>>,
    pub get_calls: AtomicUsize,
    pub get_error: Mutex<Option<ConfabError>>,
    /// When set, every `get_messages` waits for a permit.
    pub fetch_gate: Mutex<Option<Arc<Semaphore>>>,
    pub conversations: Mutex<Vec<Conversation>>,
    pub deleted: Mutex<Vec<String>>,
    pub providers: Mutex<Vec<ProviderConnection>>,
    pub next_state: Mutex<String>,
    pub exchange_calls: AtomicUsize,
    pub exchange_error: Mutex<Option<ConfabError>>,
    pub disconnected: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reply(&self, reply: Result<Message>) {
        self.send_script.lock().unwrap().push_back(reply);
    }

    pub fn set_history(&self, messages: Vec<Message>) {
        *self.history.lock().unwrap() = messages;
    }

    /// Makes sends block until permits are added to the returned semaphore.
    pub fn hold_sends(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.send_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Makes fetches block until permits are added to the returned semaphore.
    pub fn hold_fetches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.fetch_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_sent(&self) -> SendMessageRequest {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }

    pub fn get_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn create_conversation(&self, title: &str, tools: &[String]) -> Result<Conversation> {
        if let Some(error) = self.create_error.lock().unwrap().clone() {
            return Err(error);
        }
        let mut created = self.created.lock().unwrap();
        created.push((title.to_string(), tools.to_vec()));
        let mut conversation = conversation(&format!("c-{}", created.len()));
        conversation.title = title.to_string();
        Ok(conversation)
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        self.sent.lock().unwrap().push(request.clone());
        let gate = self.send_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        let scripted = self.send_script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(mut reply)) => {
                reply.conversation_id = request.conversation_id.clone();
                Ok(reply)
            }
            Some(Err(error)) => Err(error),
            None => {
                let n = self.sent_count();
                Ok(assistant(
                    &request.conversation_id,
                    &format!("reply-{n}"),
                    &format!("echo: {}", request.text),
                ))
            }
        }
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.fetch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(error) = self.get_error.lock().unwrap().clone() {
            return Err(error);
        }

        let mut page: Vec<Message> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| before.is_none_or(|before| m.created_at < before))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        page.truncate(limit);
        Ok(page)
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(conversation_id.to_string());
        Ok(())
    }

    async fn list_providers(&self) -> Result<Vec<ProviderConnection>> {
        Ok(self.providers.lock().unwrap().clone())
    }

    async fn start_provider_oauth(&self, provider: &str) -> Result<OAuthStart> {
        Ok(OAuthStart {
            auth_url: format!("https://auth.example.com/{provider}/authorize"),
            state: self.next_state.lock().unwrap().clone(),
        })
    }

    async fn exchange_provider_oauth(
        &self,
        provider: &str,
        _code: &str,
        _state: &str,
    ) -> Result<ProviderConnection> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.exchange_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(ProviderConnection {
            name: provider.to_string(),
            display_name: provider.to_uppercase(),
            auth_type: AuthType::OAuth2,
            connected: true,
        })
    }

    async fn disconnect_provider(&self, provider: &str) -> Result<()> {
        self.disconnected.lock().unwrap().push(provider.to_string());
        Ok(())
    }
}
