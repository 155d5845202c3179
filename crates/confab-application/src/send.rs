//! Message send orchestration.
//!
//! A send appends the user's message optimistically, calls the gateway and
//! then either commits the assistant reply or compensates by removing the
//! optimistic message. A reply asking for the device location parks the send
//! in the `LocationGate` until the user answers.

use crate::location::{LocationGate, PendingLocationRequest};
use confab_core::conversation::{Message, MessageCache, title_from_text};
use confab_core::session::SharedSessionStore;
use confab_core::{ConfabError, LocationFix, RemoteGateway, SendMessageRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strum::Display;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Where in the send pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SendStage {
    /// Rejected before any state changed
    #[strum(serialize = "validation")]
    Validation,
    /// The lazy conversation creation failed; nothing to roll back
    #[strum(serialize = "conversation creation")]
    CreateConversation,
    /// The send itself failed; the optimistic message was removed
    #[strum(serialize = "delivery")]
    Delivery,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Send failed during {stage}: {error}")]
pub struct SendError {
    pub stage: SendStage,
    #[source]
    pub error: ConfabError,
}

impl SendError {
    pub fn new(stage: SendStage, error: ConfabError) -> Self {
        Self { stage, error }
    }

    /// Whether an optimistic message was appended and then removed.
    pub fn rolled_back(&self) -> bool {
        self.stage == SendStage::Delivery
    }
}

impl From<SendError> for ConfabError {
    fn from(err: SendError) -> Self {
        err.error
    }
}

/// Result of a send that reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The reply was appended and the exchange is complete.
    Delivered { user: Message, reply: Message },
    /// The reply was appended and asks for the device location; the send is
    /// parked until `supply_location` or `decline_location`.
    LocationRequired { user: Message, reply: Message },
}

impl SendOutcome {
    pub fn reply(&self) -> &Message {
        match self {
            Self::Delivered { reply, .. } | Self::LocationRequired { reply, .. } => reply,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// The user message was appended by this call
    First,
    /// The user message was appended and cached by an earlier call
    Resend,
}

/// Clears the sending flag when the send finishes, however it ends.
struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one send at a time against the shared session store.
pub struct MessageSendOrchestrator {
    store: SharedSessionStore,
    gateway: Arc<dyn RemoteGateway>,
    cache: Arc<dyn MessageCache>,
    gate: Mutex<LocationGate>,
    tools: RwLock<Vec<String>>,
    sending: AtomicBool,
}

impl MessageSendOrchestrator {
    /// Creates an orchestrator.
    ///
    /// # Arguments
    ///
    /// * `store` - Session store shared with the pager and the UI
    /// * `gateway` - Backend the messages are sent to
    /// * `cache` - Local message cache updated on every successful send
    /// * `tools` - Initial tool selection attached to sends
    pub fn new(
        store: SharedSessionStore,
        gateway: Arc<dyn RemoteGateway>,
        cache: Arc<dyn MessageCache>,
        tools: Vec<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            cache,
            gate: Mutex::new(LocationGate::new()),
            tools: RwLock::new(tools),
            sending: AtomicBool::new(false),
        }
    }

    /// False while a send is awaiting its response.
    pub fn can_send(&self) -> bool {
        !self.sending.load(Ordering::Acquire)
    }

    pub async fn tools(&self) -> Vec<String> {
        self.tools.read().await.clone()
    }

    /// Replaces the tool selection used by later sends.
    pub async fn set_tools(&self, tools: Vec<String>) {
        *self.tools.write().await = tools;
    }

    pub async fn location(&self) -> Option<LocationFix> {
        self.gate.lock().await.location()
    }

    pub async fn is_location_pending(&self) -> bool {
        self.gate.lock().await.is_pending()
    }

    /// Text of the send parked for a location, if any.
    pub async fn pending_location_text(&self) -> Option<String> {
        self.gate.lock().await.pending().map(|p| p.text.clone())
    }

    /// Sends `text` as a new user turn.
    ///
    /// Creates the conversation first when none is active. The user message
    /// is in the store before the gateway is called and is removed again if
    /// delivery fails.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, SendError> {
        if text.trim().is_empty() {
            return Err(SendError::new(SendStage::Validation, ConfabError::EmptyMessage));
        }
        let _guard = self.begin_send()?;
        self.send_new(text).await
    }

    /// Records the device location and resumes the parked send, if any.
    ///
    /// The resend reuses the original optimistic message, so it adds exactly
    /// one assistant reply on success and removes that message on failure.
    ///
    /// # Returns
    ///
    /// `None` when nothing was pending; the fix is still kept for later sends.
    pub async fn supply_location(
        &self,
        fix: LocationFix,
    ) -> Result<Option<SendOutcome>, SendError> {
        let _guard = self.begin_send()?;

        let Some(pending) = self.gate.lock().await.supply(fix) else {
            return Ok(None);
        };

        let original = {
            let store = self.store.read().await;
            store
                .messages()
                .iter()
                .find(|m| m.id == pending.message_id)
                .cloned()
        };

        match original {
            Some(user) => {
                tracing::info!("[Send] Resending message {} with location", user.id);
                let tools = self.tools().await;
                self.deliver(user, tools, Attempt::Resend).await.map(Some)
            }
            None => {
                tracing::warn!(
                    "[Send] Held message {} is no longer loaded; sending its text as a new message",
                    pending.message_id
                );
                self.send_new(&pending.text).await.map(Some)
            }
        }
    }

    /// Drops the parked send without resending.
    ///
    /// The optimistic user message stays in history without a reply.
    ///
    /// # Returns
    ///
    /// The text that was held, if any.
    pub async fn decline_location(&self) -> Option<String> {
        self.gate.lock().await.decline().map(|p| p.text)
    }

    fn begin_send(&self) -> Result<SendingGuard<'_>, SendError> {
        self.sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| SendingGuard(&self.sending))
            .map_err(|_| SendError::new(SendStage::Validation, ConfabError::SendInFlight))
    }

    async fn send_new(&self, text: &str) -> Result<SendOutcome, SendError> {
        let tools = self.tools().await;
        let conversation_id = self.ensure_conversation(text, &tools).await?;

        let user = Message::user(&conversation_id, text);
        self.store.write().await.append(user.clone());
        tracing::debug!("[Send] Appended optimistic message {}", user.id);

        self.deliver(user, tools, Attempt::First).await
    }

    async fn ensure_conversation(&self, text: &str, tools: &[String]) -> Result<String, SendError> {
        let active = self
            .store
            .read()
            .await
            .active_conversation_id()
            .map(str::to_string);
        if let Some(id) = active {
            return Ok(id);
        }

        let title = title_from_text(text);
        let conversation = self
            .gateway
            .create_conversation(&title, tools)
            .await
            .map_err(|error| {
                tracing::warn!("[Send] Failed to create conversation: {}", error);
                SendError::new(SendStage::CreateConversation, error)
            })?;

        tracing::info!("[Send] Created conversation {}", conversation.id);
        let id = conversation.id.clone();
        let mut store = self.store.write().await;
        store.activate(id.clone());
        store.set_details(conversation);
        Ok(id)
    }

    async fn deliver(
        &self,
        user: Message,
        tools: Vec<String>,
        attempt: Attempt,
    ) -> Result<SendOutcome, SendError> {
        let request = SendMessageRequest {
            text: user.content.clone(),
            conversation_id: user.conversation_id.clone(),
            tools,
            location: self.location().await,
        };

        let reply = match self.gateway.send_message(&request).await {
            Ok(reply) => reply,
            Err(error) => {
                self.rollback(&user, attempt).await;
                return Err(SendError::new(SendStage::Delivery, error));
            }
        };

        let added = match attempt {
            Attempt::First => 2,
            Attempt::Resend => 1,
        };
        {
            let mut store = self.store.write().await;
            if store.active_conversation_id() == Some(user.conversation_id.as_str()) {
                store.append(reply.clone());
                store.record_exchange(&reply.content, added, reply.created_at);
            } else {
                tracing::debug!(
                    "[Send] Conversation {} is no longer active; reply kept in cache only",
                    user.conversation_id
                );
            }
        }

        let cached = match attempt {
            Attempt::First => vec![user.clone(), reply.clone()],
            Attempt::Resend => vec![reply.clone()],
        };
        if let Err(e) = self.cache.merge(&user.conversation_id, &cached).await {
            tracing::warn!("[Cache] Failed to cache sent messages: {}", e);
        }

        if reply.requires_location() {
            let parked = self
                .gate
                .lock()
                .await
                .request_location(PendingLocationRequest {
                    conversation_id: user.conversation_id.clone(),
                    message_id: user.id.clone(),
                    text: user.content.clone(),
                });
            if parked {
                return Ok(SendOutcome::LocationRequired { user, reply });
            }
        }

        Ok(SendOutcome::Delivered { user, reply })
    }

    async fn rollback(&self, user: &Message, attempt: Attempt) {
        let removed = self.store.write().await.remove(&user.id).is_some();
        tracing::warn!(
            "[Send] Delivery failed; rolled back message {} (present: {})",
            user.id,
            removed
        );

        if attempt == Attempt::Resend
            && let Err(e) = self
                .cache
                .remove_message(&user.conversation_id, &user.id)
                .await
        {
            tracing::warn!("[Cache] Failed to drop rolled back message: {}", e);
        }
    }
}
