//! Chat session use case.
//!
//! Composes the send orchestrator and the history pager over one shared
//! `SessionStore` and adds conversation selection, listing and deletion.

use crate::pager::{HistoryPager, PageOutcome};
use crate::send::{MessageSendOrchestrator, SendError, SendOutcome};
use confab_core::conversation::{Conversation, Message, MessageCache};
use confab_core::session::{SessionStore, SharedSessionStore};
use confab_core::{LocationFix, RemoteGateway, Result};
use confab_infrastructure::ClientConfig;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The conversation surface used by the presentation layer.
///
/// # Thread Safety
///
/// Every component shares the same `SharedSessionStore`; no lock on it is
/// held across a gateway call.
pub struct ChatSession {
    store: SharedSessionStore,
    gateway: Arc<dyn RemoteGateway>,
    cache: Arc<dyn MessageCache>,
    orchestrator: MessageSendOrchestrator,
    pager: HistoryPager,
    known_conversations: RwLock<Vec<Conversation>>,
}

impl ChatSession {
    /// Creates a session with no active conversation.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Backend used by every component
    /// * `cache` - Local message cache
    /// * `page_size` - Messages per history page
    /// * `tools` - Initial tool selection for sends
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        cache: Arc<dyn MessageCache>,
        page_size: usize,
        tools: Vec<String>,
    ) -> Self {
        let store = SessionStore::shared();
        Self {
            orchestrator: MessageSendOrchestrator::new(
                store.clone(),
                gateway.clone(),
                cache.clone(),
                tools,
            ),
            pager: HistoryPager::new(store.clone(), gateway.clone(), cache.clone(), page_size),
            store,
            gateway,
            cache,
            known_conversations: RwLock::new(Vec::new()),
        }
    }

    /// Creates a session using the page size and default tools of `config`.
    pub fn from_config(
        config: &ClientConfig,
        gateway: Arc<dyn RemoteGateway>,
        cache: Arc<dyn MessageCache>,
    ) -> Self {
        Self::new(
            gateway,
            cache,
            config.page_size,
            config.default_tools.clone(),
        )
    }

    pub fn store(&self) -> SharedSessionStore {
        self.store.clone()
    }

    pub fn orchestrator(&self) -> &MessageSendOrchestrator {
        &self.orchestrator
    }

    pub fn pager(&self) -> &HistoryPager {
        &self.pager
    }

    pub fn can_send(&self) -> bool {
        self.orchestrator.can_send()
    }

    pub async fn send(&self, text: &str) -> std::result::Result<SendOutcome, SendError> {
        self.orchestrator.send(text).await
    }

    pub async fn supply_location(
        &self,
        fix: LocationFix,
    ) -> std::result::Result<Option<SendOutcome>, SendError> {
        self.orchestrator.supply_location(fix).await
    }

    pub async fn decline_location(&self) -> Option<String> {
        self.orchestrator.decline_location().await
    }

    pub async fn load_more(&self) -> Result<PageOutcome> {
        self.pager.load_more().await
    }

    /// Snapshot of the loaded messages, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.store.read().await.messages().to_vec()
    }

    pub async fn active_conversation_id(&self) -> Option<String> {
        self.store
            .read()
            .await
            .active_conversation_id()
            .map(str::to_string)
    }

    /// Details of the active conversation, when known.
    pub async fn active_conversation(&self) -> Option<Conversation> {
        self.store.read().await.conversation().cloned()
    }

    pub async fn has_more_history(&self) -> bool {
        self.store.read().await.cursor().has_more()
    }

    /// Lists the user's conversations, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let mut conversations = self.gateway.list_conversations().await?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        *self.known_conversations.write().await = conversations.clone();
        Ok(conversations)
    }

    /// Makes `conversation_id` active and loads its newest page.
    ///
    /// A send parked for a location in the previous conversation is dropped.
    pub async fn select_conversation(&self, conversation_id: &str) -> Result<PageOutcome> {
        self.drop_pending_location().await;

        let outcome = self.pager.load_initial(conversation_id).await;

        let details = self
            .known_conversations
            .read()
            .await
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned();
        if let Some(details) = details {
            self.store.write().await.set_details(details);
        }

        tracing::info!("[Session] Selected conversation {}", conversation_id);
        outcome
    }

    /// Leaves the active conversation; the next send creates a new one.
    pub async fn start_new(&self) {
        self.drop_pending_location().await;
        self.store.write().await.clear();
        tracing::info!("[Session] Started a new conversation");
    }

    /// Deletes a conversation with all its messages.
    ///
    /// Deleting the active conversation leaves the session without one.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.gateway.delete_conversation(conversation_id).await?;

        if let Err(e) = self.cache.remove_conversation(conversation_id).await {
            tracing::warn!("[Cache] Failed to drop cached conversation: {}", e);
        }
        self.known_conversations
            .write()
            .await
            .retain(|c| c.id != conversation_id);

        let was_active = self.store.read().await.active_conversation_id() == Some(conversation_id);
        if was_active {
            self.drop_pending_location().await;
            self.store.write().await.clear();
        }

        tracing::info!("[Session] Deleted conversation {}", conversation_id);
        Ok(())
    }

    async fn drop_pending_location(&self) {
        if let Some(text) = self.orchestrator.decline_location().await {
            tracing::debug!(
                "[Session] Dropped send waiting for location ({} chars)",
                text.chars().count()
            );
        }
    }
}
