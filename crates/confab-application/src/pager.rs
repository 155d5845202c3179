//! Backward history pagination for the active conversation.

use confab_core::conversation::{Message, MessageCache};
use confab_core::session::SharedSessionStore;
use confab_core::{ConfabError, RemoteGateway, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Epoch value meaning "no fetch in flight". Real epochs start at 1.
const IDLE: u64 = 0;

/// What a page request did to the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was applied.
    Applied { inserted: usize, has_more: bool },
    /// Nothing older exists; no fetch was made.
    Exhausted,
    /// A fetch for this conversation is already running; no fetch was made.
    InFlight,
    /// The active conversation changed while fetching; the page was dropped.
    Stale,
}

/// Clears the in-flight marker unless a newer load session replaced it.
struct InFlightGuard<'a> {
    slot: &'a AtomicU64,
    epoch: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.epoch, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// Loads the newest page of a conversation and then older pages on demand.
///
/// Results are applied only while the load session they were started in is
/// still current, so a page for a conversation the user already left is
/// discarded on arrival.
pub struct HistoryPager {
    store: SharedSessionStore,
    gateway: Arc<dyn RemoteGateway>,
    cache: Arc<dyn MessageCache>,
    page_size: usize,
    in_flight_epoch: AtomicU64,
}

impl HistoryPager {
    pub fn new(
        store: SharedSessionStore,
        gateway: Arc<dyn RemoteGateway>,
        cache: Arc<dyn MessageCache>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            cache,
            page_size: page_size.max(1),
            in_flight_epoch: AtomicU64::new(IDLE),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether a fetch for the current load session is running.
    pub async fn is_loading(&self) -> bool {
        let epoch = self.store.read().await.epoch();
        self.in_flight_epoch.load(Ordering::Acquire) == epoch
    }

    /// Activates `conversation_id` and loads its newest page.
    ///
    /// Cached messages are shown first; the remote page then replaces them.
    /// On failure the cached history stays visible.
    pub async fn load_initial(&self, conversation_id: &str) -> Result<PageOutcome> {
        let epoch = self.store.write().await.activate(conversation_id);
        tracing::debug!("[Pager] Loading {} (epoch {})", conversation_id, epoch);

        self.seed_from_cache(conversation_id, epoch).await;

        let _guard = self.mark_in_flight(epoch);
        let page = self
            .gateway
            .get_messages(conversation_id, None, self.page_size)
            .await?;

        let outcome = {
            let mut store = self.store.write().await;
            if store.epoch() != epoch {
                tracing::debug!("[Pager] Discarding first page of {}: session changed", conversation_id);
                return Ok(PageOutcome::Stale);
            }

            let returned = page.len();
            let oldest = oldest_of(&page);
            store.replace_messages(page.clone());
            store.cursor_mut().advance(oldest, returned, self.page_size);
            PageOutcome::Applied {
                inserted: returned,
                has_more: store.cursor().has_more(),
            }
        };

        self.write_cache(conversation_id, &page).await;
        Ok(outcome)
    }

    /// Loads the page older than the oldest loaded message.
    ///
    /// A no-op while a fetch for the same conversation is running or once the
    /// history is exhausted.
    pub async fn load_more(&self) -> Result<PageOutcome> {
        let (conversation_id, epoch, before) = {
            let store = self.store.read().await;
            let Some(id) = store.active_conversation_id() else {
                return Err(ConfabError::NoActiveConversation);
            };
            if !store.cursor().has_more() {
                return Ok(PageOutcome::Exhausted);
            }
            // Messages sent before any page was fetched bound the first
            // older page.
            let before = store.cursor().oldest().or_else(|| store.oldest_loaded());
            (id.to_string(), store.epoch(), before)
        };

        if self.in_flight_epoch.swap(epoch, Ordering::AcqRel) == epoch {
            tracing::debug!("[Pager] Fetch already in flight for {}", conversation_id);
            return Ok(PageOutcome::InFlight);
        }
        let _guard = InFlightGuard {
            slot: &self.in_flight_epoch,
            epoch,
        };

        let page = self
            .gateway
            .get_messages(&conversation_id, before, self.page_size)
            .await?;

        let outcome = {
            let mut store = self.store.write().await;
            if store.epoch() != epoch {
                tracing::debug!(
                    "[Pager] Discarding older page of {}: session changed",
                    conversation_id
                );
                return Ok(PageOutcome::Stale);
            }

            let returned = page.len();
            let oldest = oldest_of(&page);
            let inserted = store.prepend_older(page.clone());
            store.cursor_mut().advance(oldest, returned, self.page_size);
            PageOutcome::Applied {
                inserted,
                has_more: store.cursor().has_more(),
            }
        };

        tracing::debug!("[Pager] {:?} for {}", outcome, conversation_id);
        self.write_cache(&conversation_id, &page).await;
        Ok(outcome)
    }

    fn mark_in_flight(&self, epoch: u64) -> InFlightGuard<'_> {
        self.in_flight_epoch.store(epoch, Ordering::Release);
        InFlightGuard {
            slot: &self.in_flight_epoch,
            epoch,
        }
    }

    async fn seed_from_cache(&self, conversation_id: &str, epoch: u64) {
        let cached = match self.cache.load(conversation_id).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("[Cache] Failed to read cached messages: {}", e);
                return;
            }
        };
        if cached.is_empty() {
            return;
        }

        let mut store = self.store.write().await;
        if store.epoch() == epoch && store.is_empty() {
            tracing::debug!("[Pager] Seeded {} cached messages", cached.len());
            store.replace_messages(cached);
        }
    }

    async fn write_cache(&self, conversation_id: &str, page: &[Message]) {
        if page.is_empty() {
            return;
        }
        if let Err(e) = self.cache.merge(conversation_id, page).await {
            tracing::warn!("[Cache] Failed to cache page: {}", e);
        }
    }
}

fn oldest_of(page: &[Message]) -> Option<chrono::DateTime<chrono::Utc>> {
    page.iter().map(|m| m.created_at).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_keeps_newer_epoch() {
        let slot = AtomicU64::new(IDLE);
        {
            let _old = InFlightGuard { slot: &slot, epoch: 1 };
            slot.store(2, Ordering::Release);
        }
        assert_eq!(slot.load(Ordering::Acquire), 2);

        {
            let _current = InFlightGuard { slot: &slot, epoch: 2 };
        }
        assert_eq!(slot.load(Ordering::Acquire), IDLE);
    }
}
