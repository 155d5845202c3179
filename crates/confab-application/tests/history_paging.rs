mod common;

use chrono::Duration;
use common::{ScriptedGateway, history, ids, server_user, wait_until};
use confab_application::{ChatSession, PageOutcome};
use confab_core::ConfabError;
use confab_core::conversation::{Message, MessageCache, MessageRole};
use confab_infrastructure::InMemoryMessageCache;
use std::sync::Arc;

const PAGE: usize = 10;

fn session(gateway: &Arc<ScriptedGateway>, cache: &Arc<InMemoryMessageCache>) -> ChatSession {
    ChatSession::new(gateway.clone(), cache.clone(), PAGE, Vec::new())
}

#[tokio::test]
async fn test_full_first_page_then_short_page_ends_history() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 15));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);

    let first = session.select_conversation("c-a").await.unwrap();
    assert_eq!(
        first,
        PageOutcome::Applied {
            inserted: PAGE,
            has_more: true
        }
    );

    let second = session.load_more().await.unwrap();
    assert_eq!(
        second,
        PageOutcome::Applied {
            inserted: 5,
            has_more: false
        }
    );

    let third = session.load_more().await.unwrap();
    assert_eq!(third, PageOutcome::Exhausted);
    assert_eq!(gateway.get_count(), 2);

    let messages = session.messages().await;
    assert_eq!(messages.len(), 15);
    assert_eq!(messages.first().unwrap().id, "c-a-h14");
    assert_eq!(messages.last().unwrap().id, "c-a-h0");
    assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn test_short_first_page_disables_load_more() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 3));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);

    session.select_conversation("c-a").await.unwrap();
    let before = session.messages().await;

    for _ in 0..3 {
        assert_eq!(session.load_more().await.unwrap(), PageOutcome::Exhausted);
    }

    assert!(!session.has_more_history().await);
    assert_eq!(session.messages().await, before);
    assert_eq!(gateway.get_count(), 1);
}

fn user_count(messages: &[Message]) -> usize {
    messages.iter().filter(|m| m.role == MessageRole::User).count()
}

#[tokio::test]
async fn test_load_more_after_first_send_fetches_only_older_messages() {
    let gateway = ScriptedGateway::new();
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);
    session.send("Hello").await.unwrap();
    let sent = session.messages().await;

    let mut server = history("c-1", 3);
    server.push(server_user("c-1", "srv-u1", "Hello", sent[0].created_at - Duration::seconds(1)));
    server.push(sent[1].clone());
    gateway.set_history(server);

    let outcome = session.load_more().await.unwrap();

    assert_eq!(
        outcome,
        PageOutcome::Applied {
            inserted: 3,
            has_more: false
        }
    );
    let messages = session.messages().await;
    assert_eq!(messages.len(), 5);
    assert_eq!(user_count(&messages), 1);
    assert_eq!(
        ids(&messages[3..]),
        vec![sent[0].id.clone(), "reply-1".to_string()]
    );
    assert_eq!(messages[3].server_id.as_deref(), Some("srv-u1"));
}

#[tokio::test]
async fn test_offline_reload_shows_sent_message_once() {
    let gateway = ScriptedGateway::new();
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);
    session.send("Hello").await.unwrap();
    let sent = session.messages().await;

    let mut server = history("c-1", 2);
    server.push(server_user("c-1", "srv-u1", "Hello", sent[0].created_at + Duration::seconds(1)));
    server.push(sent[1].clone());
    gateway.set_history(server);
    session.select_conversation("c-1").await.unwrap();
    assert_eq!(user_count(&session.messages().await), 1);

    *gateway.get_error.lock().unwrap() = Some(ConfabError::network("offline"));
    assert!(session.select_conversation("c-1").await.is_err());

    let offline = session.messages().await;
    assert_eq!(offline.len(), 4);
    assert_eq!(user_count(&offline), 1);
    assert_eq!(cache.load("c-1").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_cursor_only_moves_backward() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 35));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);
    session.select_conversation("c-a").await.unwrap();

    let store = session.store();
    let mut previous = store.read().await.cursor().oldest().unwrap();
    while session.has_more_history().await {
        session.load_more().await.unwrap();
        if let Some(oldest) = store.read().await.cursor().oldest() {
            assert!(oldest <= previous);
            previous = oldest;
        }
    }

    assert_eq!(session.messages().await.len(), 35);
}

#[tokio::test]
async fn test_load_more_while_in_flight_is_noop() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 25));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = Arc::new(session(&gateway, &cache));
    session.select_conversation("c-a").await.unwrap();

    let release = gateway.hold_fetches();
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.load_more().await }
    });
    wait_until(|| gateway.get_count() == 2).await;

    assert!(session.pager().is_loading().await);
    assert_eq!(session.load_more().await.unwrap(), PageOutcome::InFlight);
    assert_eq!(session.load_more().await.unwrap(), PageOutcome::InFlight);

    release.add_permits(1);
    let applied = pending.await.unwrap().unwrap();

    assert_eq!(
        applied,
        PageOutcome::Applied {
            inserted: PAGE,
            has_more: true
        }
    );
    assert_eq!(gateway.get_count(), 2);
    assert!(!session.pager().is_loading().await);
}

#[tokio::test]
async fn test_page_arriving_after_switch_is_discarded() {
    let gateway = ScriptedGateway::new();
    let mut server = history("c-a", 25);
    server.extend(history("c-b", 4));
    gateway.set_history(server);
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = Arc::new(session(&gateway, &cache));
    session.select_conversation("c-a").await.unwrap();

    let release = gateway.hold_fetches();
    let stale = tokio::spawn({
        let session = session.clone();
        async move { session.load_more().await }
    });
    wait_until(|| gateway.get_count() == 2).await;

    *gateway.fetch_gate.lock().unwrap() = None;
    session.select_conversation("c-b").await.unwrap();

    release.add_permits(1);
    assert_eq!(stale.await.unwrap().unwrap(), PageOutcome::Stale);

    let messages = session.messages().await;
    assert_eq!(messages.len(), 4);
    assert!(messages.iter().all(|m| m.conversation_id == "c-b"));
    assert!(!session.has_more_history().await);
}

#[tokio::test]
async fn test_start_new_discards_page_in_flight() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 25));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = Arc::new(session(&gateway, &cache));
    session.select_conversation("c-a").await.unwrap();

    let release = gateway.hold_fetches();
    let stale = tokio::spawn({
        let session = session.clone();
        async move { session.load_more().await }
    });
    wait_until(|| gateway.get_count() == 2).await;

    session.start_new().await;
    release.add_permits(1);

    assert_eq!(stale.await.unwrap().unwrap(), PageOutcome::Stale);
    assert!(session.messages().await.is_empty());
    assert!(session.active_conversation_id().await.is_none());
}

#[tokio::test]
async fn test_failed_first_page_keeps_cached_history() {
    let gateway = ScriptedGateway::new();
    *gateway.get_error.lock().unwrap() = Some(ConfabError::network("offline"));
    let cache = Arc::new(InMemoryMessageCache::new());
    cache.merge("c-a", &history("c-a", 3)).await.unwrap();
    let session = session(&gateway, &cache);

    let err = session.select_conversation("c-a").await.unwrap_err();

    assert!(matches!(err, ConfabError::Network(_)));
    assert_eq!(
        ids(&session.messages().await),
        vec!["c-a-h2", "c-a-h1", "c-a-h0"]
    );
    assert!(!session.pager().is_loading().await);
}

#[tokio::test]
async fn test_failed_older_page_leaves_history_and_allows_retry() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 15));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);
    session.select_conversation("c-a").await.unwrap();
    let before = session.messages().await;

    *gateway.get_error.lock().unwrap() = Some(ConfabError::server("overloaded"));
    assert!(session.load_more().await.is_err());
    assert_eq!(session.messages().await, before);
    assert!(session.has_more_history().await);

    *gateway.get_error.lock().unwrap() = None;
    assert!(matches!(
        session.load_more().await.unwrap(),
        PageOutcome::Applied { inserted: 5, .. }
    ));
}

#[tokio::test]
async fn test_pages_are_written_to_cache() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 12));
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);

    session.select_conversation("c-a").await.unwrap();
    session.load_more().await.unwrap();

    assert_eq!(cache.load("c-a").await.unwrap().len(), 12);
}

#[tokio::test]
async fn test_load_more_without_conversation_is_precondition_error() {
    let gateway = ScriptedGateway::new();
    let cache = Arc::new(InMemoryMessageCache::new());
    let session = session(&gateway, &cache);

    let err = session.load_more().await.unwrap_err();

    assert_eq!(err, ConfabError::NoActiveConversation);
    assert_eq!(gateway.get_count(), 0);
}
