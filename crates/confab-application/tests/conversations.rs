mod common;

use common::{ScriptedGateway, conversation, history, location_prompt};
use confab_application::ChatSession;
use confab_core::LocationFix;
use confab_core::conversation::MessageCache;
use confab_infrastructure::{ClientConfig, InMemoryMessageCache, TomlMessageCache};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_list_is_sorted_by_last_update() {
    let gateway = ScriptedGateway::new();
    let mut older = conversation("c-old");
    older.updated_at -= chrono::Duration::days(1);
    let newer = conversation("c-new");
    *gateway.conversations.lock().unwrap() = vec![older, newer];
    let session = ChatSession::new(gateway.clone(), Arc::new(InMemoryMessageCache::new()), 10, Vec::new());

    let listed = session.list_conversations().await.unwrap();

    let order: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, vec!["c-new", "c-old"]);
}

#[tokio::test]
async fn test_select_uses_listed_details() {
    let gateway = ScriptedGateway::new();
    *gateway.conversations.lock().unwrap() = vec![conversation("c-a")];
    gateway.set_history(history("c-a", 2));
    let session = ChatSession::new(gateway.clone(), Arc::new(InMemoryMessageCache::new()), 10, Vec::new());
    session.list_conversations().await.unwrap();

    session.select_conversation("c-a").await.unwrap();

    let details = session.active_conversation().await.unwrap();
    assert_eq!(details.title, "Conversation c-a");
    assert_eq!(session.messages().await.len(), 2);
}

#[tokio::test]
async fn test_send_into_selected_conversation_does_not_create_one() {
    let gateway = ScriptedGateway::new();
    gateway.set_history(history("c-a", 2));
    let session = ChatSession::new(gateway.clone(), Arc::new(InMemoryMessageCache::new()), 10, Vec::new());
    session.select_conversation("c-a").await.unwrap();

    session.send("Follow-up").await.unwrap();

    assert!(gateway.created.lock().unwrap().is_empty());
    assert_eq!(gateway.last_sent().conversation_id, "c-a");
    assert_eq!(session.messages().await.len(), 4);
}

#[tokio::test]
async fn test_start_new_makes_next_send_create_a_conversation() {
    let gateway = ScriptedGateway::new();
    let session = ChatSession::new(gateway.clone(), Arc::new(InMemoryMessageCache::new()), 10, Vec::new());
    session.send("First topic").await.unwrap();

    session.start_new().await;
    assert!(session.messages().await.is_empty());
    session.send("Second topic").await.unwrap();

    let titles: Vec<String> = gateway
        .created
        .lock()
        .unwrap()
        .iter()
        .map(|(title, _)| title.clone())
        .collect();
    assert_eq!(titles, vec!["First topic", "Second topic"]);
    assert_eq!(session.active_conversation_id().await.as_deref(), Some("c-2"));
}

#[tokio::test]
async fn test_switching_conversation_drops_pending_location_request() {
    let gateway = ScriptedGateway::new();
    gateway.push_reply(Ok(location_prompt("c-1", "prompt-1")));
    let session = ChatSession::new(gateway.clone(), Arc::new(InMemoryMessageCache::new()), 10, Vec::new());
    session.send("Weather here?").await.unwrap();

    session.start_new().await;

    assert!(!session.orchestrator().is_location_pending().await);
    let fix = LocationFix::new(1.0, 2.0, 3.0).unwrap();
    assert!(session.supply_location(fix).await.unwrap().is_none());
    assert_eq!(gateway.sent_count(), 1);
}

#[tokio::test]
async fn test_deleting_active_conversation_clears_session_and_cache() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new();
    let cache = Arc::new(TomlMessageCache::new(dir.path().to_path_buf()));
    let session = ChatSession::new(gateway.clone(), cache.clone(), 10, Vec::new());
    session.send("Short-lived").await.unwrap();
    assert_eq!(cache.load("c-1").await.unwrap().len(), 2);

    session.delete_conversation("c-1").await.unwrap();

    assert_eq!(gateway.deleted.lock().unwrap().clone(), vec!["c-1"]);
    assert!(session.active_conversation_id().await.is_none());
    assert!(session.messages().await.is_empty());
    assert!(cache.load("c-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_other_conversation_keeps_active_one() {
    let gateway = ScriptedGateway::new();
    let session = ChatSession::new(gateway.clone(), Arc::new(InMemoryMessageCache::new()), 10, Vec::new());
    session.send("Keep me").await.unwrap();

    session.delete_conversation("c-other").await.unwrap();

    assert_eq!(session.active_conversation_id().await.as_deref(), Some("c-1"));
    assert_eq!(session.messages().await.len(), 2);
}

#[tokio::test]
async fn test_from_config_uses_page_size_and_default_tools() {
    let gateway = ScriptedGateway::new();
    let config = ClientConfig {
        page_size: 7,
        default_tools: vec!["search".to_string()],
        ..ClientConfig::default()
    };
    let session = ChatSession::from_config(&config, gateway.clone(), Arc::new(InMemoryMessageCache::new()));

    session.send("Find it").await.unwrap();

    assert_eq!(session.pager().page_size(), 7);
    assert_eq!(gateway.last_sent().tools, vec!["search".to_string()]);
}
