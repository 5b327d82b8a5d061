use std::sync::atomic::Ordering;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::*;
use crate::backend::testing::ScriptedBackend;
use crate::models::Role;
use crate::storage::{MockStorage, sqlite::Sqlite};

async fn setup(backend: ScriptedBackend) -> (ChatService, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let storage = Sqlite::new(None).await.expect("failed to open database");
    let chat = ChatService::new(backend.clone(), Arc::new(storage)).with_model("deepseek-r1:1.5b");
    (chat, backend)
}

fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_submit() {
    let (chat, backend) = setup(ScriptedBackend::new(&[
        "<think>",
        "Two plus",
        " two.",
        "</think>",
        "It is",
        " 4.",
    ]))
    .await;

    let thread = chat.ensure_thread(None, None, "What is 2 + 2?").await.unwrap();
    assert_eq!(thread.title(), "What is 2 + 2?");

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let saved = chat
        .submit(thread.id(), "  What is 2 + 2?\n", Arc::new(tx))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(saved.role(), Role::Assistant);
    assert_eq!(saved.content(), "It is 4.");
    assert_eq!(saved.thought(), "Two plus two.");

    {
        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].text(), "What is 2 + 2?");
        assert_eq!(prompts[0].model(), "deepseek-r1:1.5b");
    }

    let messages = chat.storage().get_messages(thread.id()).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].content(), "  What is 2 + 2?\n");
    assert_eq!(messages[0].thought(), "");
    assert_eq!(messages[1], saved);

    let stored = chat.storage().get_thread(thread.id()).await.unwrap().unwrap();
    assert_eq!(stored.updated_at(), saved.created_at());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 7);
    assert!(matches!(&events[0], Event::MessageSaved(m) if m.role() == Role::User));
    assert!(matches!(&events[1], Event::ThoughtDelta(t) if t == "Two plus"));
    assert!(matches!(&events[2], Event::ThoughtDelta(t) if t == " two."));
    assert!(matches!(&events[3], Event::ThinkingDone));
    assert!(matches!(&events[4], Event::ResponseDelta(t) if t == "It is"));
    assert!(matches!(&events[5], Event::ResponseDelta(t) if t == " 4."));
    assert!(matches!(&events[6], Event::MessageSaved(m) if m.id() == saved.id()));
}

#[tokio::test]
async fn test_submit_without_delimiter() {
    let (chat, _) = setup(ScriptedBackend::new(&["Plain", " answer"])).await;
    let thread = chat.ensure_thread(None, Some("Plain"), "hi").await.unwrap();
    assert_eq!(thread.title(), "Plain");

    let (tx, _rx) = mpsc::unbounded_channel::<Event>();
    let saved = chat
        .submit(thread.id(), "hi", Arc::new(tx))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(saved.content(), "");
    assert_eq!(saved.thought(), "Plain answer");
}

#[tokio::test]
async fn test_submit_blank_prompt() {
    let (chat, backend) = setup(ScriptedBackend::new(&["ignored"])).await;
    let thread = chat.ensure_thread(None, None, "").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let saved = chat.submit(thread.id(), " \n\t", Arc::new(tx)).await.unwrap();

    assert!(saved.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());
    assert!(
        chat.storage()
            .get_messages(thread.id())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_submit_backend_failure() {
    let (chat, _) = setup(ScriptedBackend::failing(&["<think>", "half"], "stream reset")).await;
    let thread = chat.ensure_thread(None, None, "hello").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let err = chat
        .submit(thread.id(), "hello", Arc::new(tx))
        .await
        .unwrap_err();
    assert!(format!("{:?}", err).contains("stream reset"));

    // The user turn is kept, no assistant turn is written
    let messages = chat.storage().get_messages(thread.id()).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role(), Role::User);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], Event::ThoughtDelta(t) if t == "half"));
}

#[tokio::test]
async fn test_submit_storage_failure() {
    let backend = Arc::new(ScriptedBackend::new(&["</think>", "never"]));

    let mut storage = MockStorage::new();
    storage
        .expect_append_message()
        .times(1)
        .returning(|_| Err(eyre::eyre!("database is locked")));

    let chat = ChatService::new(backend.clone(), Arc::new(storage));
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let err = chat
        .submit("thread", "hello", Arc::new(tx))
        .await
        .unwrap_err();

    assert!(format!("{:?}", err).contains("database is locked"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_ensure_thread() {
    let (chat, _) = setup(ScriptedBackend::default()).await;

    let created = chat
        .ensure_thread(None, Some("   "), "first line\nsecond line")
        .await
        .unwrap();
    assert_eq!(created.title(), "first line");

    let found = chat
        .ensure_thread(Some(created.id()), Some("ignored"), "ignored")
        .await
        .unwrap();
    assert_eq!(found, created);

    let err = chat
        .ensure_thread(Some("missing"), None, "hello")
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<StorageError>(),
        Some(&StorageError::ThreadNotFound("missing".to_string()))
    );
}

#[tokio::test]
async fn test_ensure_thread_missing_with_mock() {
    let backend = Arc::new(ScriptedBackend::default());
    let mut storage = MockStorage::new();
    storage.expect_get_thread().times(1).returning(|_| Ok(None));
    storage.expect_create_thread().never();

    let chat = ChatService::new(backend, Arc::new(storage));
    let err = chat
        .ensure_thread(Some("gone"), None, "hello")
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<StorageError>(),
        Some(&StorageError::ThreadNotFound("gone".to_string()))
    );
}
