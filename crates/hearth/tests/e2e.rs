// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the chat pipeline.
//!
//! Each test builds an isolated TestHarness with an encrypted temp database
//! and a scripted backend. Tests are independent and order-insensitive.

use std::time::Duration;

use hearth_chat::SendRequest;
use hearth_core::{ErrorKind, HearthError, Role};
use hearth_test_utils::{StreamMode, TEST_MODEL, TestHarness};
use tokio_util::sync::CancellationToken;

// ---- Message pipeline ----

#[tokio::test]
async fn pipeline_persists_user_and_assistant_messages() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec!["Hello from Hearth!".to_string()])
        .build()
        .await
        .unwrap();

    let turn = harness.send_message("Hi there").await.unwrap();
    assert_eq!(turn.assistant_message.content, "Hello from Hearth!");

    let conversations = harness.store.list_conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);

    let messages = harness.messages(&turn.conversation_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hi there");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hello from Hearth!");
}

#[tokio::test]
async fn tokens_stream_in_order_and_end_with_done() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec!["one two three".to_string()])
        .build()
        .await
        .unwrap();

    let turn = harness.send_message("count").await.unwrap();
    let tokens = harness.sink.tokens(&turn.conversation_id);

    let text: String = tokens.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(text, "one two three");
    let last = tokens.last().unwrap();
    assert!(last.done);
    assert!(last.content.is_empty());
    assert_eq!(tokens.iter().filter(|t| t.done).count(), 1);
}

#[tokio::test]
async fn follow_up_turns_carry_the_whole_history() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec!["first reply".to_string(), "second reply".to_string()])
        .build()
        .await
        .unwrap();

    let first = harness.send_message("first question").await.unwrap();
    let second = harness
        .send_to(&first.conversation_id, "second question")
        .await
        .unwrap();
    assert_eq!(first.conversation_id, second.conversation_id);

    let messages = harness.messages(&first.conversation_id).await.unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        ["first question", "first reply", "second question", "second reply"]
    );

    let requests = harness.backend.requests().await;
    let last = requests.last().unwrap();
    assert_eq!(last.model, TEST_MODEL);
    assert_eq!(last.messages.len(), 3);
    assert_eq!(last.messages[2].content, "second question");
}

#[tokio::test]
async fn new_conversation_is_titled_from_the_first_message() {
    let harness = TestHarness::builder().build().await.unwrap();
    let turn = harness.send_message("Plan a trip to Lisbon").await.unwrap();

    let conversation = harness
        .store
        .get_conversation(&turn.conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert!(conversation.title.starts_with("Plan a trip"));
    assert_eq!(conversation.model, TEST_MODEL);
}

// ---- Memory ----

#[tokio::test]
async fn extracted_facts_are_stored_once() {
    let harness = TestHarness::builder()
        .with_memory()
        .with_mock_replies(vec!["Nice to meet you, Sam.".to_string()])
        .build()
        .await
        .unwrap();
    harness
        .backend
        .add_extraction(r#"["User's name is Sam", "user's name is sam", "User lives in Oslo"]"#)
        .await;

    let turn = harness.send_message("I'm Sam and I live in Oslo").await.unwrap();
    harness.settle().await;

    let facts: Vec<_> = harness
        .store
        .list_facts()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.unwrap())
        .collect();
    assert_eq!(facts.len(), 2);
    assert!(
        facts
            .iter()
            .all(|f| f.source_message_id.as_deref() == Some(turn.assistant_message.id.as_str()))
    );
}

#[tokio::test]
async fn remembered_facts_reach_the_system_message() {
    let harness = TestHarness::builder()
        .with_memory()
        .with_system_prompt("Be brief.")
        .build()
        .await
        .unwrap();
    harness.store.add_fact("User's name is Sam", None).await.unwrap();

    harness.send_message("What is my name?").await.unwrap();

    let requests = harness.backend.requests().await;
    let streamed = requests
        .iter()
        .find(|r| r.messages.iter().any(|m| m.content == "What is my name?"))
        .unwrap();
    let system = &streamed.messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.starts_with("Be brief."));
    assert!(system.content.contains("- User's name is Sam"));
}

#[tokio::test]
async fn memory_disabled_sends_no_fact_block() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.store.add_fact("User's name is Sam", None).await.unwrap();

    harness.send_message("hello").await.unwrap();

    let requests = harness.backend.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].messages.iter().all(|m| m.role != Role::System));
}

// ---- Failure paths ----

#[tokio::test]
async fn cancelled_turn_persists_only_the_user_message() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec!["this never finishes".to_string()])
        .build()
        .await
        .unwrap();
    harness.backend.set_mode(StreamMode::Hang).await;

    let conversation = harness
        .store
        .create_conversation("hang", TEST_MODEL)
        .await
        .unwrap();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let err = harness
        .chat
        .send_message(SendRequest {
            conversation_id: Some(conversation.id.clone()),
            text: "go".to_string(),
            model: TEST_MODEL.to_string(),
            cancel,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HearthError::Cancelled));

    let messages = harness.messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);

    let tokens = harness.sink.tokens(&conversation.id);
    assert!(tokens.last().unwrap().done);

    // The slot is released, so the conversation accepts another turn.
    harness.backend.set_mode(StreamMode::Complete).await;
    harness.send_to(&conversation.id, "again").await.unwrap();
}

#[tokio::test]
async fn unavailable_engine_surfaces_a_typed_error() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.backend.set_mode(StreamMode::Unavailable).await;

    let err = harness.send_message("anyone there?").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    assert!(err.is_retryable());

    let conversations = harness.store.list_conversations().await.unwrap();
    let id = &conversations[0].as_ref().unwrap().id;
    assert!(harness.sink.tokens(id).last().unwrap().done);
}

#[tokio::test]
async fn unknown_conversation_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    let err = harness.send_to("no-such-id", "hello").await.unwrap_err();
    assert!(matches!(err, HearthError::Validation(_)));
    assert!(harness.backend.requests().await.is_empty());
}
