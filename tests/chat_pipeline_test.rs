//! End-to-end tests for the chat orchestrator with in-memory collaborators.

mod common;

use acme_assist::retrieval::{RetrievedDocument, SIMILARITY_THRESHOLD, TOP_K};
use acme_assist::{AppError, ChatMessage, Role};
use common::{harness, product, FakeCompletion, FakeRepository, FakeStore};
use std::sync::atomic::Ordering;

fn headphone_docs() -> Vec<RetrievedDocument> {
    vec![
        RetrievedDocument::named("HP-100", "Over-ear, 30h battery"),
        RetrievedDocument::named("HP-200", "In-ear, noise cancelling"),
    ]
}

fn question() -> Vec<ChatMessage> {
    vec![ChatMessage::user("Tell me about wireless headphones")]
}

#[tokio::test]
async fn test_generic_question_builds_one_system_message() {
    let h = harness(
        FakeStore {
            documents: headphone_docs(),
            ..Default::default()
        },
        FakeRepository::default(),
        FakeCompletion::answering(&["Try the HP-100."]),
        &[],
    );

    let answers = h.service.chat(Some(&question()), None).await.unwrap();
    assert_eq!(answers, vec!["Try the HP-100."]);

    let prompt = h.completion.last_prompt();
    assert_eq!(prompt.len(), 2);
    assert_eq!(prompt[0].role, Role::System);
    assert!(prompt[0].content.starts_with("GENERIC"));
    assert!(prompt[0].content.contains(
        "Product Name: HP-100\nText: Over-ear, 30h battery\n\nProduct Name: HP-200\nText: In-ear, noise cancelling\n"
    ));
    assert_eq!(prompt[1], question()[0]);
    assert_eq!(h.completion.call_count(), 1);
}

#[tokio::test]
async fn test_retrieval_uses_last_message_and_fixed_policy() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["ok"]),
        &[],
    );

    let conversation = vec![
        ChatMessage::user("hi"),
        ChatMessage::assistant("hello, how can I help?"),
        ChatMessage::user("Do you sell tents?"),
    ];
    h.service.chat(Some(&conversation), None).await.unwrap();

    let requests = h.store.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, "Do you sell tents?");
    assert_eq!(requests[0].top_k, TOP_K);
    assert_eq!(requests[0].similarity_threshold, SIMILARITY_THRESHOLD);
    drop(requests);

    // Conversation is forwarded in order after the system message, roles kept.
    let prompt = h.completion.last_prompt();
    assert_eq!(prompt.len(), 4);
    assert_eq!(&prompt[1..], conversation.as_slice());
}

#[tokio::test]
async fn test_product_question_uses_product_template() {
    let h = harness(
        FakeStore {
            documents: headphone_docs(),
            ..Default::default()
        },
        FakeRepository {
            products: vec![product("p-100", "HP-100", &["audio", "wireless"])],
            ..Default::default()
        },
        FakeCompletion::answering(&["It lasts 30 hours."]),
        &[],
    );

    h.service
        .chat(Some(&question()), Some("p-100"))
        .await
        .unwrap();

    let system = &h.completion.last_prompt()[0];
    assert_eq!(system.role, Role::System);
    assert_eq!(
        system.content,
        "PRODUCT\nname=HP-100\ntags=audio,wireless\nshort=HP-100 short\nfull=HP-100 full\ncontext:\n\
         Product Name: HP-100\nText: Over-ear, 30h battery\n\nProduct Name: HP-200\nText: In-ear, noise cancelling\n"
    );
}

#[tokio::test]
async fn test_unknown_product_falls_back_to_generic_prompt() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["ok"]),
        &[],
    );

    h.service
        .chat(Some(&question()), Some("missing"))
        .await
        .unwrap();

    assert_eq!(h.repository.lookups.load(Ordering::SeqCst), 1);
    assert!(h.completion.last_prompt()[0].content.starts_with("GENERIC"));
}

#[tokio::test]
async fn test_blank_product_id_skips_lookup() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["ok"]),
        &[],
    );

    h.service.chat(Some(&question()), Some("  ")).await.unwrap();

    assert_eq!(h.repository.lookups.load(Ordering::SeqCst), 0);
    assert!(h.completion.last_prompt()[0].content.starts_with("GENERIC"));
}

#[tokio::test]
async fn test_empty_conversation_makes_no_external_calls() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["unused"]),
        &["http://tools/orders"],
    );

    for messages in [None, Some(Vec::<ChatMessage>::new())] {
        let result = h.service.chat(messages.as_deref(), Some("p-1")).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    assert!(h.store.requests.lock().unwrap().is_empty());
    assert_eq!(h.repository.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(h.completion.call_count(), 0);
    assert_eq!(h.counters.opened(), 0);
}

#[tokio::test]
async fn test_conversation_must_start_with_user() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["unused"]),
        &[],
    );

    let conversation = vec![ChatMessage::assistant("hi"), ChatMessage::user("ok")];
    match h.service.chat(Some(&conversation), None).await {
        Err(AppError::ValidationError(msg)) => {
            assert_eq!(msg, "The first message should be in user role.")
        }
        other => panic!("expected validation error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(h.completion.call_count(), 0);
}

#[tokio::test]
async fn test_answers_are_annotated_and_blank_answers_dropped() {
    let h = harness(
        FakeStore::default(),
        FakeRepository {
            products: vec![
                product("1", "Widget A", &[]),
                product("2", "Widget", &[]),
                product("3", "Tent", &[]),
            ],
            ..Default::default()
        },
        FakeCompletion::answering(&["I love Widget A", "  ", "", "Pack the Tent"]),
        &[],
    );

    let answers = h.service.chat(Some(&question()), None).await.unwrap();
    assert_eq!(
        answers,
        vec!["I love {{{{Widget|2}} A|1}}", "Pack the {{Tent|3}}"]
    );
}

#[tokio::test]
async fn test_tools_are_offered_and_released_after_success() {
    let mut completion = FakeCompletion::answering(&["Order shipped"]);
    completion.call_tool = Some("orders".into());

    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        completion,
        &["http://tools/orders", "http://tools/inventory"],
    );

    h.service.chat(Some(&question()), None).await.unwrap();

    assert_eq!(
        *h.completion.offered_tools.lock().unwrap(),
        vec!["orders", "inventory"]
    );
    assert_eq!(
        *h.completion.tool_results.lock().unwrap(),
        vec![r#"orders -> {"sku":"HP-100"}"#]
    );
    assert_eq!(h.counters.opened(), 2);
    assert_eq!(h.counters.closed(), 2);
}

#[tokio::test]
async fn test_tools_are_released_when_completion_fails() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::failing(),
        &["http://tools/orders", "http://tools/inventory"],
    );

    let result = h.service.chat(Some(&question()), None).await;

    assert!(matches!(result, Err(AppError::Completion(_))));
    assert_eq!(h.counters.opened(), 2);
    assert_eq!(h.counters.closed(), 2);
}

#[tokio::test]
async fn test_failed_endpoint_fails_request_and_releases_opened_tools() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["unused"]),
        &["http://tools/orders", "http://broken/inventory", "http://tools/stock"],
    );

    let result = h.service.chat(Some(&question()), None).await;

    assert!(matches!(result, Err(AppError::ToolEndpoint(_))));
    assert_eq!(h.completion.call_count(), 0);
    assert_eq!(h.counters.opened(), 1);
    assert_eq!(h.counters.closed(), 1);
}

#[tokio::test]
async fn test_retrieval_failure_propagates_before_tools_open() {
    let h = harness(
        FakeStore {
            fail: true,
            ..Default::default()
        },
        FakeRepository::default(),
        FakeCompletion::answering(&["unused"]),
        &["http://tools/orders"],
    );

    let result = h.service.chat(Some(&question()), None).await;

    assert!(matches!(result, Err(AppError::Retrieval(_))));
    assert_eq!(h.counters.opened(), 0);
    assert_eq!(h.completion.call_count(), 0);
}

#[tokio::test]
async fn test_repeated_requests_do_not_leak_sessions() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::answering(&["ok"]),
        &["http://tools/orders"],
    );

    for _ in 0..5 {
        h.service.chat(Some(&question()), None).await.unwrap();
    }

    assert_eq!(h.counters.opened(), 5);
    assert_eq!(h.counters.closed(), 5);
}

#[tokio::test]
async fn test_cancelled_request_releases_tool_sessions() {
    let h = harness(
        FakeStore::default(),
        FakeRepository::default(),
        FakeCompletion::stalling(),
        &["http://tools/orders", "http://tools/inventory"],
    );

    let conversation = question();
    {
        let request = h.service.chat(Some(&conversation), None);
        tokio::pin!(request);

        // Client disconnects while the model is still working.
        tokio::select! {
            _ = &mut request => panic!("stalled completion returned"),
            _ = h.completion.entered.notified() => {}
        }

        assert_eq!(h.counters.opened(), 2);
        assert_eq!(h.counters.closed(), 0);
    }

    assert_eq!(h.completion.call_count(), 1);
    assert_eq!(h.counters.closed(), 2);
}
