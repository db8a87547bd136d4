//! End-to-end tests: the full engine driving a real HTTP endpoint
//! against a mock SiliconFlow server.
//!
//! Everything here goes through the `rill` umbrella prelude, the same
//! surface an application would import.

use std::time::Duration;

use rill::prelude::*;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn sse(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn delta_chunk(content: &str) -> String {
    serde_json::json!({"choices": [{"delta": {"content": content}}]}).to_string()
}

fn engine_against(server: &MockServer) -> ConversationEngine<SiliconFlow> {
    let endpoint = SiliconFlow::new("test-key").base_url(server.uri());
    let config = EngineConfig {
        streaming: true,
        idle_timeout: Duration::from_secs(2),
    };
    ConversationEngine::new(endpoint, config)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Happy path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn streamed_exchange_accumulates_and_completes() {
    let server = MockServer::start().await;

    let body = sse(&[&delta_chunk("Hi"), &delta_chunk(" there")]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_against(&server);
    let state = engine.submit("Hello").await.unwrap();

    assert_eq!(state, EngineState::Completed);
    let turns = engine.conversation().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "Hello");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "Hi there");
}

#[tokio::test]
async fn second_exchange_carries_history() {
    let server = MockServer::start().await;

    // Mounted first so the partial matcher cannot fall through to the
    // single-message mock, which would also accept this prefix.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "one"},
                {"role": "user", "content": "second"},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[&delta_chunk("two")]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "first"}],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[&delta_chunk("one")]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_against(&server);
    engine.submit("first").await.unwrap();
    engine.submit("second").await.unwrap();

    assert_eq!(engine.conversation().to_exchange_pairs().len(), 2);
}

#[tokio::test]
async fn observers_see_every_delta() {
    let server = MockServer::start().await;

    let body = sse(&[&delta_chunk("a"), &delta_chunk("b"), &delta_chunk("c")]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut engine = engine_against(&server);
    let mut updates = engine.subscribe();
    engine.submit("go").await.unwrap();

    let mut partials = Vec::new();
    while let Ok(update) = updates.try_recv() {
        if update.state == EngineState::Streaming
            && let Some(turn) = update.conversation.last()
            && !turn.content.is_empty()
        {
            partials.push(turn.content.clone());
        }
    }
    assert_eq!(partials, vec!["a", "ab", "abc"]);
}

#[tokio::test]
async fn single_shot_exchange_completes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "whole reply"}}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = SiliconFlow::new("test-key").base_url(server.uri());
    let config = EngineConfig {
        streaming: false,
        idle_timeout: Duration::from_secs(2),
    };
    let mut engine = ConversationEngine::new(endpoint, config);

    let state = engine.submit("go").await.unwrap();
    assert_eq!(state, EngineState::Completed);
    assert_eq!(engine.conversation().last().unwrap().content, "whole reply");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Failure paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn malformed_chunks_do_not_fail_the_exchange() {
    let server = MockServer::start().await;

    let body = format!(
        "data: {}\n\ndata: not json at all\n\ndata: {}\n\ndata: [DONE]\n\n",
        delta_chunk("Hi"),
        delta_chunk("!"),
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut engine = engine_against(&server);
    let state = engine.submit("go").await.unwrap();

    assert_eq!(state, EngineState::Completed);
    assert_eq!(engine.conversation().last().unwrap().content, "Hi!");
}

#[tokio::test]
async fn auth_failure_settles_failed_with_readable_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let mut engine = engine_against(&server);
    let state = engine.submit("go").await.unwrap();

    assert_eq!(state, EngineState::Failed);
    let content = &engine.conversation().last().unwrap().content;
    assert!(content.starts_with("system error:"), "got: {content}");
}

#[tokio::test]
async fn stalled_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&[&delta_chunk("never delivered")]), "text/event-stream")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let endpoint = SiliconFlow::new("test-key").base_url(server.uri());
    let config = EngineConfig {
        streaming: true,
        idle_timeout: Duration::from_millis(200),
    };
    let mut engine = ConversationEngine::new(endpoint, config);

    let state = engine.submit("go").await.unwrap();
    assert_eq!(state, EngineState::Failed);
    let content = &engine.conversation().last().unwrap().content;
    assert!(content.contains("timeout"), "got: {content}");
}

#[tokio::test]
async fn failed_exchange_still_allows_resubmission() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_against(&server);
    assert_eq!(engine.submit("go").await.unwrap(), EngineState::Failed);

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[&delta_chunk("recovered")]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    assert_eq!(engine.submit("again").await.unwrap(), EngineState::Completed);
    assert_eq!(engine.conversation().last().unwrap().content, "recovered");
}
