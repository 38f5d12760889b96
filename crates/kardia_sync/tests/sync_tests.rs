//! Integration tests for reconciliation and the one-shot call.
//!
//! Reconciliation runs against a real store with the in-memory adapter; the
//! convergence contract runs against a recording mock HTTP server, so the
//! "no network call on validation failure" property is actually observed.

use kardia_core::state::{LimbicState, Posture};
use kardia_core::KardiaError;
use kardia_store::{LimbicStore, MemStateStore};
use kardia_sync::{apply_server_message, ConvergenceClient, ServerMessage, TokenRing};
use std::sync::Arc;
use uuid::Uuid;

async fn open_store() -> LimbicStore {
    LimbicStore::open(Arc::new(MemStateStore::new()), None).await
}

// ============================================================================
// Push-channel reconciliation
// ============================================================================

#[tokio::test]
async fn test_state_replace_never_increments() {
    let store = open_store().await;
    let before = store.state().await.interaction_count;

    let mut server = LimbicState::default();
    server.trust = 0.95;
    server.posture = Posture::Companion;
    server.interaction_count = before;

    let msg = ServerMessage::StateReplace { state: server };
    let mut seen = TokenRing::new(8);
    apply_server_message(&store, msg, &mut seen).await;

    let s = store.state().await;
    assert_eq!(s.interaction_count, before);
    assert_eq!(s.trust, 0.95);
    assert_eq!(s.posture, Posture::Companion);
}

#[tokio::test]
async fn test_state_delta_increments() {
    let store = open_store().await;
    let before = store.state().await.interaction_count;

    let msg: ServerMessage =
        serde_json::from_str(r#"{"type":"state_delta","delta":{"warmth":0.8}}"#).unwrap();
    let mut seen = TokenRing::new(8);
    apply_server_message(&store, msg, &mut seen).await;

    let s = store.state().await;
    assert_eq!(s.interaction_count, before + 1);
    assert_eq!(s.warmth, 0.8);
}

#[tokio::test]
async fn test_echo_of_own_send_not_double_applied() {
    let store = open_store().await;
    let token = Uuid::new_v4();

    let mut seen = TokenRing::new(8);
    seen.remember(token);

    let before = store.state().await;
    let msg = ServerMessage::StateDelta {
        delta: serde_json::from_str(r#"{"trust":0.99}"#).unwrap(),
        token: Some(token),
    };
    apply_server_message(&store, msg, &mut seen).await;

    let after = store.state().await;
    assert_eq!(after.trust, before.trust, "echo must not be applied");
    assert_eq!(after.interaction_count, before.interaction_count);
}

#[tokio::test]
async fn test_foreign_token_applies_normally() {
    let store = open_store().await;
    let mut seen = TokenRing::new(8);
    seen.remember(Uuid::new_v4());

    let msg = ServerMessage::StateDelta {
        delta: serde_json::from_str(r#"{"trust":0.99}"#).unwrap(),
        token: Some(Uuid::new_v4()),
    };
    apply_server_message(&store, msg, &mut seen).await;
    assert_eq!(store.state().await.trust, 0.99);
}

#[tokio::test]
async fn test_replace_clamps_out_of_range_server_state() {
    let store = open_store().await;
    let msg: ServerMessage = serde_json::from_str(
        r#"{"type":"state_replace","state":{"trust":7.0,"warmth":-2.0,"arousal":0.5,"valence":0.5}}"#,
    )
    .unwrap();
    let mut seen = TokenRing::new(8);
    apply_server_message(&store, msg, &mut seen).await;

    let s = store.state().await;
    assert_eq!(s.trust, 1.0);
    assert_eq!(s.warmth, 0.0);
}

// ============================================================================
// One-shot convergence call
// ============================================================================

#[tokio::test]
async fn test_empty_answer_rejected_before_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/convergence/answer")
        .expect(0)
        .create_async()
        .await;

    let client = ConvergenceClient::new(&server.url());
    let err = client.submit_answer("").await.unwrap_err();

    assert!(matches!(err, KardiaError::Validation(_)));
    mock.assert_async().await; // zero requests recorded
}

#[tokio::test]
async fn test_backend_detail_surfaced_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/convergence/answer")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "bad state"}"#)
        .create_async()
        .await;

    let client = ConvergenceClient::new(&server.url());
    let err = client.submit_answer("I think we've converged").await.unwrap_err();

    assert!(matches!(err, KardiaError::Backend(_)));
    assert_eq!(err.to_string(), "bad state");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_success_payload_forwarded_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{"accepted": true, "next_prompt": "tell me more"}"#;
    let mock = server
        .mock("POST", "/convergence/answer")
        .match_body(mockito::Matcher::JsonString(
            r#"{"answer": "forty-two"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let client = ConvergenceClient::new(&server.url());
    let payload = client.submit_answer("forty-two").await.unwrap();

    assert_eq!(payload["accepted"], true);
    assert_eq!(payload["next_prompt"], "tell me more");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_json_error_body_is_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/convergence/answer")
        .with_status(500)
        .with_body("gateway exploded")
        .create_async()
        .await;

    let client = ConvergenceClient::new(&server.url());
    let err = client.submit_answer("hello").await.unwrap_err();

    assert!(matches!(err, KardiaError::Transport(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    // Nothing listens here.
    let client = ConvergenceClient::new("http://127.0.0.1:9");
    let err = client.submit_answer("hello").await.unwrap_err();
    assert!(matches!(err, KardiaError::Transport(_)));
}
