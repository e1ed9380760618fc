//! Relay integration tests
//!
//! Drive the WebSocket relay end to end over real sockets.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use futures_util::StreamExt;
use integration_tests::TestServer;
use relay_gateway::{ChatPayload, ServerEnvelope};
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

fn chat(to: Option<&str>, from: &str, text: &str) -> ChatPayload {
    ChatPayload {
        to: to.map(str::to_string),
        from: from.to_string(),
        text: text.to_string(),
        file_name: None,
        file_url: None,
    }
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_first_roster_includes_self() {
    let server = TestServer::start().await.unwrap();
    let _alice = server.connect_as("alice").await.unwrap();

    let (mut stream, _) = tokio_tungstenite::connect_async(server.ws_url()).await.unwrap();
    let Some(Ok(Message::Text(frame))) = stream.next().await else {
        panic!("expected a text frame");
    };

    let ServerEnvelope::Info(snapshot) = ServerEnvelope::from_json(&frame).unwrap() else {
        panic!("expected a roster");
    };
    assert_eq!(snapshot.total_clients, 2);
    assert_eq!(snapshot.clients[0], "alice");
    assert_eq!(snapshot.clients[1].len(), 32);
}

#[tokio::test]
async fn test_roster_tracks_joins_and_leaves() {
    let server = TestServer::start().await.unwrap();

    let mut alice = server.connect_as("alice").await.unwrap();
    let bob = server.connect_as("bob").await.unwrap();
    let _carol = server.connect_as("carol").await.unwrap();

    let snapshot = alice
        .recv_info_until(|s| s.total_clients == 3 && s.clients.contains(&"carol".to_string()))
        .await
        .unwrap();
    assert_eq!(snapshot.clients, vec!["alice", "bob", "carol"]);

    bob.close().await.unwrap();

    let snapshot = alice.recv_info_until(|s| s.total_clients == 2).await.unwrap();
    assert_eq!(snapshot.clients, vec!["alice", "carol"]);
    assert_eq!(server.gateway.snapshot(), snapshot);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_direct_and_group_messages() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();

    alice.message("bob", "hi").await.unwrap();
    let direct = ServerEnvelope::Message(chat(Some("bob"), "alice", "hi"));
    assert_eq!(bob.recv_chat().await.unwrap(), direct);
    assert_eq!(alice.recv_chat().await.unwrap(), direct);

    bob.group_message("hello all").await.unwrap();
    let group = ServerEnvelope::GroupMessage(chat(None, "bob", "hello all"));
    assert_eq!(alice.recv_chat().await.unwrap(), group);
    assert_eq!(bob.recv_chat().await.unwrap(), group);

    alice.close().await.unwrap();
    let snapshot = bob.recv_info_until(|s| s.total_clients == 1).await.unwrap();
    assert_eq!(snapshot.clients, vec!["bob"]);
}

#[tokio::test]
async fn test_direct_message_reaches_only_target() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();
    let mut carol = server.connect_as("carol").await.unwrap();

    alice.message("carol", "psst").await.unwrap();

    assert_eq!(
        carol.recv_chat().await.unwrap(),
        ServerEnvelope::Message(chat(Some("carol"), "alice", "psst"))
    );
    alice.recv_chat().await.unwrap();
    bob.expect_no_chat().await.unwrap();
}

#[tokio::test]
async fn test_unknown_target_is_echoed_to_sender_only() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();

    alice.message("ghost", "anyone?").await.unwrap();

    assert_eq!(
        alice.recv_chat().await.unwrap(),
        ServerEnvelope::Message(chat(Some("ghost"), "alice", "anyone?"))
    );
    bob.expect_no_chat().await.unwrap();
}

#[tokio::test]
async fn test_message_without_target_is_broadcast() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();

    alice
        .send_json(&json!({"event": "message", "text": "everyone"}))
        .await
        .unwrap();

    let expected = ServerEnvelope::Message(chat(None, "alice", "everyone"));
    assert_eq!(alice.recv_chat().await.unwrap(), expected);
    assert_eq!(bob.recv_chat().await.unwrap(), expected);
}

#[tokio::test]
async fn test_file_fields_are_relayed() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();

    alice
        .send_json(&json!({
            "event": "groupmessage",
            "text": "look",
            "fileName": "cat.png",
            "fileUrl": "/uploads/files/cat.png"
        }))
        .await
        .unwrap();

    let ServerEnvelope::GroupMessage(payload) = bob.recv_chat().await.unwrap() else {
        panic!("expected a group message");
    };
    assert_eq!(payload.file_name.as_deref(), Some("cat.png"));
    assert_eq!(payload.file_url.as_deref(), Some("/uploads/files/cat.png"));

    alice.recv_chat().await.unwrap();
}

#[tokio::test]
async fn test_unregistered_sender_uses_connection_id() {
    let server = TestServer::start().await.unwrap();
    let mut anon = server.connect().await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();

    anon.group_message("who am i").await.unwrap();

    let ServerEnvelope::GroupMessage(payload) = bob.recv_chat().await.unwrap() else {
        panic!("expected a group message");
    };
    assert_eq!(payload.from.len(), 32);
    assert!(server.gateway.registry().find_by_id(&payload.from).is_some());
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_taken_name_is_rejected_until_released() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect_as("alice").await.unwrap();
    let mut other = server.connect().await.unwrap();

    other.register("alice").await.unwrap();
    other.group_message("still anonymous").await.unwrap();

    let ServerEnvelope::GroupMessage(payload) = other.recv_chat().await.unwrap() else {
        panic!("expected a group message");
    };
    assert_ne!(payload.from, "alice");

    alice.close().await.unwrap();
    other.recv_info_until(|s| s.total_clients == 1).await.unwrap();

    other.register("alice").await.unwrap();
    let snapshot = other
        .recv_info_until(|s| s.clients == vec!["alice".to_string()])
        .await
        .unwrap();
    assert_eq!(snapshot.total_clients, 1);
}

#[tokio::test]
async fn test_rename_updates_roster() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_as("alice").await.unwrap();

    client.register("alicia").await.unwrap();
    let snapshot = client
        .recv_info_until(|s| s.clients == vec!["alicia".to_string()])
        .await
        .unwrap();

    assert_eq!(snapshot.total_clients, 1);
}

// ============================================================================
// Robustness
// ============================================================================

#[tokio::test]
async fn test_malformed_frames_do_not_close_the_connection() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();
    let mut bob = server.connect_as("bob").await.unwrap();

    alice.send_text("not json").await.unwrap();
    alice.send_text("[1, 2, 3]").await.unwrap();
    alice.send_json(&json!({"text": "no event"})).await.unwrap();
    alice.send_json(&json!({"event": "message", "to": "bob"})).await.unwrap();
    alice.send_json(&json!({"event": "groupmessage", "text": ""})).await.unwrap();
    alice.send_json(&json!({"event": "dance", "text": "?"})).await.unwrap();
    alice.group_message("still here").await.unwrap();

    assert_eq!(
        bob.recv_chat().await.unwrap(),
        ServerEnvelope::GroupMessage(chat(None, "alice", "still here"))
    );
    assert_eq!(server.gateway.connection_count(), 2);
}

#[tokio::test]
async fn test_stalled_reader_is_disconnected() {
    let server = TestServer::start_with(&[("OUTBOUND_QUEUE_CAPACITY", "8")])
        .await
        .unwrap();
    let mut sender = server.connect_as("sender").await.unwrap();
    let stalled = server.connect_as("stalled").await.unwrap();

    // `stalled` never reads. Once the socket buffers are full its queue
    // overflows and the relay drops it. The sender waits for each echo so
    // its own queue stays short.
    let text = "x".repeat(64 * 1024);
    let mut dropped = false;
    for _ in 0..2000 {
        sender.message("stalled", &text).await.unwrap();
        sender.recv_chat().await.unwrap();

        if !server
            .gateway
            .snapshot()
            .clients
            .contains(&"stalled".to_string())
        {
            dropped = true;
            break;
        }
    }
    assert!(dropped, "stalled reader was never dropped");

    stalled.wait_closed(Duration::from_secs(30)).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.gateway.registry().len() > 1 {
        assert!(tokio::time::Instant::now() < deadline, "connection not cleaned up");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    sender.group_message("still flowing").await.unwrap();
    assert_eq!(
        sender.recv_chat().await.unwrap(),
        ServerEnvelope::GroupMessage(chat(None, "sender", "still flowing"))
    );
    assert_eq!(server.gateway.snapshot().clients, vec!["sender"]);
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect_as("alice").await.unwrap();

    assert_eq!(server.gateway.shutdown(), 1);

    assert!(alice.recv_chat().await.is_err());
    assert_eq!(server.gateway.connection_count(), 0);
}
