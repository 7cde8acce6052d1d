//! Integration tests for the WebSocket keepalive: probe frames, liveness
//! evidence, dead-client disconnection, and cleanup.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use dispenser_server::ws::keepalive::KeepalivePolicy;
use dispenser_server::ws::ConnectionRegistry;

/// Helper: start the server on a random port with the given keepalive
/// policy, returning (addr, registry handle).
async fn start_test_server(policy: KeepalivePolicy) -> (SocketAddr, Arc<ConnectionRegistry>) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = dispenser_server::db::init_db(&data_dir).expect("Failed to init DB");
    {
        let conn = db.lock().expect("DB lock for funnel seed");
        dispenser_server::funnels::seed::seed_default_funnels(&conn)
            .expect("Failed to seed funnels");
    }

    let connections = Arc::new(ConnectionRegistry::new());
    let state = dispenser_server::state::AppState {
        db,
        connections: connections.clone(),
        keepalive: policy,
    };

    let app = dispenser_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    (addr, connections)
}

#[tokio::test]
async fn test_server_sends_ping_probe() {
    let (addr, _registry) = start_test_server(KeepalivePolicy::new(10, 1)).await;

    let ws_url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");
    let (mut _write, mut read) = ws_stream.split();

    let msg = tokio::time::timeout(Duration::from_secs(3), read.next())
        .await
        .expect("Expected a probe within timeout")
        .expect("Stream ended unexpectedly")
        .expect("WebSocket error");

    match msg {
        Message::Text(text) => {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(frame["type"], "ping");
        }
        other => panic!("Expected text ping frame, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_pong_keeps_connection_alive() {
    let (addr, registry) = start_test_server(KeepalivePolicy::new(1, 0)).await;

    let ws_url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect");
    let (mut write, mut read) = ws_stream.split();

    // Answer several probes; the connection must survive well past the
    // one-second pong timeout
    for _ in 0..4 {
        let msg = tokio::time::timeout(Duration::from_secs(3), read.next())
            .await
            .expect("Expected a probe")
            .expect("Stream ended unexpectedly")
            .expect("WebSocket error");
        assert!(msg.is_text(), "Expected text probe, got: {:?}", msg);

        write
            .send(Message::Text(r#"{"type":"pong"}"#.to_string()))
            .await
            .expect("Failed to send pong");
    }

    assert_eq!(registry.len(), 1, "Responsive connection should stay registered");
}

#[tokio::test]
async fn test_malformed_frame_counts_as_liveness() {
    let (addr, registry) = start_test_server(KeepalivePolicy::new(1, 0)).await;

    let ws_url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect");
    let (mut write, mut read) = ws_stream.split();

    // Answer probes with garbage; the server must keep probing
    for _ in 0..4 {
        let msg = tokio::time::timeout(Duration::from_secs(3), read.next())
            .await
            .expect("Expected a probe")
            .expect("Stream ended unexpectedly")
            .expect("WebSocket error");
        assert!(msg.is_text(), "Expected text probe, got: {:?}", msg);

        write
            .send(Message::Text("definitely not json".to_string()))
            .await
            .expect("Failed to send frame");
    }

    assert_eq!(registry.len(), 1, "Noisy-but-alive connection should stay registered");
}

#[tokio::test]
async fn test_silent_client_is_disconnected_within_timeout() {
    let (addr, registry) = start_test_server(KeepalivePolicy::new(1, 0)).await;

    let ws_url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect");
    let (mut _write, mut read) = ws_stream.split();

    // Never respond. The first frame is the probe; after one timeout period
    // the server must drop us.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match tokio::time::timeout_at(deadline, read.next()).await {
            Ok(Some(Ok(msg))) if msg.is_text() || msg.is_ping() => continue,
            Ok(Some(Ok(_))) | Ok(Some(Err(_))) | Ok(None) => break,
            Err(_) => panic!("Server did not close a silent connection in time"),
        }
    }

    // Registry cleanup follows the close
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(registry.len(), 0, "Silent connection should be unregistered");
}

#[tokio::test]
async fn test_connection_cleanup_on_client_close() {
    let (addr, registry) = start_test_server(KeepalivePolicy::new(10, 1)).await;

    let ws_url = format!("ws://{}/ws", addr);

    // Connect and then immediately close
    {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .expect("Failed to connect");
        let (mut write, _read) = ws_stream.split();

        write
            .send(Message::Close(None))
            .await
            .expect("Failed to send close");
    }

    // Give the server a moment to clean up
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(registry.len(), 0, "Closed connection should be unregistered");

    // Reconnect should work fine and register a fresh connection
    let (ws_stream2, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to reconnect after cleanup");
    let (mut _write2, mut read2) = ws_stream2.split();

    let msg = tokio::time::timeout(Duration::from_secs(3), read2.next())
        .await
        .expect("Expected a probe on the new connection")
        .expect("Stream ended unexpectedly")
        .expect("WebSocket error");
    assert!(msg.is_text());
    assert_eq!(registry.len(), 1);
}
