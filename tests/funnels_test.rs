//! Integration tests for funnel listing and configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use dispenser_server::ws::keepalive::KeepalivePolicy;
use dispenser_server::ws::ConnectionRegistry;

/// Helper: start the server on a random port and return (base_url, addr).
async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = dispenser_server::db::init_db(&data_dir).expect("Failed to init DB");
    {
        let conn = db.lock().expect("DB lock for funnel seed");
        dispenser_server::funnels::seed::seed_default_funnels(&conn)
            .expect("Failed to seed funnels");
    }

    let state = dispenser_server::state::AppState {
        db,
        connections: Arc::new(ConnectionRegistry::new()),
        keepalive: KeepalivePolicy::new(10, 1),
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

    let base_url = format!("http://{}", addr);
    (base_url, addr)
}

#[tokio::test]
async fn test_default_funnels_are_seeded() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/funnels", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let funnels = body["funnels"].as_array().unwrap();
    assert_eq!(funnels.len(), 3);
    assert_eq!(funnels[0]["name"], "Funnel 1");
    assert_eq!(funnels[0]["is_configured"], false);
    assert_eq!(funnels[2]["name"], "Funnel 3");
}

#[tokio::test]
async fn test_configure_funnel() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/funnels/1", base_url))
        .json(&serde_json::json!({"medication": "Aspirin", "capacity": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["id"], 1);
    assert_eq!(body["medication"], "Aspirin");
    assert_eq!(body["capacity"], 100);
    assert_eq!(body["is_configured"], true);

    // The change is visible in the list
    let resp = client
        .get(format!("{}/api/funnels", base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["funnels"][0]["is_configured"], true);
    assert_eq!(body["funnels"][1]["is_configured"], false);
}

#[tokio::test]
async fn test_configure_unknown_funnel_returns_404() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/funnels/999", base_url))
        .json(&serde_json::json!({"medication": "Aspirin", "capacity": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_configure_funnel_rejects_bad_input() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/funnels/1", base_url))
        .json(&serde_json::json!({"medication": "  ", "capacity": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "Empty medication should be rejected");

    let resp = client
        .put(format!("{}/api/funnels/1", base_url))
        .json(&serde_json::json!({"medication": "Aspirin", "capacity": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "Non-positive capacity should be rejected");
}
