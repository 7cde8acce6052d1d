//! Integration tests for patient registration and dispense history retrieval.

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
async fn test_create_and_list_patients() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/patients", base_url))
        .json(&serde_json::json!({"name": "Alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Alice");
    let alice_id = body["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{}/api/patients", base_url))
        .json(&serde_json::json!({"name": "Bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .get(format!("{}/api/patients", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let patients = body["patients"].as_array().unwrap();
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0]["id"], alice_id);
    assert_eq!(patients[0]["name"], "Alice");
}

#[tokio::test]
async fn test_create_patient_rejects_empty_name() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/patients", base_url))
        .json(&serde_json::json!({"name": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_history_for_unknown_patient_returns_404() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/patients/42/history", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_new_patient_has_empty_history() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/patients", base_url))
        .json(&serde_json::json!({"name": "Carol"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let patient_id = body["id"].as_i64().unwrap();

    let resp = client
        .get(format!("{}/api/patients/{}/history", base_url, patient_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["patient"]["name"], "Carol");
    assert_eq!(body["entries"].as_array().unwrap().len(), 0);
}
