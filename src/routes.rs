use axum::Router;
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::funnels::crud as funnel_crud;
use crate::patients::crud as patient_crud;
use crate::prescriptions::crud as prescription_crud;
use crate::prescriptions::dispense;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting on the dispense trigger: it drives hardware, so a
    // misbehaving client must not be able to hammer it.
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(2) // 1 token every 2 seconds
            .burst_size(5) // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Staff-facing CRUD routes
    let funnel_routes = Router::new()
        .route("/api/funnels", axum::routing::get(funnel_crud::list_funnels))
        .route(
            "/api/funnels/{id}",
            axum::routing::put(funnel_crud::configure_funnel),
        );
    let patient_routes = Router::new()
        .route("/api/patients", axum::routing::get(patient_crud::list_patients))
        .route("/api/patients", axum::routing::post(patient_crud::create_patient))
        .route(
            "/api/patients/{id}/history",
            axum::routing::get(patient_crud::patient_history),
        );
    let prescription_routes = Router::new()
        .route(
            "/api/prescriptions",
            axum::routing::get(prescription_crud::list_prescriptions),
        )
        .route(
            "/api/prescriptions",
            axum::routing::post(prescription_crud::create_prescription),
        );

    // Dispense trigger with rate limiting
    let dispense_routes = Router::new()
        .route(
            "/api/prescriptions/{id}/dispense",
            axum::routing::post(dispense::dispense_prescription),
        )
        .layer(GovernorLayer {
            config: governor_config,
        });

    // WebSocket endpoint for front-end and device clients
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(funnel_routes)
        .merge(patient_routes)
        .merge(prescription_routes)
        .merge(dispense_routes)
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
