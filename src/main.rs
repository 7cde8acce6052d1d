mod config;
mod db;
mod dispense;
mod funnels;
mod patients;
mod prescriptions;
mod routes;
mod state;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use ws::keepalive::KeepalivePolicy;
use ws::ConnectionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "dispenser_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "dispenser_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!(
        "Dispenser server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Seed the hardware's three funnels on first boot
    {
        let conn = db.lock().expect("DB lock for funnel seed");
        funnels::seed::seed_default_funnels(&conn)?;
    }

    // Build application state: the connection registry is constructed here
    // and torn down with the process, shared by keepalive loops and fanout.
    let app_state = state::AppState {
        db,
        connections: Arc::new(ConnectionRegistry::new()),
        keepalive: KeepalivePolicy::new(config.pong_timeout_secs, config.probe_interval_secs),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
