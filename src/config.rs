use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Pill-dispenser controller server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(
    name = "dispenser-server",
    version,
    about = "Pill-dispenser controller server"
)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "DISPENSER_PORT", default_value = "10000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "DISPENSER_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./dispenser.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "DISPENSER_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (SQLite database)
    #[arg(long, env = "DISPENSER_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Seconds to wait for any inbound frame after a liveness probe
    /// before a WebSocket connection is considered dead
    #[arg(long, env = "DISPENSER_PONG_TIMEOUT_SECS", default_value = "10")]
    pub pong_timeout_secs: u64,

    /// Idle gap in seconds between successive liveness probes while the
    /// peer is responsive (0 = re-probe immediately)
    #[arg(long, env = "DISPENSER_PROBE_INTERVAL_SECS", default_value = "1")]
    pub probe_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 10000,
            bind_address: "0.0.0.0".to_string(),
            config: "./dispenser.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            pong_timeout_secs: 10,
            probe_interval_secs: 1,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (DISPENSER_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("DISPENSER_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Pill-Dispenser Controller Server Configuration
# Place this file at ./dispenser.toml or specify with --config <path>
# All settings can be overridden via environment variables (DISPENSER_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 10000)
# port = 10000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database
# data_dir = "./data"

# ---- WebSocket Keepalive ----

# Seconds to wait for any inbound frame after a liveness probe before
# the connection is considered dead (default: 10)
# pong_timeout_secs = 10

# Idle gap in seconds between successive probes while the peer is
# responsive; 0 re-probes immediately (default: 1)
# probe_interval_secs = 1
"#
    .to_string()
}
