use std::sync::Arc;

use crate::db::DbPool;
use crate::ws::keepalive::KeepalivePolicy;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Active WebSocket connections, shared by the keepalive loops and the
    /// dispense fanout
    pub connections: Arc<ConnectionRegistry>,
    /// Probe timing for per-connection keepalive loops
    pub keepalive: KeepalivePolicy,
}
