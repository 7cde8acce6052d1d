use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::Funnel;
use crate::state::AppState;

// --- Response types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct FunnelResponse {
    pub id: i64,
    pub name: String,
    pub medication: String,
    pub capacity: i64,
    pub is_configured: bool,
}

impl From<Funnel> for FunnelResponse {
    fn from(funnel: Funnel) -> Self {
        Self {
            id: funnel.id,
            name: funnel.name,
            medication: funnel.medication,
            capacity: funnel.capacity,
            is_configured: funnel.is_configured,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FunnelListResponse {
    pub funnels: Vec<FunnelResponse>,
}

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct ConfigureFunnelRequest {
    pub medication: String,
    pub capacity: i64,
}

// --- Handlers ---

/// GET /api/funnels — List all funnels in id order.
pub async fn list_funnels(
    State(state): State<AppState>,
) -> Result<Json<FunnelListResponse>, StatusCode> {
    let db = state.db.clone();

    let funnels = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut stmt = conn
            .prepare("SELECT id, name, medication, capacity, is_configured FROM funnels ORDER BY id ASC")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let funnels: Vec<FunnelResponse> = stmt
            .query_map([], |row| {
                Ok(Funnel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    medication: row.get(2)?,
                    capacity: row.get(3)?,
                    is_configured: row.get(4)?,
                })
            })
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .map(FunnelResponse::from)
            .collect();

        Ok::<_, StatusCode>(funnels)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(FunnelListResponse { funnels }))
}

/// PUT /api/funnels/{id} — Configure a funnel with its loaded medication
/// and capacity, marking it available for prescriptions.
pub async fn configure_funnel(
    State(state): State<AppState>,
    Path(funnel_id): Path<i64>,
    Json(req): Json<ConfigureFunnelRequest>,
) -> Result<Json<FunnelResponse>, (StatusCode, String)> {
    if req.medication.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Medication name cannot be empty".to_string(),
        ));
    }
    if req.capacity <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Capacity must be positive".to_string(),
        ));
    }

    let db = state.db.clone();
    let medication = req.medication.clone();
    let capacity = req.capacity;

    let funnel = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let rows = conn
            .execute(
                "UPDATE funnels SET medication = ?1, capacity = ?2, is_configured = 1 WHERE id = ?3",
                rusqlite::params![medication, capacity, funnel_id],
            )
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Update funnel: {}", e),
                )
            })?;

        if rows == 0 {
            return Err((StatusCode::NOT_FOUND, "Funnel not found".to_string()));
        }

        // Read back
        conn.query_row(
            "SELECT id, name, medication, capacity, is_configured FROM funnels WHERE id = ?1",
            [funnel_id],
            |row| {
                Ok(Funnel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    medication: row.get(2)?,
                    capacity: row.get(3)?,
                    is_configured: row.get(4)?,
                })
            },
        )
        .map(FunnelResponse::from)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read funnel: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    tracing::info!(
        funnel_id = funnel.id,
        medication = %funnel.medication,
        "Funnel configured"
    );

    Ok(Json(funnel))
}
