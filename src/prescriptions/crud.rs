use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::Prescription;
use crate::state::AppState;

// --- Response types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct PrescriptionResponse {
    pub id: i64,
    pub patient_id: i64,
    pub dosage: i64,
    pub start_date: String,
    pub end_date: Option<String>,
    pub funnel_ids: Vec<i64>,
}

impl From<Prescription> for PrescriptionResponse {
    fn from(prescription: Prescription) -> Self {
        Self {
            id: prescription.id,
            patient_id: prescription.patient_id,
            dosage: prescription.dosage,
            start_date: prescription.start_date,
            end_date: prescription.end_date,
            // Filled in from prescription_funnels by the caller
            funnel_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrescriptionListResponse {
    pub prescriptions: Vec<PrescriptionResponse>,
}

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: i64,
    /// Pills dispensed per funnel
    pub dosage: i64,
    pub funnel_ids: Vec<i64>,
}

// --- Handlers ---

/// GET /api/prescriptions — List all prescriptions with their funnel ids.
pub async fn list_prescriptions(
    State(state): State<AppState>,
) -> Result<Json<PrescriptionListResponse>, StatusCode> {
    let db = state.db.clone();

    let prescriptions = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut stmt = conn
            .prepare("SELECT id, patient_id, dosage, start_date, end_date FROM prescriptions ORDER BY id ASC")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut prescriptions: Vec<PrescriptionResponse> = stmt
            .query_map([], |row| {
                Ok(Prescription {
                    id: row.get(0)?,
                    patient_id: row.get(1)?,
                    dosage: row.get(2)?,
                    start_date: row.get(3)?,
                    end_date: row.get(4)?,
                })
            })
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .map(PrescriptionResponse::from)
            .collect();

        let mut link_stmt = conn
            .prepare("SELECT funnel_id FROM prescription_funnels WHERE prescription_id = ?1 ORDER BY funnel_id ASC")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        for prescription in &mut prescriptions {
            prescription.funnel_ids = link_stmt
                .query_map([prescription.id], |row| row.get::<_, i64>(0))
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .filter_map(|r| r.ok())
                .collect();
        }

        Ok::<_, StatusCode>(prescriptions)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(PrescriptionListResponse { prescriptions }))
}

/// POST /api/prescriptions — Create a prescription linking a patient to one
/// or more funnels. Unknown or unconfigured funnels are skipped; the request
/// fails only if no configured funnel remains.
pub async fn create_prescription(
    State(state): State<AppState>,
    Json(req): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<PrescriptionResponse>), (StatusCode, String)> {
    if req.dosage <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Dosage must be positive".to_string(),
        ));
    }

    let db = state.db.clone();

    let prescription = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        // Verify patient exists
        let patient_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM patients WHERE id = ?1",
                [req.patient_id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Check patient: {}", e),
                )
            })?;

        if !patient_exists {
            return Err((StatusCode::NOT_FOUND, "Patient not found".to_string()));
        }

        // Keep only funnels that exist and are configured
        let mut funnel_ids: Vec<i64> = Vec::new();
        for funnel_id in &req.funnel_ids {
            let configured: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM funnels WHERE id = ?1 AND is_configured = 1",
                    [funnel_id],
                    |row| row.get::<_, i64>(0).map(|c| c > 0),
                )
                .map_err(|e| {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Check funnel: {}", e),
                    )
                })?;
            if configured && !funnel_ids.contains(funnel_id) {
                funnel_ids.push(*funnel_id);
            }
        }

        if funnel_ids.is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                "No configured funnels selected".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO prescriptions (patient_id, dosage, start_date) VALUES (?1, ?2, ?3)",
            rusqlite::params![req.patient_id, req.dosage, now],
        )
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Insert prescription: {}", e),
            )
        })?;

        let prescription_id = conn.last_insert_rowid();

        for funnel_id in &funnel_ids {
            conn.execute(
                "INSERT INTO prescription_funnels (prescription_id, funnel_id) VALUES (?1, ?2)",
                rusqlite::params![prescription_id, funnel_id],
            )
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Link funnel: {}", e),
                )
            })?;
        }

        Ok::<_, (StatusCode, String)>(PrescriptionResponse {
            id: prescription_id,
            patient_id: req.patient_id,
            dosage: req.dosage,
            start_date: now,
            end_date: None,
            funnel_ids,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    tracing::info!(
        prescription_id = prescription.id,
        patient_id = prescription.patient_id,
        funnels = prescription.funnel_ids.len(),
        "Prescription created"
    );

    Ok((StatusCode::CREATED, Json(prescription)))
}
