use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{DispenseHistoryRow, Patient};
use crate::state::AppState;

// --- Response types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            created_at: patient.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientListResponse {
    pub patients: Vec<PatientResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub id: i64,
    pub prescription_id: i64,
    pub funnel_id: i64,
    pub medication: String,
    pub pills_dispensed: i64,
    pub dispense_time: String,
}

impl From<DispenseHistoryRow> for HistoryEntryResponse {
    fn from(row: DispenseHistoryRow) -> Self {
        Self {
            id: row.id,
            prescription_id: row.prescription_id,
            funnel_id: row.funnel_id,
            medication: row.medication,
            pills_dispensed: row.pills_dispensed,
            dispense_time: row.dispense_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientHistoryResponse {
    pub patient: PatientResponse,
    pub entries: Vec<HistoryEntryResponse>,
}

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
}

// --- Handlers ---

/// GET /api/patients — List all registered patients.
pub async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<PatientListResponse>, StatusCode> {
    let db = state.db.clone();

    let patients = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM patients ORDER BY id ASC")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let patients: Vec<PatientResponse> = stmt
            .query_map([], |row| {
                Ok(Patient {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .map(PatientResponse::from)
            .collect();

        Ok::<_, StatusCode>(patients)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(PatientListResponse { patients }))
}

/// POST /api/patients — Register a new patient.
pub async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientResponse>), (StatusCode, String)> {
    if req.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Patient name cannot be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let name = req.name.clone();

    let patient = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO patients (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name, now],
        )
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Insert patient: {}", e),
            )
        })?;

        Ok::<_, (StatusCode, String)>(PatientResponse {
            id: conn.last_insert_rowid(),
            name,
            created_at: now,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok((StatusCode::CREATED, Json(patient)))
}

/// GET /api/patients/{id}/history — Dispense history for one patient,
/// newest first.
pub async fn patient_history(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
) -> Result<Json<PatientHistoryResponse>, (StatusCode, String)> {
    let db = state.db.clone();

    let history = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let patient = conn
            .query_row(
                "SELECT id, name, created_at FROM patients WHERE id = ?1",
                [patient_id],
                |row| {
                    Ok(Patient {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .map(PatientResponse::from)
            .map_err(|_| (StatusCode::NOT_FOUND, "Patient not found".to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, patient_id, prescription_id, funnel_id, medication, pills_dispensed, dispense_time
                 FROM dispense_history WHERE patient_id = ?1
                 ORDER BY dispense_time DESC, id DESC",
            )
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Prepare history query: {}", e),
                )
            })?;

        let entries: Vec<HistoryEntryResponse> = stmt
            .query_map([patient_id], |row| {
                Ok(DispenseHistoryRow {
                    id: row.get(0)?,
                    patient_id: row.get(1)?,
                    prescription_id: row.get(2)?,
                    funnel_id: row.get(3)?,
                    medication: row.get(4)?,
                    pills_dispensed: row.get(5)?,
                    dispense_time: row.get(6)?,
                })
            })
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("History query: {}", e),
                )
            })?
            .filter_map(|r| r.ok())
            .map(HistoryEntryResponse::from)
            .collect();

        Ok::<_, (StatusCode, String)>(PatientHistoryResponse { patient, entries })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(history))
}
