use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::dispense::event::{DispenseEvent, DispensedMedication};
use crate::state::AppState;
use crate::ws::fanout;

/// POST /api/prescriptions/{id}/dispense — Trigger a dispense.
///
/// Builds the dispense event, durably records one history row per funnel,
/// then broadcasts the event to all connected clients. Per-connection
/// delivery failures never fail the request; only a failure to serialize
/// the event does. The event is also the HTTP response body, so the
/// triggering client sees exactly what the device clients were pushed.
pub async fn dispense_prescription(
    State(state): State<AppState>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<DispenseEvent>, (StatusCode, String)> {
    let db = state.db.clone();

    let event = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        // Load the prescription and its patient
        let (patient_id, patient_name, dosage) = conn
            .query_row(
                "SELECT p.patient_id, pa.name, p.dosage
                 FROM prescriptions p JOIN patients pa ON pa.id = p.patient_id
                 WHERE p.id = ?1",
                [prescription_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Prescription not found".to_string()))?;

        // Load the funnels this prescription dispenses from
        let mut stmt = conn
            .prepare(
                "SELECT f.id, f.name, f.medication
                 FROM funnels f
                 JOIN prescription_funnels pf ON pf.funnel_id = f.id
                 WHERE pf.prescription_id = ?1
                 ORDER BY f.id ASC",
            )
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Prepare funnel query: {}", e),
                )
            })?;

        let medications: Vec<DispensedMedication> = stmt
            .query_map([prescription_id], |row| {
                Ok(DispensedMedication {
                    funnel_id: row.get(0)?,
                    funnel_name: row.get(1)?,
                    medication: row.get(2)?,
                    pills: dosage,
                })
            })
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Funnel query: {}", e),
                )
            })?
            .filter_map(|r| r.ok())
            .collect();

        let now = Utc::now().to_rfc3339();

        // Record the durable history before any notification goes out.
        // All rows for one dispense commit together; a failed insert
        // rolls back the whole batch.
        let tx = conn.unchecked_transaction().map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Begin history transaction: {}", e),
            )
        })?;

        for med in &medications {
            tx.execute(
                "INSERT INTO dispense_history
                 (patient_id, prescription_id, funnel_id, medication, pills_dispensed, dispense_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    patient_id,
                    prescription_id,
                    med.funnel_id,
                    med.medication,
                    med.pills,
                    now
                ],
            )
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Insert history: {}", e),
                )
            })?;
        }

        tx.commit().map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Commit history transaction: {}", e),
            )
        })?;

        Ok::<_, (StatusCode, String)>(DispenseEvent {
            prescription_id,
            patient_name,
            timestamp: now,
            medications,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    // History is durable; push the event to every connected client
    fanout::broadcast(&state.connections, &event).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Serialize dispense event: {}", e),
        )
    })?;

    Ok(Json(event))
}
