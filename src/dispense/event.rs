use serde::{Deserialize, Serialize};

/// Immutable record of one dispensing action, created once per dispense
/// request. This is both the WebSocket broadcast payload and the HTTP
/// response body of the trigger endpoint; the durable record lives in
/// dispense_history, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseEvent {
    pub prescription_id: i64,
    pub patient_name: String,
    /// ISO-8601 / RFC-3339 timestamp of the dispense
    pub timestamp: String,
    pub medications: Vec<DispensedMedication>,
}

/// One (funnel, medication, pill count) line of a dispense event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispensedMedication {
    pub funnel_id: i64,
    pub funnel_name: String,
    pub medication: String,
    pub pills: i64,
}
