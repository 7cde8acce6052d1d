/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// Dispensing funnel pre-loaded with one medication
#[derive(Debug, Clone)]
pub struct Funnel {
    pub id: i64,
    pub name: String,
    pub medication: String,
    pub capacity: i64,
    pub is_configured: bool,
}

/// Registered patient
#[derive(Debug, Clone)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Prescription: patient + dosage, linked to funnels via prescription_funnels
#[derive(Debug, Clone)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub dosage: i64,
    pub start_date: String,
    pub end_date: Option<String>,
}

/// One dispensed medication record (one row per funnel per dispense)
#[derive(Debug, Clone)]
pub struct DispenseHistoryRow {
    pub id: i64,
    pub patient_id: i64,
    pub prescription_id: i64,
    pub funnel_id: i64,
    pub medication: String,
    pub pills_dispensed: i64,
    pub dispense_time: String,
}
