use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: Initial schema

CREATE TABLE funnels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    medication TEXT NOT NULL DEFAULT '',
    capacity INTEGER NOT NULL DEFAULT 0,
    is_configured INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE prescriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL,
    dosage INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    FOREIGN KEY (patient_id) REFERENCES patients(id)
);

CREATE INDEX idx_prescriptions_patient ON prescriptions(patient_id);

CREATE TABLE prescription_funnels (
    prescription_id INTEGER NOT NULL,
    funnel_id INTEGER NOT NULL,
    PRIMARY KEY (prescription_id, funnel_id),
    FOREIGN KEY (prescription_id) REFERENCES prescriptions(id),
    FOREIGN KEY (funnel_id) REFERENCES funnels(id)
);

CREATE TABLE dispense_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL,
    prescription_id INTEGER NOT NULL,
    funnel_id INTEGER NOT NULL,
    medication TEXT NOT NULL,
    pills_dispensed INTEGER NOT NULL,
    dispense_time TEXT NOT NULL,
    FOREIGN KEY (patient_id) REFERENCES patients(id),
    FOREIGN KEY (prescription_id) REFERENCES prescriptions(id),
    FOREIGN KEY (funnel_id) REFERENCES funnels(id)
);

CREATE INDEX idx_dispense_history_patient ON dispense_history(patient_id, dispense_time);
",
    )])
}
