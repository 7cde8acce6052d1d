//! Pill-dispenser controller server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod config;
pub mod db;
pub mod dispense;
pub mod funnels;
pub mod patients;
pub mod prescriptions;
pub mod routes;
pub mod state;
pub mod ws;
