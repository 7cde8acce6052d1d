pub mod crud;
pub mod dispense;
