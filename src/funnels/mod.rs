pub mod crud;
pub mod seed;
