//! Shared models and ports used across features.

pub mod models;
pub mod ports;
