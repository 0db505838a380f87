//! Domain layer for the Foreman orchestrator
//!
//! Core business models, error types, and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
