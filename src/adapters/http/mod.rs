//! Read-only HTTP surfaces.

pub mod status_api;

pub use status_api::{StatusAppState, build_router, serve};
