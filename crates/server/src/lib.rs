//! Text detector HTTP service
//!
//! Serves the ensemble over an HTML form and a JSON API, with health,
//! readiness and Prometheus endpoints alongside.

pub mod api;
pub mod config;
pub mod render;
