//! HTTP glue around the [`pwhash`] core.
//!
//! - [`config`] - CLI/environment configuration.
//! - [`routes`] - axum router mapping requests onto [`pwhash::HashService`].
//! - [`telemetry`] - log subscriber and optional OpenTelemetry metrics.

pub mod config;
pub mod routes;
pub mod telemetry;
