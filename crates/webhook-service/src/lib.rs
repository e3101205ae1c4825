//! # webhook-service
//!
//! The axum HTTP binary: `POST /webhooks` ingestion, `GET /health` and
//! `GET /metrics`, the replay/dead-letter worker, and the startup wiring
//! that turns a loaded [`config::ServiceConfig`] into a running
//! [`app::Application`]. Everything domain-specific -- the intake pipeline,
//! the event router, the repository config loader -- lives in
//! `webhook_core`; this crate only supplies concrete adapters and I/O.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod secrets;
pub mod shutdown;
pub mod worker;

pub use app::{build, Application};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use shutdown::ShutdownHandle;
