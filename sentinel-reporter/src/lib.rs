//! Per-agent telemetry client (§4.7): queued batch delivery to the
//! ingestion service, a critical-event bypass path, and the
//! register/heartbeat/shutdown lifecycle.
//!
//! Spawned tasks are guarded by a `oneshot` shutdown channel and joined
//! (not aborted) on stop.

pub mod client;
pub mod config;
pub mod error;
pub mod queue;

pub use client::{RegisterRequest, Reporter};
pub use config::ReporterConfig;
pub use error::ReporterError;
