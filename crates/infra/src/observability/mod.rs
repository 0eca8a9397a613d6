//! Logging setup and the tracing-backed audit sink

pub mod audit;
pub mod logging;

pub use audit::{TracingAuditSink, AUDIT_TARGET};
pub use logging::init_tracing;
