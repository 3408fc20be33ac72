//! # hitmon telemetry
//!
//! Logger set-up, structured event logging and Prometheus counters shared by
//! every hitmon worker.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
