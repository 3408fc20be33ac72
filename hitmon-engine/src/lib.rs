//! # hitmon-engine
//!
//! Statistics reporting, worker supervision and the `run_monitor` entry point
//! shared by every frontend.

pub mod engine;
pub mod runtime;

pub use engine::{EngineError, StatsReport, StatsReporter, Supervisor};
pub use runtime::run_monitor;
