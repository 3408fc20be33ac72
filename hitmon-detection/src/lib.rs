//! # Hitmon Detection
//!
//! Crate for threshold-based traffic alerting on top of the time series store.

pub mod alerts;

pub use alerts::{format_period, AlertEngine, AlertNotification, AlertState};
