//! Periodic statistics report settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReportConfig {
    /// Time between two reports.
    #[serde(default = "default_interval", with = "humantime_serde")]
    #[validate(custom(function = validation::validate_non_zero))]
    pub interval: Duration,

    /// Trailing window the report aggregates.
    #[serde(default = "default_window", with = "humantime_serde")]
    #[validate(custom(function = validation::validate_whole_seconds))]
    pub window: Duration,

    /// Number of busiest sections listed.
    #[serde(default = "default_top_sections")]
    #[validate(range(min = 1, max = 100))]
    pub top_sections: usize,
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_window() -> Duration {
    Duration::from_secs(10)
}

fn default_top_sections() -> usize {
    3
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            window: default_window(),
            top_sections: default_top_sections(),
        }
    }
}
