//! High traffic alert settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AlertConfig {
    /// Average hits per second at or above which the alert is raised.
    #[serde(default = "default_threshold")]
    #[validate(range(exclusive_min = 0.0))]
    pub threshold: f64,

    /// Trailing window the average is computed over.
    #[serde(default = "default_period", with = "humantime_serde")]
    #[validate(custom(function = validation::validate_whole_seconds))]
    pub period: Duration,

    /// How often the average is re-evaluated.
    #[serde(default = "default_evaluate_every", with = "humantime_serde")]
    #[validate(custom(function = validation::validate_non_zero))]
    pub evaluate_every: Duration,
}

fn default_threshold() -> f64 {
    10.0
}

fn default_period() -> Duration {
    Duration::from_secs(120)
}

fn default_evaluate_every() -> Duration {
    Duration::from_secs(1)
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            period: default_period(),
            evaluate_every: default_evaluate_every(),
        }
    }
}
