//! Time-series retention settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StoreConfig {
    /// Maximum bucket age kept in memory.
    #[serde(default = "default_retention", with = "humantime_serde")]
    #[validate(custom(function = validation::validate_whole_seconds))]
    pub retention: Duration,
}

fn default_retention() -> Duration {
    Duration::from_secs(120)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
        }
    }
}
