//! Access log input settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct InputConfig {
    /// Access log to follow. Only lines appended after start-up are read.
    #[serde(default = "default_log_path")]
    #[validate(custom(function = validation::validate_log_path))]
    pub log_path: PathBuf,

    /// Capacity of the line and hit channels between workers.
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1, max = 1_048_576))]
    pub channel_capacity: usize,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/tmp/access.log")
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
