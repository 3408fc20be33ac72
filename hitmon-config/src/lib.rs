//! # hitmon configuration
//!
//! Layered configuration for the access log monitor.
//!
//! Hierarchy, later layers win:
//! 1. Built-in defaults
//! 2. A YAML file (`hitmon.yaml` in the working directory unless one is named)
//! 3. `HITMON_*` environment variables, `__` separating nested keys
//!    (`HITMON_ALERT__THRESHOLD=25`)
//! 4. Command-line overrides applied through [`HitmonConfig::with_overrides`]

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod alert;
mod error;
mod input;
mod report;
mod store;
mod telemetry;
mod validation;

pub use alert::AlertConfig;
pub use error::ConfigError;
pub use input::InputConfig;
pub use report::ReportConfig;
pub use store::StoreConfig;
pub use telemetry::TelemetryConfig;

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "hitmon.yaml";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct HitmonConfig {
    #[validate(nested)]
    #[serde(default)]
    pub input: InputConfig,

    #[validate(nested)]
    #[serde(default)]
    pub store: StoreConfig,

    #[validate(nested)]
    #[serde(default)]
    pub alert: AlertConfig,

    #[validate(nested)]
    #[serde(default)]
    pub report: ReportConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub log_path: Option<PathBuf>,
    /// `Some(0.0)` keeps the configured threshold.
    pub alert_threshold: Option<f64>,
}

impl HitmonConfig {
    /// Loads defaults, then `path` (or [`DEFAULT_CONFIG_FILE`] if present),
    /// then `HITMON_*` environment variables, and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(HitmonConfig::default()));

        match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Some(path) => figment = figment.merge(Yaml::file(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                figment = figment.merge(Yaml::file(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        figment
            .merge(Env::prefixed("HITMON_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Applies command-line values on top of the loaded configuration.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(path) = &overrides.log_path {
            self.input.log_path = path.clone();
        }
        match overrides.alert_threshold {
            Some(threshold) if threshold != 0.0 => self.alert.threshold = threshold,
            _ => {}
        }
        self.validate()?;
        Ok(self)
    }
}
