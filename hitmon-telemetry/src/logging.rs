//! ## hitmon-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Diagnostics go to stderr so the monitor's own report lines stay readable
//! next to whatever else shares the terminal. `RUST_LOG` wins over the
//! configured default level.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init(default_level: &str) -> Result<(), InitError> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .try_init()
    }

    /// Records a named monitoring event with its attributes.
    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!("monitor_event", event_type = event_type, otel.kind = "INTERNAL");
        let _entered = span.enter();
        tracing::info!(metadata = ?metadata, "Monitor event recorded");
    }
}
