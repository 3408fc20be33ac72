use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("retention period must be a whole number of seconds, got {0:?}")]
    RetentionNotWholeSeconds(Duration),

    #[error("bucket at {timestamp} is not newer than the latest stored bucket at {newest}")]
    OutOfOrder {
        timestamp: DateTime<Utc>,
        newest: DateTime<Utc>,
    },
}

/// Outcome of a pipeline worker. `Cancelled` is the expected result of a
/// requested shutdown, every other variant is a real failure.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("shutdown requested")]
    Cancelled,

    #[error("failed to follow file {path}: {source}")]
    Follow {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watch error: {0}")]
    Watch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl MonitorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MonitorError::Cancelled)
    }
}
