use thiserror::Error;
use tokio::task::JoinError;

use hitmon_core::{MonitorError, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{worker} failed: {source}")]
    Worker {
        worker: &'static str,
        #[source]
        source: MonitorError,
    },

    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<JoinError> for EngineError {
    fn from(err: JoinError) -> Self {
        EngineError::Join(err.to_string())
    }
}
