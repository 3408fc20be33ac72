//! Runs the pipeline workers as one group sharing a cancellation token.
//!
//! The first worker to fail cancels everyone else. `wait` drains the whole
//! group before returning, so nothing is left running when the process exits.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use hitmon_core::MonitorError;

use super::error::EngineError;

type WorkerOutcome = (&'static str, Result<(), MonitorError>);

pub struct Supervisor {
    tasks: JoinSet<WorkerOutcome>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn spawn<F>(&mut self, worker: &'static str, future: F)
    where
        F: Future<Output = Result<(), MonitorError>> + Send + 'static,
    {
        debug!(worker, "spawning worker");
        self.tasks.spawn(
            async move { (worker, future.await) }.instrument(info_span!("worker", name = worker)),
        );
    }

    /// Waits for every worker and returns the first real failure.
    /// Cancellation outcomes and clean exits are not failures.
    pub async fn wait(mut self) -> Result<(), EngineError> {
        let mut first: Option<EngineError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let failure = match joined {
                Ok((worker, Ok(()))) => {
                    debug!(worker, "worker finished");
                    None
                }
                Ok((worker, Err(e))) if e.is_cancelled() => {
                    debug!(worker, "worker cancelled");
                    None
                }
                Ok((worker, Err(source))) => Some(EngineError::Worker { worker, source }),
                Err(e) => Some(EngineError::from(e)),
            };

            let Some(err) = failure else { continue };
            self.cancel.cancel();
            if first.is_none() {
                error!("{err}");
                first = Some(err);
            } else {
                debug!("Discarding later failure: {err}");
            }
        }

        first.map_or(Ok(()), Err)
    }
}

/// Cancels the group on SIGINT or SIGTERM. Ends as `Cancelled` either way.
pub async fn wait_for_shutdown_signal(cancel: CancellationToken) -> Result<(), MonitorError> {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())?.recv().await;
        Ok::<(), std::io::Error>(())
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
        received = tokio::signal::ctrl_c() => {
            received?;
            info!("Received SIGINT");
        }
        received = terminate => {
            received?;
            info!("Received SIGTERM");
        }
    }

    cancel.cancel();
    Err(MonitorError::Cancelled)
}
