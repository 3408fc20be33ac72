//! ## hitmon-capture::tail
//! **Follows a growing file and emits appended lines**
//!
//! Reading starts at the end of the file; existing content is not replayed.
//! The worker sleeps until the file watcher reports a modification, then
//! drains every complete line. A trailing line without its newline is kept
//! until the rest of it is written.

use std::path::Path;
use std::sync::Arc;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader, SeekFrom};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use hitmon_core::MonitorError;
use hitmon_telemetry::MetricsRecorder;

type WatchEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Streams lines appended to `path` into `lines` until cancelled.
///
/// Failing to open or watch the file is fatal. A closed `lines` channel ends
/// the worker without error.
pub async fn follow(
    path: &Path,
    lines: mpsc::Sender<String>,
    cancel: CancellationToken,
    metrics: Arc<MetricsRecorder>,
) -> Result<(), MonitorError> {
    let mut file = File::open(path)
        .await
        .map_err(|source| MonitorError::Follow {
            path: path.to_path_buf(),
            source,
        })?;
    file.seek(SeekFrom::End(0)).await?;

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = event_tx.send(res);
    })
    .map_err(watch_error)?;
    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(watch_error)?;
    info!("Following {}", path.display());

    let mut reader = BufReader::new(file);
    let mut pending = Vec::new();
    loop {
        wait_for_write(&mut events, &cancel).await?;

        loop {
            let read = reader.read_until(b'\n', &mut pending).await?;
            if read == 0 {
                break;
            }
            if pending.last() != Some(&b'\n') {
                continue;
            }

            let line = String::from_utf8_lossy(&pending)
                .trim_end_matches(['\n', '\r'])
                .to_string();
            pending.clear();
            metrics.lines_read.inc();
            trace!(line = %line, "line read");

            tokio::select! {
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                sent = lines.send(line) => {
                    if sent.is_err() {
                        debug!("Line receiver dropped, follower stopping");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn wait_for_write(
    events: &mut WatchEvents,
    cancel: &CancellationToken,
) -> Result<(), MonitorError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
            event = events.recv() => match event {
                None => return Err(MonitorError::Watch("file watcher stopped".into())),
                Some(Err(e)) => return Err(watch_error(e)),
                Some(Ok(event)) if matches!(event.kind, EventKind::Modify(_)) => return Ok(()),
                Some(Ok(event)) => trace!(kind = ?event.kind, "ignoring file event"),
            },
        }
    }
}

fn watch_error(err: notify::Error) -> MonitorError {
    MonitorError::Watch(err.to_string())
}
