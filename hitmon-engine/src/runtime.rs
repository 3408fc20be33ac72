/*!
# Monitor Runtime

Wires the pipeline together:

```text
tail -> lines -> parser -> hits -> aggregator -> store <- reporter, alerter
```

Every worker runs under one [`Supervisor`] and observes the same
cancellation token, so an interrupt or any fatal worker error shuts the whole
group down.
*/

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use hitmon_capture::{follow, run_parser};
use hitmon_config::HitmonConfig;
use hitmon_core::{Aggregator, TimeSeriesStore};
use hitmon_detection::AlertEngine;
use hitmon_telemetry::MetricsRecorder;

use crate::engine::{wait_for_shutdown_signal, EngineError, StatsReporter, Supervisor};

/// Runs the monitor until a shutdown signal, `cancel`, or a fatal worker
/// error. A requested shutdown is reported as `Ok`.
#[instrument(level = "info", name = "run_monitor", skip_all, fields(file = %config.input.log_path.display()))]
pub async fn run_monitor(config: &HitmonConfig, cancel: CancellationToken) -> Result<(), EngineError> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let store = Arc::new(TimeSeriesStore::with_system_clock(config.store.retention)?);
    warn_if_beyond_retention("alert.period", config.alert.period, store.retention());
    warn_if_beyond_retention("report.window", config.report.window, store.retention());

    let (line_tx, line_rx) = mpsc::channel(config.input.channel_capacity);
    let (hit_tx, hit_rx) = mpsc::channel(config.input.channel_capacity);

    let mut group = Supervisor::new(cancel);
    group.spawn("signals", wait_for_shutdown_signal(group.token()));

    let path = config.input.log_path.clone();
    let (token, tail_metrics) = (group.token(), metrics.clone());
    group.spawn("tail", async move {
        follow(&path, line_tx, token, tail_metrics).await
    });

    group.spawn(
        "parser",
        run_parser(line_rx, hit_tx, group.token(), metrics.clone()),
    );

    let aggregator = Aggregator::new(store.clone()).with_metrics(metrics.clone());
    group.spawn("aggregator", aggregator.run(hit_rx, group.token()));

    let reporter = StatsReporter::new(
        store.clone(),
        config.report.interval,
        config.report.window,
        config.report.top_sections,
    );
    group.spawn("reporter", reporter.run(group.token()));

    let alerter = AlertEngine::stdout(store, config.alert.threshold, config.alert.period)
        .with_evaluate_every(config.alert.evaluate_every)
        .with_metrics(metrics.clone());
    group.spawn("alerter", alerter.run(group.token()));

    info!("Workers started");
    let outcome = group.wait().await;

    match metrics.gather_metrics() {
        Ok(exposition) => debug!("Final metrics:\n{exposition}"),
        Err(e) => warn!("Failed to gather metrics: {e}"),
    }
    outcome
}

fn warn_if_beyond_retention(setting: &str, window: Duration, retention: Duration) {
    if window > retention {
        warn!(
            "{setting} of {}s exceeds the {}s retention, queries over it will under-report",
            window.as_secs(),
            retention.as_secs()
        );
    }
}
