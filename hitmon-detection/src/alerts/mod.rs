//! ## hitmon-detection::alerts
//! **High traffic alerting over the store's average rate**
//!
//! The engine polls `average_rate(period)` on its own timer and feeds the
//! hits-per-second sample through the two-state machine of [`AlertState`].
//! Notifications are written to the output sink only when the state flips.
//! A failed write is logged and the loop carries on.

mod state;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use hitmon_core::{MonitorError, RateSource};
use hitmon_telemetry::{EventLogger, MetricsRecorder};

pub use state::{format_period, AlertNotification, AlertState};

pub const DEFAULT_EVALUATE_EVERY: Duration = Duration::from_secs(1);

pub struct AlertEngine<R: RateSource, W: Write + Send = io::Stdout> {
    source: Arc<R>,
    threshold: f64,
    period: Duration,
    evaluate_every: Duration,
    state: AlertState,
    out: W,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl<R: RateSource> AlertEngine<R> {
    /// Engine writing its notifications to stdout.
    pub fn stdout(source: Arc<R>, threshold: f64, period: Duration) -> Self {
        Self::new(source, threshold, period, io::stdout())
    }
}

impl<R: RateSource, W: Write + Send> AlertEngine<R, W> {
    pub fn new(source: Arc<R>, threshold: f64, period: Duration, out: W) -> Self {
        Self {
            source,
            threshold,
            period,
            evaluate_every: DEFAULT_EVALUATE_EVERY,
            state: AlertState::default(),
            out,
            metrics: None,
        }
    }

    pub fn with_evaluate_every(mut self, evaluate_every: Duration) -> Self {
        self.evaluate_every = evaluate_every;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Takes one rate sample and applies the resulting transition.
    pub fn evaluate(&mut self) -> Option<AlertNotification> {
        let hits_per_sec = self.source.average_rate(self.period).hits_per_sec;
        let (next, notification) = self
            .state
            .transition(hits_per_sec, self.threshold, self.period);
        self.state = next;

        match &notification {
            Some(notification) => self.publish(notification, hits_per_sec),
            None => debug!(hits_per_sec, state = ?self.state, "alert evaluated"),
        }
        notification
    }

    fn publish(&mut self, notification: &AlertNotification, hits_per_sec: f64) {
        if let Err(e) = writeln!(self.out, "{}", notification.render()).and_then(|_| self.out.flush())
        {
            warn!("Failed to write alert notification: {e}");
        }

        let (event_type, alerting) = match notification {
            AlertNotification::Raised { .. } => ("alert_raised", 1),
            AlertNotification::Recovered => ("alert_recovered", 0),
        };
        if let Some(metrics) = &self.metrics {
            metrics.alert_transitions.inc();
            metrics.alerting.set(alerting);
        }
        EventLogger::log_event(
            event_type,
            vec![
                KeyValue::new("hits_per_sec", hits_per_sec),
                KeyValue::new("threshold", self.threshold),
                KeyValue::new("period", format_period(self.period)),
            ],
        );
    }

    /// Evaluates on every tick until `cancel` fires. The first evaluation
    /// happens one interval after start.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), MonitorError> {
        let mut ticker = interval_at(Instant::now() + self.evaluate_every, self.evaluate_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                _ = ticker.tick() => {
                    self.evaluate();
                }
            }
        }
    }
}
