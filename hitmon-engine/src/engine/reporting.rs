//! Periodic traffic summary: busiest sections and average rates over a
//! trailing window.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use hitmon_core::{MonitorError, Rate, RateSource, SectionRanking, SectionStats};
use hitmon_detection::format_period;

/// One summary, computed from a single look at the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub window: Duration,
    pub requested: usize,
    pub top: Vec<SectionStats>,
    pub rate: Rate,
}

impl StatsReport {
    pub fn sections_line(&self) -> String {
        let entries: Vec<String> = self.top.iter().map(ToString::to_string).collect();
        format!(
            "Top {} sections in the last {}: [{}]",
            self.requested,
            format_period(self.window),
            entries.join(" ")
        )
    }

    pub fn rates_line(&self) -> String {
        format!(
            "Average req/s: {:.1}, Average throughput: {:.1} B/s",
            self.rate.hits_per_sec, self.rate.bytes_per_sec
        )
    }
}

pub struct StatsReporter<S: RateSource + SectionRanking> {
    source: Arc<S>,
    interval: Duration,
    window: Duration,
    top_sections: usize,
}

impl<S: RateSource + SectionRanking> StatsReporter<S> {
    pub fn new(source: Arc<S>, interval: Duration, window: Duration, top_sections: usize) -> Self {
        Self {
            source,
            interval,
            window,
            top_sections,
        }
    }

    pub fn snapshot(&self) -> StatsReport {
        StatsReport {
            window: self.window,
            requested: self.top_sections,
            top: self.source.top_sections(self.top_sections, self.window),
            rate: self.source.average_rate(self.window),
        }
    }

    pub fn report(&self) -> StatsReport {
        let report = self.snapshot();
        info!("{}", report.sections_line());
        info!("{}", report.rates_line());
        report
    }

    /// Reports every interval until `cancel` fires, starting one interval in.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), MonitorError> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }
}
