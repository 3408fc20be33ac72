//! ## hitmon-telemetry::metrics
//! **Prometheus counters for the ingest pipeline and alerting**

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub lines_read: IntCounter,
    pub lines_unmatched: IntCounter,
    pub hits_ingested: IntCounter,
    pub buckets_flushed: IntCounter,
    pub buckets_evicted: IntCounter,
    pub alert_transitions: IntCounter,
    pub alerting: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let lines_read = IntCounter::new("hitmon_lines_read_total", "Log lines read from the file")?;
        let lines_unmatched = IntCounter::new(
            "hitmon_lines_unmatched_total",
            "Log lines that did not match the access log format",
        )?;
        let hits_ingested =
            IntCounter::new("hitmon_hits_ingested_total", "Hit events folded into buckets")?;
        let buckets_flushed =
            IntCounter::new("hitmon_buckets_flushed_total", "Buckets inserted into the store")?;
        let buckets_evicted = IntCounter::new(
            "hitmon_buckets_evicted_total",
            "Buckets dropped by the retention policy",
        )?;
        let alert_transitions = IntCounter::new(
            "hitmon_alert_transitions_total",
            "High traffic alert state changes",
        )?;
        let alerting = IntGauge::new("hitmon_alerting", "1 while the traffic alert is raised")?;

        registry.register(Box::new(lines_read.clone()))?;
        registry.register(Box::new(lines_unmatched.clone()))?;
        registry.register(Box::new(hits_ingested.clone()))?;
        registry.register(Box::new(buckets_flushed.clone()))?;
        registry.register(Box::new(buckets_evicted.clone()))?;
        registry.register(Box::new(alert_transitions.clone()))?;
        registry.register(Box::new(alerting.clone()))?;

        Ok(Self {
            registry,
            lines_read,
            lines_unmatched,
            hits_ingested,
            buckets_flushed,
            buckets_evicted,
            alert_transitions,
            alerting,
        })
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
