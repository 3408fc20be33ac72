//! ## hitmon-capture::parser
//! **Common Log Format line classifier**
//!
//! Parsing never fails. A field that cannot be read falls back to its default
//! (epoch timestamp, status 0, zero bytes) and the event still flows
//! downstream; a line that does not match the format at all becomes an event
//! made only of defaults.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hitmon_core::{HitEvent, MonitorError, Section};
use hitmon_telemetry::MetricsRecorder;

/// `127.0.0.1 - james [09/May/2018:16:00:39 +0000] "GET /report HTTP/1.0" 200 123`
static COMMON_LOG_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?P<client_ip>[^ ]*) (?P<user_identifier>[^ ]*) (?P<user_id>[^ ]*) \[(?P<date>[^\]]*)\] "(?P<http_method>[A-Z]*) (?P<http_url>[^"]*) (?P<http_version>HTTP/\d\.\d)" (?P<status_code>[^ ]*) (?P<bytes_sent>[^ ]*)"#,
    )
    .expect("access log pattern is a valid literal")
});

const DATE_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Fields captured from one line, not yet interpreted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawHit<'a> {
    pub date: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub status: &'a str,
    pub bytes: &'a str,
}

impl<'a> RawHit<'a> {
    /// Extracts the fields, or `None` if the line is not in Common Log Format.
    pub fn capture(line: &'a str) -> Option<Self> {
        let caps = COMMON_LOG_FORMAT.captures(line)?;
        let field = |name: &str| caps.name(name).map_or("", |m| m.as_str());
        Some(Self {
            date: field("date"),
            method: field("http_method"),
            path: field("http_url"),
            status: field("status_code"),
            bytes: field("bytes_sent"),
        })
    }

    pub fn into_event(self) -> HitEvent {
        let timestamp = DateTime::parse_from_str(self.date, DATE_LAYOUT)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| {
                debug!("failed to convert date {:?} into a timestamp", self.date);
                DateTime::<Utc>::default()
            });
        let status = self.status.parse().unwrap_or_else(|_| {
            debug!("failed to convert status code {:?} into an integer", self.status);
            0
        });
        let bytes_sent = self.bytes.parse().unwrap_or_else(|_| {
            debug!("failed to convert bytes sent {:?} into an integer", self.bytes);
            0
        });

        HitEvent {
            method: self.method.to_string(),
            timestamp,
            status,
            bytes_sent,
            section: Section::from_path(self.path),
        }
    }
}

/// Classifies one line.
pub fn parse_line(line: &str) -> HitEvent {
    RawHit::capture(line).unwrap_or_default().into_event()
}

/// Parses lines in arrival order until the line stream closes or `cancel`
/// fires. Dropping `hits` on return closes the aggregator's input.
pub async fn run_parser(
    mut lines: mpsc::Receiver<String>,
    hits: mpsc::Sender<HitEvent>,
    cancel: CancellationToken,
    metrics: Arc<MetricsRecorder>,
) -> Result<(), MonitorError> {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            debug!("Line stream closed, parser stopping");
            return Ok(());
        };

        let raw = RawHit::capture(&line).unwrap_or_else(|| {
            debug!(line = %line, "line does not match the access log format");
            metrics.lines_unmatched.inc();
            RawHit::default()
        });
        let hit = raw.into_event();

        tokio::select! {
            _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
            sent = hits.send(hit) => {
                if sent.is_err() {
                    debug!("Hit receiver dropped, parser stopping");
                    return Ok(());
                }
            }
        }
    }
}
