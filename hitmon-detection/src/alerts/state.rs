use std::fmt;
use std::time::Duration;

const WARNING_COLOR: &str = "\x1b[93m";
const SUCCESS_COLOR: &str = "\x1b[92m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    Normal,
    Alerting,
}

/// Emitted when the alert state changes, never on a steady state.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertNotification {
    Raised { hits_per_sec: f64, period: Duration },
    Recovered,
}

impl AlertState {
    /// The state a sample calls for. The threshold itself counts as high
    /// traffic, for entering and for leaving alike.
    pub fn classify(hits_per_sec: f64, threshold: f64) -> Self {
        if hits_per_sec >= threshold {
            AlertState::Alerting
        } else {
            AlertState::Normal
        }
    }

    pub fn transition(
        self,
        hits_per_sec: f64,
        threshold: f64,
        period: Duration,
    ) -> (Self, Option<AlertNotification>) {
        let desired = Self::classify(hits_per_sec, threshold);
        let notification = match (self, desired) {
            (AlertState::Normal, AlertState::Alerting) => Some(AlertNotification::Raised {
                hits_per_sec,
                period,
            }),
            (AlertState::Alerting, AlertState::Normal) => Some(AlertNotification::Recovered),
            _ => None,
        };
        (desired, notification)
    }
}

impl AlertNotification {
    /// The message wrapped in its terminal highlight.
    pub fn render(&self) -> String {
        let color = match self {
            AlertNotification::Raised { .. } => WARNING_COLOR,
            AlertNotification::Recovered => SUCCESS_COLOR,
        };
        format!("{color}{self}{RESET}")
    }
}

impl fmt::Display for AlertNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertNotification::Raised {
                hits_per_sec,
                period,
            } => write!(
                f,
                "High traffic generated an alert - hits = {hits_per_sec:.1} req/s in the last {}",
                format_period(*period)
            ),
            AlertNotification::Recovered => f.write_str("Alert recovered"),
        }
    }
}

/// Renders a duration the way operators are used to reading it in the
/// messages: `2m0s`, `1h1m1s`, `1.5s`, `250ms`.
pub fn format_period(period: Duration) -> String {
    let nanos = period.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", with_fraction(nanos / 1_000, nanos % 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", with_fraction(nanos / 1_000_000, nanos % 1_000_000, 6));
    }

    let secs = period.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&with_fraction(
        u128::from(seconds),
        u128::from(period.subsec_nanos()),
        9,
    ));
    out.push('s');
    out
}

fn with_fraction(whole: u128, rem: u128, digits: usize) -> String {
    if rem == 0 {
        return whole.to_string();
    }
    let fraction = format!("{rem:0digits$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
