//! Hit events as produced by the access log parser.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};

/// Section of requests whose path has no first segment of its own.
pub const NO_SECTION: &str = "nosection";

/// First path segment of a request, used to group traffic (`/api`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Section(String);

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `/api/v1/x` becomes `/api`. Paths with fewer than two `/`-separated
    /// segments (`/`, `/index.html`, empty) fall into [`NO_SECTION`].
    pub fn from_path(path: &str) -> Self {
        let mut parts = path.split('/');
        let _root = parts.next();
        match (parts.next(), parts.next()) {
            (Some(first), Some(_)) => Self(format!("/{first}")),
            _ => Self(NO_SECTION.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One classified request. Fields the parser could not read hold their
/// defaults: epoch timestamp, status 0, zero bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub bytes_sent: u64,
    pub section: Section,
}

impl HitEvent {
    /// The whole second this hit belongs to.
    #[inline]
    pub fn second(&self) -> DateTime<Utc> {
        self.timestamp.trunc_subsecs(0)
    }
}
