//! One second of aggregated traffic.

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};

use crate::event::{HitEvent, Section};

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    timestamp: DateTime<Utc>,
    total_hits: u64,
    total_bytes: u64,
    per_section_hits: HashMap<Section, u64>,
}

impl Bucket {
    /// Opens an empty bucket for the second containing `at`.
    pub fn open(at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.trunc_subsecs(0),
            total_hits: 0,
            total_bytes: 0,
            per_section_hits: HashMap::new(),
        }
    }

    pub fn record(&mut self, hit: &HitEvent) {
        self.total_hits += 1;
        self.total_bytes += hit.bytes_sent;
        *self
            .per_section_hits
            .entry(hit.section.clone())
            .or_insert(0) += 1;
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn per_section_hits(&self) -> &HashMap<Section, u64> {
        &self.per_section_hits
    }
}
