//! ## hitmon-core::store
//! **Retention-bounded, second-resolution time series of traffic buckets**
//!
//! Buckets are kept oldest first and strictly increasing by timestamp. The
//! series is sparse: seconds without traffic have no bucket. A single
//! `parking_lot::RwLock` lets the alert engine and the reporter query
//! concurrently while the aggregator's inserts take the lock exclusively.
//!
//! Window queries include a bucket when its age, truncated down to whole
//! seconds, is at most the window. A bucket sitting on the boundary is
//! therefore counted rather than dropped.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::bucket::Bucket;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::event::Section;

/// Average traffic over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rate {
    pub hits_per_sec: f64,
    pub bytes_per_sec: f64,
}

/// Hits received by one section over a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStats {
    pub section: Section,
    pub hits: u64,
}

impl fmt::Display for SectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'Section {} got {} hits'", self.section, self.hits)
    }
}

/// Average rate capability, the only thing the alert engine needs.
pub trait RateSource: Send + Sync {
    fn average_rate(&self, window: Duration) -> Rate;
}

/// Busiest sections capability used by the statistics reporter.
pub trait SectionRanking: Send + Sync {
    fn top_sections(&self, n: usize, window: Duration) -> Vec<SectionStats>;
}

pub struct TimeSeriesStore<C: Clock = SystemClock> {
    retention: Duration,
    clock: C,
    buckets: RwLock<VecDeque<Bucket>>,
}

impl TimeSeriesStore<SystemClock> {
    pub fn with_system_clock(retention: Duration) -> Result<Self, StoreError> {
        Self::new(retention, SystemClock)
    }
}

impl<C: Clock> TimeSeriesStore<C> {
    /// Creates an empty store. `retention` must be a whole number of seconds.
    pub fn new(retention: Duration, clock: C) -> Result<Self, StoreError> {
        if retention.subsec_nanos() != 0 {
            return Err(StoreError::RetentionNotWholeSeconds(retention));
        }
        let capacity = usize::try_from(retention.as_secs()).unwrap_or(usize::MAX).min(1 << 16);
        Ok(Self {
            retention,
            clock,
            buckets: RwLock::new(VecDeque::with_capacity(capacity)),
        })
    }

    #[inline]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    #[inline]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }

    /// Appends `bucket` and evicts every bucket older than the retention.
    /// Returns the number of evicted buckets.
    ///
    /// A bucket that is not strictly newer than the latest stored one is
    /// rejected and the store is left untouched.
    pub fn insert(&self, bucket: Bucket) -> Result<usize, StoreError> {
        let mut buckets = self.buckets.write();
        if let Some(newest) = buckets.back() {
            if bucket.timestamp() <= newest.timestamp() {
                return Err(StoreError::OutOfOrder {
                    timestamp: bucket.timestamp(),
                    newest: newest.timestamp(),
                });
            }
        }
        buckets.push_back(bucket);

        let now = self.clock.now();
        let mut evicted = 0;
        while buckets
            .front()
            .is_some_and(|oldest| age(now, oldest.timestamp()) > self.retention)
        {
            buckets.pop_front();
            evicted += 1;
        }
        Ok(evicted)
    }

    /// Buckets inside `window`, most recent first.
    pub fn rows_since(&self, window: Duration) -> Vec<Bucket> {
        let buckets = self.buckets.read();
        let start = window_start(&buckets, self.clock.now(), window);
        buckets.range(start..).rev().cloned().collect()
    }

    /// Sums over `window` divided by the window length in whole seconds.
    ///
    /// The divisor is the requested window even when the store holds less
    /// history, so rates under-report until a full window has been observed.
    pub fn average_rate(&self, window: Duration) -> Rate {
        let secs = window.as_secs();
        if secs == 0 {
            return Rate::default();
        }

        let buckets = self.buckets.read();
        let start = window_start(&buckets, self.clock.now(), window);
        let (hits, bytes) = buckets
            .range(start..)
            .fold((0u64, 0u64), |(hits, bytes), bucket| {
                (hits + bucket.total_hits(), bytes + bucket.total_bytes())
            });

        let secs = secs as f64;
        Rate {
            hits_per_sec: hits as f64 / secs,
            bytes_per_sec: bytes as f64 / secs,
        }
    }

    /// The `n` sections with the most hits over `window`. Equal counts are
    /// ordered by section name so repeated queries agree.
    pub fn top_sections(&self, n: usize, window: Duration) -> Vec<SectionStats> {
        let mut merged: HashMap<Section, u64> = HashMap::new();
        {
            let buckets = self.buckets.read();
            let start = window_start(&buckets, self.clock.now(), window);
            for bucket in buckets.range(start..) {
                for (section, hits) in bucket.per_section_hits() {
                    *merged.entry(section.clone()).or_insert(0) += hits;
                }
            }
        }

        let mut ranked: Vec<SectionStats> = merged
            .into_iter()
            .map(|(section, hits)| SectionStats { section, hits })
            .collect();
        ranked.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.section.cmp(&b.section)));
        ranked.truncate(n);
        ranked
    }
}

impl<C: Clock> RateSource for TimeSeriesStore<C> {
    fn average_rate(&self, window: Duration) -> Rate {
        TimeSeriesStore::average_rate(self, window)
    }
}

impl<C: Clock> SectionRanking for TimeSeriesStore<C> {
    fn top_sections(&self, n: usize, window: Duration) -> Vec<SectionStats> {
        TimeSeriesStore::top_sections(self, n, window)
    }
}

/// Age of a bucket. Buckets stamped in the future count as age zero.
#[inline]
fn age(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> Duration {
    (now - timestamp).to_std().unwrap_or(Duration::ZERO)
}

/// Index of the oldest bucket whose truncated age fits in `window`.
fn window_start(buckets: &VecDeque<Bucket>, now: DateTime<Utc>, window: Duration) -> usize {
    let inside = buckets
        .iter()
        .rev()
        .take_while(|bucket| Duration::from_secs(age(now, bucket.timestamp()).as_secs()) <= window)
        .count();
    buckets.len() - inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::HitEvent;
    use chrono::{TimeDelta, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(secs)
    }

    fn bucket(secs: i64, hits: &[(&str, u64)], bytes_per_hit: u64) -> Bucket {
        let mut bucket = Bucket::open(at(secs));
        for (section, count) in hits {
            for _ in 0..*count {
                bucket.record(&HitEvent {
                    method: "GET".into(),
                    timestamp: at(secs),
                    status: 200,
                    bytes_sent: bytes_per_hit,
                    section: Section::new(*section),
                });
            }
        }
        bucket
    }

    fn store(retention_secs: u64) -> (TimeSeriesStore<ManualClock>, ManualClock) {
        let clock = ManualClock::new(t0());
        let store = TimeSeriesStore::new(Duration::from_secs(retention_secs), clock.clone()).unwrap();
        (store, clock)
    }

    #[test]
    fn rejects_fractional_retention() {
        let err = TimeSeriesStore::new(Duration::from_millis(1500), ManualClock::new(t0()))
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::RetentionNotWholeSeconds(_)));
    }

    #[test]
    fn empty_store_answers_zero() {
        let (store, _) = store(120);
        for window in [0, 1, 10, 120, 600] {
            let window = Duration::from_secs(window);
            assert_eq!(store.average_rate(window), Rate::default());
            assert!(store.top_sections(3, window).is_empty());
            assert!(store.rows_since(window).is_empty());
        }
    }

    #[test]
    fn average_rate_over_two_seconds() {
        let (store, clock) = store(120);
        store.insert(bucket(0, &[("/api", 5)], 100)).unwrap();
        store.insert(bucket(1, &[("/api", 15)], 100)).unwrap();
        clock.set(at(1));

        let rate = store.average_rate(Duration::from_secs(2));
        assert_eq!(rate.hits_per_sec, 10.0);
        assert_eq!(rate.bytes_per_sec, 1000.0);
    }

    #[test]
    fn average_rate_divides_by_requested_window() {
        let (store, clock) = store(120);
        store.insert(bucket(0, &[("/api", 30)], 10)).unwrap();
        clock.set(at(1));

        let rate = store.average_rate(Duration::from_secs(10));
        assert_eq!(rate.hits_per_sec, 3.0);
        assert_eq!(rate.bytes_per_sec, 30.0);
    }

    #[test]
    fn window_boundary_is_inclusive_after_truncation() {
        let (store, clock) = store(120);
        store.insert(bucket(-1, &[("/old", 1)], 0)).unwrap();
        store.insert(bucket(0, &[("/edge", 1)], 0)).unwrap();
        store.insert(bucket(2, &[("/new", 1)], 0)).unwrap();
        clock.set(at(2) + TimeDelta::milliseconds(900));

        // Ages: 3.9s, 2.9s, 0.9s; truncated 3, 2, 0.
        let rows = store.rows_since(Duration::from_secs(2));
        let stamps: Vec<_> = rows.iter().map(Bucket::timestamp).collect();
        assert_eq!(stamps, vec![at(2), at(0)]);
    }

    #[test]
    fn rows_since_is_most_recent_first() {
        let (store, clock) = store(120);
        for secs in [0, 3, 4, 9] {
            store.insert(bucket(secs, &[("/a", 1)], 0)).unwrap();
        }
        clock.set(at(9));

        let stamps: Vec<_> = store
            .rows_since(Duration::from_secs(60))
            .iter()
            .map(Bucket::timestamp)
            .collect();
        assert_eq!(stamps, vec![at(9), at(4), at(3), at(0)]);
    }

    #[test]
    fn insert_evicts_expired_buckets() {
        let (store, clock) = store(3);
        store.insert(bucket(0, &[("/a", 1)], 0)).unwrap();
        store.insert(bucket(1, &[("/a", 1)], 0)).unwrap();
        clock.set(at(4));

        // Ages at insert: 4s (evicted), 3s (kept, not older than retention), 0s.
        let evicted = store.insert(bucket(4, &[("/a", 1)], 0)).unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.rows_since(Duration::from_secs(60)).last().unwrap().timestamp(), at(1));
    }

    #[test]
    fn insert_rejects_out_of_order_bucket() {
        let (store, _) = store(120);
        store.insert(bucket(5, &[("/a", 1)], 0)).unwrap();
        let err = store.insert(bucket(5, &[("/b", 1)], 0)).unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrder { .. }));
        assert!(store.insert(bucket(4, &[("/b", 1)], 0)).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn top_sections_ranks_and_breaks_ties_by_name() {
        let (store, clock) = store(120);
        store.insert(bucket(0, &[("/b", 3), ("/c", 2)], 0)).unwrap();
        store.insert(bucket(1, &[("/a", 5), ("/b", 2)], 0)).unwrap();
        clock.set(at(1));

        let window = Duration::from_secs(10);
        let top = store.top_sections(2, window);
        assert_eq!(
            top,
            vec![
                SectionStats { section: Section::new("/a"), hits: 5 },
                SectionStats { section: Section::new("/b"), hits: 5 },
            ]
        );
        for _ in 0..10 {
            assert_eq!(store.top_sections(2, window), top);
        }
        assert_eq!(store.top_sections(10, window).len(), 3);
    }

    #[test]
    fn section_stats_display() {
        let stats = SectionStats {
            section: Section::new("/api"),
            hits: 12,
        };
        assert_eq!(stats.to_string(), "'Section /api got 12 hits'");
    }

    proptest! {
        #[test]
        fn retention_holds_after_every_insert(
            retention in 1u64..10,
            steps in prop::collection::vec((1i64..4, 0i64..1000), 1..60),
        ) {
            let (store, clock) = store(retention);
            let mut secs = 0i64;
            for (gap, lag_ms) in steps {
                secs += gap;
                clock.set(at(secs) + TimeDelta::milliseconds(lag_ms));
                store.insert(bucket(secs, &[("/a", 1)], 1)).unwrap();

                let now = store.now();
                let rows = store.rows_since(Duration::from_secs(u64::MAX / 2));
                for row in &rows {
                    prop_assert!(age(now, row.timestamp()) <= store.retention());
                }
                for pair in rows.windows(2) {
                    prop_assert!(pair[0].timestamp() > pair[1].timestamp());
                }
            }
        }
    }
}
