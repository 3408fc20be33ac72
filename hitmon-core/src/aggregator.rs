//! ## hitmon-core::aggregator
//! **Folds the hit stream into one bucket per second**
//!
//! One bucket is open at a time. It is flushed into the store when a hit for
//! another second arrives, or on the one second tick once the wall clock has
//! left the bucket's second, so quiet periods still publish their last
//! bucket within a tick. Buckets are only opened by hits, which keeps the
//! series sparse.
//!
//! The store only accepts strictly increasing timestamps, so hits that arrive
//! late are attributed to the earliest second still open for writing: the
//! open bucket if there is one, otherwise the second after the last flush.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use hitmon_telemetry::MetricsRecorder;

use crate::bucket::Bucket;
use crate::clock::{Clock, SystemClock};
use crate::error::MonitorError;
use crate::event::HitEvent;
use crate::store::TimeSeriesStore;

pub const FLUSH_TICK: Duration = Duration::from_secs(1);

pub struct Aggregator<C: Clock = SystemClock> {
    store: Arc<TimeSeriesStore<C>>,
    current: Option<Bucket>,
    last_flushed: Option<DateTime<Utc>>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl<C: Clock> Aggregator<C> {
    pub fn new(store: Arc<TimeSeriesStore<C>>) -> Self {
        Self {
            store,
            current: None,
            last_flushed: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The bucket currently being filled, if any.
    pub fn current(&self) -> Option<&Bucket> {
        self.current.as_ref()
    }

    /// Accounts one hit, flushing the open bucket first if the hit belongs
    /// to a later second.
    pub fn observe(&mut self, hit: &HitEvent) {
        let second = self.slot_for(hit.second());
        if self
            .current
            .as_ref()
            .is_some_and(|open| open.timestamp() != second)
        {
            self.flush();
        }

        self.current
            .get_or_insert_with(|| Bucket::open(second))
            .record(hit);

        if let Some(metrics) = &self.metrics {
            metrics.hits_ingested.inc();
        }
    }

    /// Flushes the open bucket once the clock has moved past its second.
    pub fn tick(&mut self) {
        let now = self.store.now().trunc_subsecs(0);
        if self
            .current
            .as_ref()
            .is_some_and(|open| open.timestamp() != now)
        {
            self.flush();
        }
    }

    fn slot_for(&self, second: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(open) = &self.current {
            return second.max(open.timestamp());
        }
        match self.last_flushed {
            Some(last) if second <= last => last
                .checked_add_signed(TimeDelta::seconds(1))
                .unwrap_or(last),
            _ => second,
        }
    }

    fn flush(&mut self) {
        let Some(bucket) = self.current.take() else {
            return;
        };
        let timestamp = bucket.timestamp();
        let hits = bucket.total_hits();
        self.last_flushed = Some(timestamp);

        match self.store.insert(bucket) {
            Ok(evicted) => {
                trace!(%timestamp, hits, evicted, "bucket flushed");
                if let Some(metrics) = &self.metrics {
                    metrics.buckets_flushed.inc();
                    metrics.buckets_evicted.inc_by(evicted as u64);
                }
            }
            Err(e) => warn!("Dropping bucket at {timestamp}: {e}"),
        }
    }

    /// Consumes hits until the stream closes or `cancel` fires.
    ///
    /// When the stream closes the open bucket is not flushed: nothing
    /// downstream is waiting for it once input has ended.
    pub async fn run(
        mut self,
        mut hits: mpsc::Receiver<HitEvent>,
        cancel: CancellationToken,
    ) -> Result<(), MonitorError> {
        let mut ticker = interval_at(Instant::now() + FLUSH_TICK, FLUSH_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                _ = ticker.tick() => self.tick(),
                hit = hits.recv() => match hit {
                    Some(hit) => self.observe(&hit),
                    None => {
                        debug!("Hit stream closed, aggregator stopping");
                        return Ok(());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::Section;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn hit_at(millis: i64, section: &str, bytes: u64) -> HitEvent {
        HitEvent {
            method: "GET".into(),
            timestamp: t0() + TimeDelta::milliseconds(millis),
            status: 200,
            bytes_sent: bytes,
            section: Section::new(section),
        }
    }

    fn setup() -> (Aggregator<ManualClock>, Arc<TimeSeriesStore<ManualClock>>, ManualClock) {
        let clock = ManualClock::new(t0());
        let store = Arc::new(TimeSeriesStore::new(Duration::from_secs(120), clock.clone()).unwrap());
        (Aggregator::new(store.clone()), store, clock)
    }

    #[test]
    fn same_second_accumulates() {
        let (mut agg, store, _) = setup();
        agg.observe(&hit_at(100, "/api", 10));
        agg.observe(&hit_at(900, "/api", 20));
        agg.observe(&hit_at(950, "/img", 5));

        let open = agg.current().unwrap();
        assert_eq!(open.timestamp(), t0());
        assert_eq!(open.total_hits(), 3);
        assert_eq!(open.total_bytes(), 35);
        assert_eq!(open.per_section_hits()[&Section::new("/api")], 2);
        assert!(store.is_empty());
    }

    #[test]
    fn next_second_flushes_previous_bucket() {
        let (mut agg, store, clock) = setup();
        agg.observe(&hit_at(0, "/api", 10));
        agg.observe(&hit_at(1_200, "/api", 10));
        clock.set(t0() + TimeDelta::seconds(1));

        assert_eq!(store.len(), 1);
        assert_eq!(store.rows_since(Duration::from_secs(5))[0].timestamp(), t0());
        assert_eq!(agg.current().unwrap().timestamp(), t0() + TimeDelta::seconds(1));
    }

    #[test]
    fn tick_flushes_only_after_second_ends() {
        let (mut agg, store, clock) = setup();
        clock.set(t0() + TimeDelta::milliseconds(300));
        agg.observe(&hit_at(200, "/api", 10));

        clock.set(t0() + TimeDelta::milliseconds(999));
        agg.tick();
        assert!(store.is_empty());
        assert!(agg.current().is_some());

        clock.set(t0() + TimeDelta::milliseconds(1_001));
        agg.tick();
        assert_eq!(store.len(), 1);
        assert!(agg.current().is_none());

        // No new bucket until the next hit.
        agg.tick();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn late_hits_join_the_open_bucket() {
        let (mut agg, store, _) = setup();
        agg.observe(&hit_at(5_000, "/api", 1));
        agg.observe(&hit_at(3_000, "/old", 1));

        let open = agg.current().unwrap();
        assert_eq!(open.timestamp(), t0() + TimeDelta::seconds(5));
        assert_eq!(open.total_hits(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn late_hits_after_flush_move_to_next_second() {
        let (mut agg, store, clock) = setup();
        agg.observe(&hit_at(5_000, "/api", 1));
        clock.set(t0() + TimeDelta::seconds(6));
        agg.tick();

        agg.observe(&hit_at(5_500, "/api", 1));
        assert_eq!(agg.current().unwrap().timestamp(), t0() + TimeDelta::seconds(6));

        agg.observe(&hit_at(7_000, "/api", 1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn flush_updates_metrics() {
        let (agg, _, clock) = setup();
        let metrics = Arc::new(MetricsRecorder::new().unwrap());
        let mut agg = agg.with_metrics(metrics.clone());

        agg.observe(&hit_at(0, "/api", 1));
        agg.observe(&hit_at(10, "/api", 1));
        clock.set(t0() + TimeDelta::seconds(2));
        agg.tick();

        assert_eq!(metrics.hits_ingested.get(), 2);
        assert_eq!(metrics.buckets_flushed.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_flushes_on_tick_and_stops_on_close() {
        let (agg, store, clock) = setup();
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(agg.run(rx, CancellationToken::new()));

        tx.send(hit_at(0, "/api", 100)).await.unwrap();
        tx.send(hit_at(400, "/api", 100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        clock.set(t0() + TimeDelta::seconds(1));
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.average_rate(Duration::from_secs(1)).hits_per_sec, 2.0);

        // A bucket still open when the stream closes is not flushed.
        tx.send(hit_at(1_500, "/api", 100)).await.unwrap();
        drop(tx);
        assert!(task.await.unwrap().is_ok());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_observes_cancellation() {
        let (agg, _, _) = setup();
        let (_tx, rx) = mpsc::channel::<HitEvent>(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(agg.run(rx, cancel.clone()));

        cancel.cancel();
        let result = task.await.unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }

    proptest! {
        #[test]
        fn stored_buckets_are_never_empty(offsets in prop::collection::vec(0i64..20_000, 1..200)) {
            let (mut agg, store, clock) = setup();
            for millis in offsets {
                clock.set(t0() + TimeDelta::milliseconds(millis));
                agg.observe(&hit_at(millis, "/api", 1));
                agg.tick();
            }
            for bucket in store.rows_since(Duration::from_secs(3600)) {
                prop_assert!(bucket.total_hits() > 0);
            }
        }
    }
}
