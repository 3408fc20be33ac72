#[macro_use]
extern crate criterion;

use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use criterion::Criterion;

use hitmon_core::prelude::{Bucket, HitEvent, ManualClock, Section, TimeSeriesStore};

fn filled_store(retention_secs: i64) -> TimeSeriesStore<ManualClock> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let store = TimeSeriesStore::new(Duration::from_secs(retention_secs as u64), clock.clone())
        .unwrap();

    for secs in 0..retention_secs {
        let at = start + TimeDelta::seconds(secs);
        let mut bucket = Bucket::open(at);
        for i in 0..50 {
            bucket.record(&HitEvent {
                method: "GET".into(),
                timestamp: at,
                status: 200,
                bytes_sent: 512,
                section: Section::new(format!("/s{}", i % 12)),
            });
        }
        clock.set(at);
        store.insert(bucket).unwrap();
    }
    store
}

fn bench_store_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_queries");

    for retention in [10, 120, 600] {
        let store = filled_store(retention);
        let window = Duration::from_secs(retention as u64);
        group.throughput(criterion::Throughput::Elements(retention as u64));
        group.bench_function(format!("average_rate_{}s", retention), |b| {
            b.iter(|| store.average_rate(window))
        });
        group.bench_function(format!("top_sections_{}s", retention), |b| {
            b.iter(|| store.top_sections(3, window))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_store_queries);
criterion_main!(benches);
