// SqliteStore tests: connect, open, write, names, grouped reads at each granularity

mod common;

use std::collections::HashMap;

use chilada::bucket::BucketKey;
use chilada::models::{Count, Interval, Snapshot, Timing};
use chilada::store::{SqliteStore, Store};
use chrono::{DateTime, Duration, Utc};
use common::utc;
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join("chilada.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 2).await.unwrap();
    store.open().await.unwrap();
    store
}

fn counts_snapshot(ts: DateTime<Utc>, counts: &[(&str, i64)]) -> Snapshot {
    Snapshot {
        timestamp: ts,
        counts: counts
            .iter()
            .map(|(n, v)| (n.to_string(), Count { value: *v }))
            .collect(),
        timings: HashMap::new(),
    }
}

async fn count_rows(dir: &TempDir, table: &str) -> i64 {
    let path = dir.path().join("chilada.db");
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", path.to_str().unwrap()))
        .await
        .unwrap();
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn store_connect_and_open() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    // Second open is no-op (IF NOT EXISTS)
    store.open().await.unwrap();
    assert!(store.names().await.unwrap().is_empty());
}

#[tokio::test]
async fn store_connect_creates_parent_dir() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deeper/chilada.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 1).await.unwrap();
    store.open().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn store_write_empty_snapshot_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .write(&counts_snapshot(utc(2024, 1, 1, 0, 0, 0), &[]))
        .await
        .unwrap();
    assert_eq!(count_rows(&dir, "counts").await, 0);
    assert_eq!(count_rows(&dir, "timings").await, 0);
    assert!(store.names().await.unwrap().is_empty());
}

#[tokio::test]
async fn store_write_records_counts_and_timings() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let snapshot = Snapshot {
        timestamp: utc(2024, 1, 1, 12, 0, 10),
        counts: HashMap::from([("b.count".to_string(), Count { value: 5 })]),
        timings: HashMap::from([(
            "a.timing".to_string(),
            Timing {
                sum: 30,
                count: 3,
                min: 5,
                max: 15,
            },
        )]),
    };
    store.write(&snapshot).await.unwrap();
    assert_eq!(count_rows(&dir, "counts").await, 1);
    assert_eq!(count_rows(&dir, "timings").await, 1);
    assert_eq!(store.names().await.unwrap(), vec!["a.timing", "b.count"]);
}

#[tokio::test]
async fn store_names_are_sorted_and_unique() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .write(&counts_snapshot(utc(2024, 1, 1, 0, 0, 0), &[("zeta", 1), ("alpha", 1)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2024, 1, 1, 0, 0, 10), &[("alpha", 2)]))
        .await
        .unwrap();
    assert_eq!(store.names().await.unwrap(), vec!["alpha", "zeta"]);
}

#[tokio::test]
async fn store_read_short_interval_returns_each_write() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let base = utc(2024, 6, 1, 8, 0, 0);
    for i in 0..6 {
        store
            .write(&counts_snapshot(base + Duration::seconds(10 * i), &[("hits", i + 1)]))
            .await
            .unwrap();
    }

    let interval = Interval::new(base, base + Duration::minutes(10)).unwrap();
    let results = store.read("hits", interval).await.unwrap();
    assert_eq!(results.name, "hits");
    assert_eq!(results.rows.len(), 6);
    for (i, r) in results.rows.iter().enumerate() {
        assert_eq!(r.time, base + Duration::seconds(10 * i as i64));
        assert_eq!(r.value, (i + 1) as f64);
    }
}

#[tokio::test]
async fn store_read_groups_by_hour_for_day_interval() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .write(&counts_snapshot(utc(2024, 6, 1, 8, 0, 0), &[("hits", 2)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2024, 6, 1, 8, 59, 50), &[("hits", 6)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2024, 6, 1, 9, 0, 0), &[("hits", 1)]))
        .await
        .unwrap();
    // Outside the interval.
    store
        .write(&counts_snapshot(utc(2024, 6, 3, 9, 0, 0), &[("hits", 1000)]))
        .await
        .unwrap();

    let interval = Interval::new(utc(2024, 6, 1, 0, 0, 0), utc(2024, 6, 2, 0, 0, 0)).unwrap();
    let results = store.read("hits", interval).await.unwrap();
    assert_eq!(results.rows.len(), 2);
    assert_eq!(results.rows[0].time, utc(2024, 6, 1, 8, 0, 0));
    assert_eq!(results.rows[0].value, 4.0);
    assert_eq!(results.rows[1].time, utc(2024, 6, 1, 9, 0, 0));
    assert_eq!(results.rows[1].value, 1.0);
}

#[tokio::test]
async fn store_read_month_granularity_is_scoped_to_name() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .write(&counts_snapshot(
            utc(2023, 3, 10, 0, 0, 0),
            &[("a", 10), ("b", 999)],
        ))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2023, 3, 20, 0, 0, 0), &[("a", 20)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2023, 9, 1, 0, 0, 0), &[("a", 7)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2023, 9, 1, 0, 0, 0), &[("aa", 5000)]))
        .await
        .unwrap();

    let interval = Interval::new(utc(2023, 1, 1, 0, 0, 0), utc(2024, 1, 1, 0, 0, 0)).unwrap();
    let results = store.read("a", interval).await.unwrap();
    assert_eq!(results.rows.len(), 2);
    assert_eq!(results.rows[0].time, utc(2023, 3, 1, 0, 0, 0));
    assert_eq!(results.rows[0].value, 15.0);
    assert_eq!(results.rows[1].time, utc(2023, 9, 1, 0, 0, 0));
    assert_eq!(results.rows[1].value, 7.0);
}

#[tokio::test]
async fn store_scan_counts_returns_sum_and_count_per_prefix() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .write(&counts_snapshot(utc(2024, 2, 10, 1, 0, 0), &[("m", 3)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2024, 2, 10, 23, 0, 0), &[("m", 5)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2024, 2, 12, 0, 0, 0), &[("m", 1)]))
        .await
        .unwrap();

    let start = BucketKey::new("m", vec![2024, 2, 10]).unwrap();
    let end = BucketKey::new("m", vec![2024, 2, 11]).unwrap();
    let rows = store.scan_counts(&start, &end).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key.parts(), &[2024, 2, 10]);
    assert_eq!(rows[0].sum, 8.0);
    assert_eq!(rows[0].count, 2);
}

#[tokio::test]
async fn store_read_ignores_timings() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let ts = utc(2024, 1, 1, 0, 0, 0);
    store
        .write(&Snapshot {
            timestamp: ts,
            counts: HashMap::new(),
            timings: HashMap::from([(
                "lat".to_string(),
                Timing {
                    sum: 10,
                    count: 1,
                    min: 10,
                    max: 10,
                },
            )]),
        })
        .await
        .unwrap();
    let interval = Interval::new(ts, ts + Duration::minutes(1)).unwrap();
    assert!(store.read("lat", interval).await.unwrap().rows.is_empty());
}

#[tokio::test]
async fn store_read_survives_bucket_sum_beyond_i64() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store
        .write(&counts_snapshot(utc(2024, 3, 5, 8, 0, 0), &[("big", i64::MAX)]))
        .await
        .unwrap();
    store
        .write(&counts_snapshot(utc(2024, 3, 5, 8, 0, 10), &[("big", i64::MAX)]))
        .await
        .unwrap();

    // One day -> hourly buckets, both values land in 08:00.
    let day = Interval::new(utc(2024, 3, 5, 0, 0, 0), utc(2024, 3, 6, 0, 0, 0)).unwrap();
    let results = store.read("big", day).await.unwrap();
    assert_eq!(results.rows.len(), 1);
    assert_eq!(results.rows[0].time, utc(2024, 3, 5, 8, 0, 0));
    assert_eq!(results.rows[0].value, i64::MAX as f64);

    let minute = Interval::new(utc(2024, 3, 5, 8, 0, 0), utc(2024, 3, 5, 8, 1, 0)).unwrap();
    assert_eq!(store.read("big", minute).await.unwrap().rows.len(), 2);
}
