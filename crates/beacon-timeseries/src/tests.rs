//! Unit tests for the time-series store.

use beacon_db::{create_pool, run_migrations, DbRuntimeSettings, MEMORY_PATH};
use rusqlite::Connection;

use crate::store::{append, append_batch, list_keys, query_range, series_info, Labels, Sample, SampleWrite};
use crate::TimeSeriesStore;

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn labels(kind: &str) -> Labels {
    Labels::from([
        ("eventType".to_string(), kind.to_string()),
        ("service".to_string(), "service-a".to_string()),
    ])
}

fn write(key: &str, timestamp: i64, value: f64) -> SampleWrite {
    SampleWrite {
        key: key.to_string(),
        timestamp,
        value,
        labels: labels("DATA_FETCHED"),
    }
}

// ── append / idempotent creation ─────────────────────────────────────

#[test]
fn append_twice_on_new_key_keeps_both_samples() {
    let conn = test_db();
    let key = "ts:events:DATA_FETCHED:count";

    append(&conn, key, 100, 1.0, &labels("DATA_FETCHED")).expect("first append should succeed");
    append(&conn, key, 200, 1.0, &labels("DATA_FETCHED")).expect("second append should succeed");

    let samples = query_range(&conn, key, 0, 1_000).unwrap();
    assert_eq!(
        samples,
        vec![
            Sample { timestamp: 100, value: 1.0 },
            Sample { timestamp: 200, value: 1.0 },
        ]
    );
}

#[test]
fn labels_are_fixed_by_first_write() {
    let conn = test_db();
    let key = "ts:events:FILE_UPLOADED:filesize";

    append(&conn, key, 1, 10.0, &labels("FILE_UPLOADED")).unwrap();
    append(&conn, key, 2, 20.0, &labels("SOMETHING_ELSE")).unwrap();

    let info = series_info(&conn, key).unwrap().expect("series should exist");
    assert_eq!(info.labels, labels("FILE_UPLOADED"));
    assert_eq!(info.sample_count, 2);
    assert_eq!(info.first_timestamp, Some(1));
    assert_eq!(info.last_timestamp, Some(2));
}

// ── query_range ──────────────────────────────────────────────────────

#[test]
fn query_range_is_inclusive() {
    let conn = test_db();
    let key = "ts:events:DATA_INSERTED:records";
    for (ts, value) in [(10, 1.0), (20, 2.0), (30, 3.0)] {
        append(&conn, key, ts, value, &Labels::new()).unwrap();
    }

    let samples = query_range(&conn, key, 15, 30).unwrap();
    assert_eq!(
        samples,
        vec![
            Sample { timestamp: 20, value: 2.0 },
            Sample { timestamp: 30, value: 3.0 },
        ]
    );
}

#[test]
fn query_range_orders_out_of_order_appends() {
    let conn = test_db();
    let key = "ts:events:SEARCH_PERFORMED:duration";
    for ts in [30, 10, 20] {
        append(&conn, key, ts, ts as f64, &Labels::new()).unwrap();
    }

    let timestamps: Vec<i64> = query_range(&conn, key, 0, 100)
        .unwrap()
        .into_iter()
        .map(|s| s.timestamp)
        .collect();
    assert_eq!(timestamps, vec![10, 20, 30]);
}

#[test]
fn query_range_unknown_key_or_empty_window_is_empty() {
    let conn = test_db();
    append(&conn, "ts:events:DATA_FETCHED:count", 50, 1.0, &Labels::new()).unwrap();

    assert!(query_range(&conn, "ts:events:NOPE:count", 0, 100).unwrap().is_empty());
    assert!(query_range(&conn, "ts:events:DATA_FETCHED:count", 60, 100).unwrap().is_empty());
    assert!(query_range(&conn, "ts:events:DATA_FETCHED:count", 100, 0).unwrap().is_empty());
}

// ── list_keys / series_info ──────────────────────────────────────────

#[test]
fn list_keys_filters_by_prefix() {
    let conn = test_db();
    for key in [
        "ts:events:DATA_FETCHED:count",
        "ts:events:DATA_FETCHED:records",
        "ts:events:ERROR_OCCURRED:count",
        "ts:other:x",
        "ts_events_lookalike",
    ] {
        append(&conn, key, 1, 1.0, &Labels::new()).unwrap();
    }

    let keys = list_keys(&conn, "ts:events:").unwrap();
    assert_eq!(
        keys.into_iter().collect::<Vec<_>>(),
        vec![
            "ts:events:DATA_FETCHED:count",
            "ts:events:DATA_FETCHED:records",
            "ts:events:ERROR_OCCURRED:count",
        ]
    );
    assert_eq!(list_keys(&conn, "").unwrap().len(), 5);
}

#[test]
fn series_info_unknown_key_is_none() {
    let conn = test_db();
    assert!(series_info(&conn, "ts:events:NOPE:count").unwrap().is_none());
}

// ── append_batch ─────────────────────────────────────────────────────

#[test]
fn batch_writes_everything_in_one_phase() {
    let conn = test_db();
    let outcome = append_batch(
        &conn,
        &[
            write("ts:events:DATA_FETCHED:count", 5, 1.0),
            write("ts:events:DATA_FETCHED:records", 5, 42.0),
            write("ts:events:DATA_FETCHED:duration", 5, 120.0),
        ],
    );

    assert_eq!(outcome.inserted, 3);
    assert!(outcome.is_complete());
    assert_eq!(list_keys(&conn, "ts:events:").unwrap().len(), 3);
}

#[test]
fn batch_falls_back_to_individual_appends_on_failure() {
    let conn = test_db();
    let outcome = append_batch(
        &conn,
        &[
            write("ts:events:DATA_FETCHED:count", 5, 1.0),
            write("", 5, 2.0),
            write("ts:events:DATA_FETCHED:records", 5, 42.0),
        ],
    );

    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].index, 1);
    assert_eq!(outcome.errors[0].key, "");

    // The rolled-back first phase must not leave duplicates behind.
    let samples = query_range(&conn, "ts:events:DATA_FETCHED:count", 0, 10).unwrap();
    assert_eq!(samples.len(), 1);
}

#[test]
fn empty_batch_is_a_no_op() {
    let conn = test_db();
    let outcome = append_batch(&conn, &[]);
    assert_eq!(outcome.inserted, 0);
    assert!(outcome.is_complete());
}

// ── async handle ─────────────────────────────────────────────────────

#[tokio::test]
async fn pooled_handle_round_trip() {
    let pool = create_pool(MEMORY_PATH, DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();
    let store = TimeSeriesStore::new(pool);

    store
        .append("ts:events:DATA_FETCHED:records", 1_000, 42.0, labels("DATA_FETCHED"))
        .await
        .unwrap();
    let outcome = store
        .append_batch(vec![write("ts:events:DATA_FETCHED:count", 1_000, 1.0)])
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 1);

    let keys = store.list_keys("ts:events:DATA_FETCHED").await.unwrap();
    assert_eq!(keys.len(), 2);

    let samples = store
        .query_range("ts:events:DATA_FETCHED:records", 0, 2_000)
        .await
        .unwrap();
    assert_eq!(samples, vec![Sample { timestamp: 1_000, value: 42.0 }]);

    let info = store
        .series_info("ts:events:DATA_FETCHED:records")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.sample_count, 1);
}
