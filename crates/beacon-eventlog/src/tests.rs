//! Unit tests for the event log.

use std::collections::BTreeMap;

use beacon_db::{create_pool, run_migrations, DbRuntimeSettings, MEMORY_PATH};
use beacon_types::{Event, EventKind, EventPayload};
use rusqlite::Connection;

use crate::record::{LogFilter, LogRecord, PageRequest};
use crate::store::{insert_record, log_stats, query_records, recent_records};
use crate::EventLogStore;

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn fetched(origin: &str, timestamp: i64) -> Event {
    Event::new(
        origin,
        timestamp,
        EventPayload::data_fetched(Some(3), None, Some(40)),
        BTreeMap::new(),
    )
    .expect("valid event")
}

fn failed(origin: &str, timestamp: i64) -> Event {
    Event::new(
        origin,
        timestamp,
        EventPayload::error_occurred("boom", "fetch", None).expect("valid payload"),
        BTreeMap::new(),
    )
    .expect("valid event")
}

fn seed(conn: &Connection, events: Vec<Event>) {
    for event in events {
        let received_at = event.timestamp() + 5;
        insert_record(conn, &LogRecord::new(event, received_at)).expect("insert should succeed");
    }
}

// ── insert ───────────────────────────────────────────────────────────

#[test]
fn insert_stores_indexed_columns_and_wire_form() {
    let conn = test_db();
    let id = insert_record(&conn, &LogRecord::new(fetched("service-a", 1_000), 1_010))
        .expect("insert should succeed");
    assert!(id > 0, "returned row ID should be positive");

    let (event_type, origin_id, occurred_at, received_at): (String, String, i64, i64) = conn
        .query_row(
            "SELECT event_type, origin_id, occurred_at, received_at FROM event_log WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .expect("should query inserted row");

    assert_eq!(event_type, "DATA_FETCHED");
    assert_eq!(origin_id, "service-a");
    assert_eq!(occurred_at, 1_000);
    assert_eq!(received_at, 1_010);
}

#[test]
fn inserted_record_reads_back_unchanged() {
    let conn = test_db();
    let event = failed("service-b", 2_000);
    insert_record(&conn, &LogRecord::new(event.clone(), 2_001)).unwrap();

    let page = query_records(&conn, &LogFilter::default(), PageRequest::default()).unwrap();
    assert_eq!(page.records, vec![LogRecord::new(event, 2_001)]);
}

// ── query ────────────────────────────────────────────────────────────

#[test]
fn query_orders_by_occurrence_descending() {
    let conn = test_db();
    seed(&conn, vec![fetched("a", 200), fetched("a", 100), fetched("a", 300)]);

    let page = query_records(&conn, &LogFilter::default(), PageRequest::default()).unwrap();
    let times: Vec<i64> = page.records.iter().map(|r| r.event.timestamp()).collect();
    assert_eq!(times, vec![300, 200, 100]);
}

#[test]
fn equal_occurrence_times_return_latest_insert_first() {
    let conn = test_db();
    seed(&conn, vec![fetched("first", 500), fetched("second", 500)]);

    let page = query_records(&conn, &LogFilter::default(), PageRequest::default()).unwrap();
    let origins: Vec<&str> = page.records.iter().map(|r| r.event.origin_id()).collect();
    assert_eq!(origins, vec!["second", "first"]);
}

#[test]
fn filters_combine_with_and() {
    let conn = test_db();
    seed(
        &conn,
        vec![
            fetched("service-a", 100),
            failed("service-a", 200),
            failed("service-b", 300),
            failed("service-a", 400),
        ],
    );

    let filter = LogFilter {
        kind: Some(EventKind::ErrorOccurred),
        origin_id: Some("service-a".to_string()),
        from_time: Some(150),
        to_time: Some(400),
    };
    let page = query_records(&conn, &filter, PageRequest::default()).unwrap();

    assert_eq!(page.total, 2);
    let times: Vec<i64> = page.records.iter().map(|r| r.event.timestamp()).collect();
    assert_eq!(times, vec![400, 200]);
}

#[test]
fn time_bounds_are_inclusive() {
    let conn = test_db();
    seed(&conn, vec![fetched("a", 10), fetched("a", 20), fetched("a", 30)]);

    let filter = LogFilter {
        from_time: Some(10),
        to_time: Some(20),
        ..Default::default()
    };
    let page = query_records(&conn, &filter, PageRequest::default()).unwrap();
    assert_eq!(page.total, 2);
}

#[test]
fn pagination_reports_totals_and_slices() {
    let conn = test_db();
    seed(&conn, (1..=25).map(|t| fetched("a", t)).collect());

    let page = query_records(&conn, &LogFilter::default(), PageRequest::new(3, 10)).unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 3);
    assert_eq!(page.page_size, 10);
    let times: Vec<i64> = page.records.iter().map(|r| r.event.timestamp()).collect();
    assert_eq!(times, vec![5, 4, 3, 2, 1]);
}

#[test]
fn page_past_the_end_is_empty_with_true_total() {
    let conn = test_db();
    seed(&conn, vec![fetched("a", 1), fetched("a", 2)]);

    let page = query_records(&conn, &LogFilter::default(), PageRequest::new(5, 10)).unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 1);
}

#[test]
fn empty_log_has_zero_pages() {
    let conn = test_db();
    let page = query_records(&conn, &LogFilter::default(), PageRequest::default()).unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.total_pages, 0);
}

#[test]
fn page_request_is_normalised() {
    let request = PageRequest::new(0, 0);
    assert_eq!(request.page(), 1);
    assert_eq!(request.page_size(), 1);

    let request = PageRequest::new(2, 50_000);
    assert_eq!(request.page_size(), PageRequest::MAX_PAGE_SIZE);
    assert_eq!(request.offset(), 1_000);

    assert_eq!(PageRequest::default().page_size(), 50);
}

#[test]
fn corrupt_row_surfaces_as_error() {
    let conn = test_db();
    conn.execute(
        "INSERT INTO event_log (event_type, origin_id, occurred_at, received_at, event_json)
         VALUES ('DATA_FETCHED', 'a', 1, 1, 'not json')",
        [],
    )
    .unwrap();

    let result = query_records(&conn, &LogFilter::default(), PageRequest::default());
    assert!(matches!(result, Err(beacon_db::StoreError::Corrupt(_))));
}

// ── stats ────────────────────────────────────────────────────────────

#[test]
fn stats_group_by_kind_and_origin_sorted_descending() {
    let conn = test_db();
    seed(
        &conn,
        vec![
            fetched("service-a", 1),
            fetched("service-b", 2),
            fetched("service-b", 3),
            failed("service-b", 4),
        ],
    );

    let stats = log_stats(&conn, None, None).unwrap();
    assert_eq!(stats.total_count, 4);
    assert_eq!(stats.count_by_kind[0].key, "DATA_FETCHED");
    assert_eq!(stats.count_by_kind[0].count, 3);
    assert_eq!(stats.kind_count(EventKind::ErrorOccurred), 1);
    assert_eq!(stats.kind_count(EventKind::FileUploaded), 0);
    assert_eq!(stats.count_by_origin[0].key, "service-b");
    assert_eq!(stats.origin_count("service-a"), 1);
}

#[test]
fn stats_respect_time_window() {
    let conn = test_db();
    seed(&conn, vec![fetched("a", 10), failed("a", 20), failed("b", 30)]);

    let stats = log_stats(&conn, Some(15), Some(25)).unwrap();
    assert_eq!(stats.total_count, 1);
    assert_eq!(stats.count_by_kind.len(), 1);
    assert_eq!(stats.kind_count(EventKind::ErrorOccurred), 1);
    assert_eq!(stats.origin_count("b"), 0);
}

#[test]
fn stats_on_empty_log_are_zero() {
    let conn = test_db();
    let stats = log_stats(&conn, None, None).unwrap();
    assert_eq!(stats.total_count, 0);
    assert!(stats.count_by_kind.is_empty());
    assert!(stats.count_by_origin.is_empty());
}

// ── recent ───────────────────────────────────────────────────────────

#[test]
fn recent_returns_latest_occurrences() {
    let conn = test_db();
    seed(&conn, (1..=5).map(|t| fetched("a", t * 100)).collect());

    let records = recent_records(&conn, 2).unwrap();
    let times: Vec<i64> = records.iter().map(|r| r.event.timestamp()).collect();
    assert_eq!(times, vec![500, 400]);
}

// ── pooled handle ────────────────────────────────────────────────────

#[tokio::test]
async fn pooled_handle_round_trips() {
    let pool = create_pool(MEMORY_PATH, DbRuntimeSettings::default()).expect("pool");
    {
        let conn = pool.get().expect("connection");
        run_migrations(&conn).expect("migrations");
    }
    let store = EventLogStore::new(pool);

    store.insert(LogRecord::new(fetched("a", 1), 2)).await.unwrap();
    store.insert(LogRecord::new(failed("a", 3), 4)).await.unwrap();

    let page = store
        .query(LogFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let stats = store.stats(None, None).await.unwrap();
    assert_eq!(stats.total_count, 2);

    let recent = store.recent(1).await.unwrap();
    assert_eq!(recent[0].event.kind(), EventKind::ErrorOccurred);
}
