//! HTTP tests for the read-only query surface.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use beacon_channel::BroadcastTransport;
use beacon_db::{create_pool, run_migrations, DbRuntimeSettings, MEMORY_PATH};
use beacon_eventlog::LogRecord;
use beacon_server::config::Config;
use beacon_server::{app, AppState};
use beacon_timeseries::Labels;
use beacon_types::{Event, EventPayload};
use serde_json::Value;
use tower::ServiceExt; // for oneshot

fn make_state() -> AppState {
    let pool = create_pool(MEMORY_PATH, DbRuntimeSettings::default()).expect("pool");
    run_migrations(&pool.get().expect("connection")).expect("migrations");
    AppState::new(pool, Arc::new(BroadcastTransport::default()), &Config::default())
}

async fn seed_log(state: &AppState, origin: &str, timestamp: i64, payload: EventPayload) {
    let event = Event::new(origin, timestamp, payload, BTreeMap::new()).expect("valid event");
    state
        .event_log
        .insert(LogRecord::new(event, timestamp + 1))
        .await
        .expect("insert");
}

async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec(), content_type)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body, _) = get(router, uri).await;
    (status, serde_json::from_slice(&body).expect("JSON body"))
}

#[tokio::test]
async fn health_check_returns_ok() {
    let (status, json) = get_json(app(make_state()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json.get("subscriber").is_none());
}

#[tokio::test]
async fn health_reports_attached_subscriber() {
    let state = make_state();
    let transport = Arc::new(BroadcastTransport::default());
    let subscriber = state.subscriber(transport, &Config::default());
    let state = state.with_subscriber(&subscriber);

    let (_, json) = get_json(app(state), "/health").await;
    assert_eq!(json["subscriber"]["state"], "disconnected");
    assert_eq!(json["subscriber"]["counters"]["received"], 0);
}

#[tokio::test]
async fn log_query_paginates_under_filter() {
    let state = make_state();
    for t in 1..=15 {
        let payload = EventPayload::error_occurred("boom", "fetch", None).unwrap();
        seed_log(&state, "svc-a", t * 100, payload).await;
    }
    for t in 1..=5 {
        seed_log(&state, "svc-b", t * 100 + 50, EventPayload::data_fetched(None, None, None)).await;
    }

    let (status, json) = get_json(
        app(state),
        "/api/logs?eventType=ERROR_OCCURRED&page=1&limit=10",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let records = json["records"].as_array().expect("records array");
    assert_eq!(records.len(), 10);
    assert!(records.iter().all(|r| r["eventType"] == "ERROR_OCCURRED"));
    let times: Vec<i64> = records
        .iter()
        .map(|r| r["timestamp"].as_i64().unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(times[0], 1_500);
    assert_eq!(json["total"], 15);
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["pageSize"], 10);
    assert_eq!(records[0]["receivedAt"], 1_501);
}

#[tokio::test]
async fn log_query_filters_by_service_and_dates() {
    let state = make_state();
    seed_log(&state, "svc-a", 1_000, EventPayload::data_fetched(None, None, None)).await;
    seed_log(&state, "svc-b", 2_000, EventPayload::data_fetched(None, None, None)).await;
    seed_log(&state, "svc-b", 3_000, EventPayload::data_fetched(None, None, None)).await;

    let (status, json) = get_json(
        app(state),
        "/api/logs?serviceId=svc-b&startDate=1970-01-01T00:00:01.500Z&endDate=2500",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["records"][0]["timestamp"], 2_000);
}

#[tokio::test]
async fn log_query_rejects_bad_parameters() {
    let router = app(make_state());

    let (status, json) = get_json(router.clone(), "/api/logs?eventType=NOPE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("NOPE"));

    let (status, json) = get_json(router, "/api/logs?startDate=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("startDate"));
}

#[tokio::test]
async fn log_stats_group_by_kind_and_origin() {
    let state = make_state();
    seed_log(&state, "svc-a", 100, EventPayload::data_fetched(None, None, None)).await;
    seed_log(&state, "svc-a", 200, EventPayload::data_fetched(None, None, None)).await;
    seed_log(
        &state,
        "svc-b",
        300,
        EventPayload::search_performed("", Some(0), None, None, None),
    )
    .await;

    let (status, json) = get_json(app(state), "/api/logs/stats?startDate=0&endDate=250").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalCount"], 2);
    assert_eq!(json["countByKind"][0]["key"], "DATA_FETCHED");
    assert_eq!(json["countByKind"][0]["count"], 2);
    assert_eq!(json["countByOrigin"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recent_logs_respect_limit() {
    let state = make_state();
    for t in 1..=5 {
        seed_log(&state, "svc-a", t, EventPayload::data_fetched(None, None, None)).await;
    }

    let (status, json) = get_json(app(state), "/api/logs/recent?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["records"][0]["timestamp"], 5);
}

async fn seed_series(state: &AppState) {
    let key = "ts:events:DATA_FETCHED:records";
    for (t, v) in [(10, 1.0), (20, 2.0), (30, 3.0)] {
        state.series.append(key, t, v, Labels::new()).await.unwrap();
    }
    state
        .series
        .append("ts:events:ERROR_OCCURRED:count", 20, 1.0, Labels::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn timeseries_keys_are_listed() {
    let state = make_state();
    seed_series(&state).await;

    let (status, json) = get_json(app(state), "/api/timeseries/keys").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["keys"],
        serde_json::json!(["ts:events:DATA_FETCHED:records", "ts:events:ERROR_OCCURRED:count"])
    );
}

#[tokio::test]
async fn timeseries_range_is_inclusive() {
    let state = make_state();
    seed_series(&state).await;

    let (status, json) = get_json(
        app(state),
        "/api/timeseries?key=ts:events:DATA_FETCHED:records&startDate=15&endDate=30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["samples"],
        serde_json::json!([
            { "timestamp": 20, "value": 2.0 },
            { "timestamp": 30, "value": 3.0 }
        ])
    );
}

#[tokio::test]
async fn timeseries_requires_key() {
    let (status, json) = get_json(app(make_state()), "/api/timeseries?startDate=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("key"));
}

#[tokio::test]
async fn all_timeseries_are_returned_for_window() {
    let state = make_state();
    seed_series(&state).await;

    let (status, json) = get_json(app(state), "/api/timeseries/all?startDate=0&endDate=15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["series"]["ts:events:DATA_FETCHED:records"],
        serde_json::json!([{ "timestamp": 10, "value": 1.0 }])
    );
    assert_eq!(
        json["series"]["ts:events:ERROR_OCCURRED:count"],
        serde_json::json!([])
    );
}

#[tokio::test]
async fn report_renders_html() {
    let state = make_state();
    seed_series(&state).await;

    let (status, body, content_type) = get(app(state), "/api/reports?startDate=0&endDate=3600000").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Event Analytics Report"));
    assert!(html.contains("Data Fetched - Records"));
    assert!(html.contains("Error Occurred - Count"));
}

#[tokio::test]
async fn report_rejects_reversed_window() {
    let (status, json) =
        get_json(app(make_state()), "/api/reports?startDate=2000&endDate=1000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn report_times_out_with_gateway_timeout() {
    let mut state = make_state();
    seed_series(&state).await;
    state.report_timeout = Duration::ZERO;

    let (status, json) = get_json(app(state), "/api/reports?startDate=0&endDate=100").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn report_rejects_out_of_range_window() {
    let (status, json) = get_json(
        app(make_state()),
        "/api/reports?startDate=-9223372036854775808&endDate=9223372036854775807",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn timeseries_rejects_out_of_range_window() {
    let (status, _) = get_json(
        app(make_state()),
        "/api/timeseries/all?startDate=0&endDate=9223372036854775807",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn series_info_describes_a_series() {
    let state = make_state();
    seed_series(&state).await;

    let (status, json) = get_json(
        app(state),
        "/api/timeseries/info?key=ts:events:DATA_FETCHED:records",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "ts:events:DATA_FETCHED:records");
    assert_eq!(json["sampleCount"], 3);
    assert_eq!(json["firstTimestamp"], 10);
    assert_eq!(json["lastTimestamp"], 30);
}

#[tokio::test]
async fn series_info_for_unknown_or_missing_key() {
    let router = app(make_state());

    let (status, json) = get_json(router.clone(), "/api/timeseries/info?key=ts:events:NOPE:count").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("ts:events:NOPE:count"));

    let (status, _) = get_json(router, "/api/timeseries/info").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
