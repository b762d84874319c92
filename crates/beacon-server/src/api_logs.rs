//! Event log query handlers.
//!
//! Provides:
//! - `GET /api/logs`: filtered, paginated log records, newest first
//! - `GET /api/logs/stats`: counts by kind and by origin
//! - `GET /api/logs/recent`: the latest records

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
    Json,
};
use beacon_eventlog::{LogFilter, LogPage, LogRecord, LogStats, PageRequest};
use beacon_types::EventKind;
use serde::{Deserialize, Serialize};

use crate::api::{bad_request, internal_error, parse_optional_time};
use crate::AppState;

/// Query parameters for `GET /api/logs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    /// Filter by event kind (e.g., `DATA_FETCHED`).
    pub event_type: Option<String>,
    /// Filter by producing service.
    pub service_id: Option<String>,
    /// Earliest occurrence time, inclusive.
    pub start_date: Option<String>,
    /// Latest occurrence time, inclusive.
    pub end_date: Option<String>,
    /// 1-indexed page (default: 1).
    pub page: Option<u32>,
    /// Page size (default: 50, max: 1000).
    pub limit: Option<u32>,
}

/// Handler for `GET /api/logs`.
pub async fn query_logs_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogPage>, Response> {
    let kind = match params.event_type.as_deref().filter(|v| !v.is_empty()) {
        Some(raw) => Some(raw.parse::<EventKind>().map_err(|e| bad_request(e.to_string()))?),
        None => None,
    };

    let filter = LogFilter {
        kind,
        origin_id: params.service_id.filter(|v| !v.is_empty()),
        from_time: parse_optional_time("startDate", params.start_date.as_deref())?,
        to_time: parse_optional_time("endDate", params.end_date.as_deref())?,
    };
    let page = PageRequest::new(
        params.page.unwrap_or(1),
        params.limit.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
    );

    match state.event_log.query(filter, page).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => Err(internal_error(&state, "GET /api/logs", &e).await),
    }
}

/// Query parameters for `GET /api/logs/stats`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    /// Window start, inclusive.
    pub start_date: Option<String>,
    /// Window end, inclusive.
    pub end_date: Option<String>,
}

/// Handler for `GET /api/logs/stats`.
pub async fn log_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<LogStats>, Response> {
    let from = parse_optional_time("startDate", params.start_date.as_deref())?;
    let to = parse_optional_time("endDate", params.end_date.as_deref())?;

    match state.event_log.stats(from, to).await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err(internal_error(&state, "GET /api/logs/stats", &e).await),
    }
}

/// Query parameters for `GET /api/logs/recent`.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Number of records (default: 10, max: 1000).
    pub limit: Option<u32>,
}

/// Response for `GET /api/logs/recent`.
#[derive(Debug, Serialize)]
pub struct RecentResponse {
    /// Records, most recent occurrence first.
    pub records: Vec<LogRecord>,
    /// Number of records returned.
    pub count: usize,
}

/// Handler for `GET /api/logs/recent`.
pub async fn recent_logs_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<RecentResponse>, Response> {
    let limit = params.limit.unwrap_or(10).clamp(1, PageRequest::MAX_PAGE_SIZE);

    match state.event_log.recent(limit).await {
        Ok(records) => {
            let count = records.len();
            Ok(Json(RecentResponse { records, count }))
        }
        Err(e) => Err(internal_error(&state, "GET /api/logs/recent", &e).await),
    }
}
