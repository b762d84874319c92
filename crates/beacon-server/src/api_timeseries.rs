//! Time-series query handlers.
//!
//! Provides:
//! - `GET /api/timeseries/keys`: series discovery by prefix
//! - `GET /api/timeseries`: raw samples of one series over a window
//! - `GET /api/timeseries/all`: raw samples of every series over a window
//! - `GET /api/timeseries/info`: metadata of one series

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Response,
    Json,
};
use beacon_report::ReportWindow;
use beacon_timeseries::{Sample, SeriesInfo, SERIES_PREFIX};
use serde::{Deserialize, Serialize};

use crate::api::{bad_request, error_response, internal_error, parse_optional_time};
use crate::{now_millis, AppState};

/// Query parameters for `GET /api/timeseries/keys`.
#[derive(Debug, Deserialize)]
pub struct KeysQuery {
    /// Key prefix (default: `ts:events:`).
    pub prefix: Option<String>,
}

/// Response for `GET /api/timeseries/keys`.
#[derive(Debug, Serialize)]
pub struct KeysResponse {
    /// Matching keys in ascending order.
    pub keys: Vec<String>,
}

/// Handler for `GET /api/timeseries/keys`.
pub async fn list_keys_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<KeysQuery>,
) -> Result<Json<KeysResponse>, Response> {
    let prefix = params.prefix.unwrap_or_else(|| SERIES_PREFIX.to_string());
    match state.series.list_keys(&prefix).await {
        Ok(keys) => Ok(Json(KeysResponse {
            keys: keys.into_iter().collect(),
        })),
        Err(e) => Err(internal_error(&state, "GET /api/timeseries/keys", &e).await),
    }
}

/// Window parameters shared by the range handlers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    /// Series key; required by `GET /api/timeseries`.
    pub key: Option<String>,
    /// Window start (default: seven days ago).
    pub start_date: Option<String>,
    /// Window end (default: now).
    pub end_date: Option<String>,
}

impl RangeQuery {
    fn window(&self) -> Result<ReportWindow, Response> {
        let from = parse_optional_time("startDate", self.start_date.as_deref())?;
        let to = parse_optional_time("endDate", self.end_date.as_deref())?;
        ReportWindow::resolve(from, to, now_millis()).map_err(|e| bad_request(e.to_string()))
    }
}

/// Response for `GET /api/timeseries`.
#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    /// The requested key.
    pub key: String,
    /// Window start.
    pub from: i64,
    /// Window end.
    pub to: i64,
    /// Samples in the window, oldest first.
    pub samples: Vec<Sample>,
}

/// Handler for `GET /api/timeseries`.
pub async fn query_series_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<SeriesResponse>, Response> {
    let window = params.window()?;
    let Some(key) = params.key.filter(|k| !k.trim().is_empty()) else {
        return Err(bad_request("missing required query parameter: key"));
    };

    match state.series.query_range(&key, window.from(), window.to()).await {
        Ok(samples) => Ok(Json(SeriesResponse {
            key,
            from: window.from(),
            to: window.to(),
            samples,
        })),
        Err(e) => Err(internal_error(&state, "GET /api/timeseries", &e).await),
    }
}

/// Response for `GET /api/timeseries/all`.
#[derive(Debug, Serialize)]
pub struct AllSeriesResponse {
    /// Window start.
    pub from: i64,
    /// Window end.
    pub to: i64,
    /// Samples per key; keys without samples in the window map to `[]`.
    pub series: BTreeMap<String, Vec<Sample>>,
}

/// Handler for `GET /api/timeseries/all`.
pub async fn query_all_series_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<AllSeriesResponse>, Response> {
    let window = params.window()?;

    let keys = match state.series.list_keys(SERIES_PREFIX).await {
        Ok(keys) => keys,
        Err(e) => return Err(internal_error(&state, "GET /api/timeseries/all", &e).await),
    };

    let mut series = BTreeMap::new();
    for key in keys {
        match state.series.query_range(&key, window.from(), window.to()).await {
            Ok(samples) => {
                series.insert(key, samples);
            }
            Err(e) => return Err(internal_error(&state, "GET /api/timeseries/all", &e).await),
        }
    }

    Ok(Json(AllSeriesResponse {
        from: window.from(),
        to: window.to(),
        series,
    }))
}

/// Query parameters for `GET /api/timeseries/info`.
#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    /// Series key.
    pub key: Option<String>,
}

/// Handler for `GET /api/timeseries/info`.
pub async fn series_info_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<InfoQuery>,
) -> Result<Json<SeriesInfo>, Response> {
    let Some(key) = params.key.filter(|k| !k.trim().is_empty()) else {
        return Err(bad_request("missing required query parameter: key"));
    };

    match state.series.series_info(&key).await {
        Ok(Some(info)) => Ok(Json(info)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("unknown series: {key}"),
        )),
        Err(e) => Err(internal_error(&state, "GET /api/timeseries/info", &e).await),
    }
}
