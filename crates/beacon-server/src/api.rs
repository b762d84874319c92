//! Shared handler helpers and the health endpoint.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beacon_types::EpochMillis;
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Value};

use crate::AppState;

/// Builds a `400 Bad Request` JSON error response.
pub(crate) fn bad_request(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Builds a JSON error response with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Reports a store failure to the caller and to the event channel.
pub(crate) async fn internal_error(
    state: &AppState,
    context: &str,
    error: &(dyn std::fmt::Display + Sync),
) -> Response {
    tracing::error!(context, error = %error, "request failed");
    if let Err(e) = state.publisher.publish_failure(context, error).await {
        tracing::debug!(error = %e, "could not publish request failure");
    }
    error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

/// Parses a query-string time as epoch milliseconds, an RFC 3339
/// timestamp, or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_time(raw: &str) -> Result<EpochMillis, String> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<EpochMillis>() {
        return Ok(millis);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.timestamp_millis());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp_millis());
    }
    Err(format!(
        "invalid time '{raw}': expected epoch milliseconds, RFC 3339, or YYYY-MM-DD"
    ))
}

/// Parses an optional time parameter, mapping failures to `400`.
pub(crate) fn parse_optional_time(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<EpochMillis>, Response> {
    match raw.filter(|value| !value.trim().is_empty()) {
        Some(value) => parse_time(value)
            .map(Some)
            .map_err(|e| bad_request(format!("{name}: {e}"))),
        None => Ok(None),
    }
}

/// Health check handler.
///
/// Returns `200 OK` with the server version and, when a subscriber is
/// attached, its state and message counters.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let mut body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    if let Some(subscriber) = &state.subscriber {
        body["subscriber"] = json!({
            "state": *subscriber.state.borrow(),
            "counters": subscriber.counters.snapshot(),
        });
    }
    Json(body)
}
