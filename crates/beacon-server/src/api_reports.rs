//! Report handler.
//!
//! `GET /api/reports?startDate&endDate` renders every series over the
//! window into a single document. Generation is cancelled when it
//! exceeds the configured timeout or when the client goes away.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use beacon_report::{ReportError, ReportWindow};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::api::{bad_request, error_response, internal_error, parse_optional_time};
use crate::{now_millis, AppState};

/// Query parameters for `GET /api/reports`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    /// Window start (default: seven days ago).
    pub start_date: Option<String>,
    /// Window end (default: now).
    pub end_date: Option<String>,
}

/// Handler for `GET /api/reports`.
pub async fn generate_report_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<Response, Response> {
    let from = parse_optional_time("startDate", params.start_date.as_deref())?;
    let to = parse_optional_time("endDate", params.end_date.as_deref())?;
    let window =
        ReportWindow::resolve(from, to, now_millis()).map_err(|e| bad_request(e.to_string()))?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let generated =
        tokio::time::timeout(state.report_timeout, state.reports.generate(window, &cancel)).await;

    let report = match generated {
        Ok(Ok(report)) => report,
        Ok(Err(ReportError::InvalidWindow { .. })) => {
            return Err(bad_request("startDate must not be after endDate"));
        }
        Ok(Err(ReportError::Cancelled)) | Err(_) => {
            cancel.cancel();
            tracing::warn!(
                timeout_secs = state.report_timeout.as_secs(),
                "report generation timed out"
            );
            return Err(error_response(
                StatusCode::GATEWAY_TIMEOUT,
                "report generation timed out",
            ));
        }
        Ok(Err(e)) => return Err(internal_error(&state, "GET /api/reports", &e).await),
    };

    if !report.failed_series.is_empty() {
        tracing::warn!(
            failed = report.failed_series.len(),
            "report generated without some series"
        );
    }

    Ok((
        [(header::CONTENT_TYPE, report.content_type)],
        report.document,
    )
        .into_response())
}
