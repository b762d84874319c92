//! Beacon server library logic.
//!
//! Wires the event pipeline together: a [`Publisher`] that producers in
//! this process use, a [`Subscriber`] that persists everything published
//! on the channel, and a read-only HTTP surface over the event log, the
//! time series, and reports.

pub mod api;
pub mod api_logs;
pub mod api_reports;
pub mod api_timeseries;
pub mod config;
pub mod publisher;
pub mod subscriber;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Extension, Router};
use beacon_channel::ChannelTransport;
use beacon_db::DbPool;
use beacon_eventlog::EventLogStore;
use beacon_report::ReportEngine;
use beacon_timeseries::TimeSeriesStore;
use beacon_types::EpochMillis;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use publisher::{EventDraft, PublishError, Publisher};
pub use subscriber::{Backoff, Subscriber, SubscriberCounters, SubscriberState};

use config::Config;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    chrono::Utc::now().timestamp_millis()
}

/// Read-only view of the running subscriber, for health reporting.
#[derive(Clone)]
pub struct SubscriberHandle {
    /// Latest connection state.
    pub state: watch::Receiver<SubscriberState>,
    /// Message counters.
    pub counters: Arc<SubscriberCounters>,
}

impl From<&Subscriber> for SubscriberHandle {
    fn from(subscriber: &Subscriber) -> Self {
        Self {
            state: subscriber.state(),
            counters: subscriber.counters(),
        }
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Durable event log.
    pub event_log: EventLogStore,
    /// Metric time series.
    pub series: TimeSeriesStore,
    /// Publisher stamped with this process's service id.
    pub publisher: Publisher,
    /// Report generator over `series`.
    pub reports: ReportEngine,
    /// Upper bound on a single report generation.
    pub report_timeout: Duration,
    /// The subscriber persisting events, if one is running.
    pub subscriber: Option<SubscriberHandle>,
}

impl AppState {
    /// Builds the stores, publisher, and report engine over a migrated
    /// pool.
    pub fn new(pool: DbPool, transport: Arc<dyn ChannelTransport>, config: &Config) -> Self {
        let event_log = EventLogStore::new(pool.clone());
        let series = TimeSeriesStore::new(pool.clone());
        let publisher = Publisher::new(
            config.service.id.clone(),
            config.channel.name.clone(),
            transport,
            series.clone(),
        );
        let reports = ReportEngine::with_default_renderers(Arc::new(series.clone()));

        Self {
            pool,
            event_log,
            series,
            publisher,
            reports,
            report_timeout: config.reports.timeout(),
            subscriber: None,
        }
    }

    /// Exposes `subscriber`'s state and counters through `/health`.
    pub fn with_subscriber(mut self, subscriber: &Subscriber) -> Self {
        self.subscriber = Some(SubscriberHandle::from(subscriber));
        self
    }

    /// A subscriber for this state's channel and event log.
    pub fn subscriber(&self, transport: Arc<dyn ChannelTransport>, config: &Config) -> Subscriber {
        Subscriber::new(
            transport,
            config.channel.name.clone(),
            self.event_log.clone(),
            Backoff::from(&config.subscriber),
        )
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/logs", get(api_logs::query_logs_handler))
        .route("/api/logs/stats", get(api_logs::log_stats_handler))
        .route("/api/logs/recent", get(api_logs::recent_logs_handler))
        .route("/api/timeseries", get(api_timeseries::query_series_handler))
        .route("/api/timeseries/keys", get(api_timeseries::list_keys_handler))
        .route("/api/timeseries/all", get(api_timeseries::query_all_series_handler))
        .route("/api/timeseries/info", get(api_timeseries::series_info_handler))
        .route("/api/reports", get(api_reports::generate_report_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
