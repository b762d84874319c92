//! Event publishing with metric mirroring.
//!
//! A [`Publisher`] turns an operation outcome into an [`Event`], hands its
//! wire form to the channel, and records its numeric fields as time-series
//! samples. The two effects are independent: a sample is recorded even if
//! the channel rejected the event, and a failed sample never fails the
//! publish.

use std::collections::BTreeMap;
use std::sync::Arc;

use beacon_channel::{ChannelTransport, TransportError};
use beacon_timeseries::{series_key, Labels, SampleWrite, SeriesMetric, TimeSeriesStore};
use beacon_types::{EpochMillis, Event, EventPayload, InvalidEventError};
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::now_millis;

/// Errors surfaced to the code that asked for an event to be published.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The draft does not form a valid event; nothing was sent.
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] InvalidEventError),

    /// The channel did not accept the event.
    #[error("publish failed: {0}")]
    Transport(#[from] TransportError),
}

/// An event before the publisher stamps its origin.
#[derive(Debug, Clone)]
pub struct EventDraft {
    payload: EventPayload,
    timestamp: Option<EpochMillis>,
    metadata: BTreeMap<String, Value>,
}

impl EventDraft {
    /// A draft that will be stamped with the publish time.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Keeps an occurrence time chosen by the caller.
    pub fn at(mut self, timestamp: EpochMillis) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attaches an auxiliary key/value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<EventPayload> for EventDraft {
    fn from(payload: EventPayload) -> Self {
        Self::new(payload)
    }
}

/// Publishes events on behalf of one service.
#[derive(Clone)]
pub struct Publisher {
    service_id: String,
    channel: String,
    transport: Arc<dyn ChannelTransport>,
    series: TimeSeriesStore,
}

impl Publisher {
    /// A publisher stamping `service_id` on events sent to `channel`.
    pub fn new(
        service_id: impl Into<String>,
        channel: impl Into<String>,
        transport: Arc<dyn ChannelTransport>,
        series: TimeSeriesStore,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            channel: channel.into(),
            transport,
            series,
        }
    }

    /// The origin id stamped on every event.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Builds, sends, and mirrors one event.
    ///
    /// Returns the event as it was sent.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::InvalidEvent` if the draft is invalid, before
    /// anything is sent or recorded, and `PublishError::Transport` if the
    /// channel rejected the event. Metric recording failures are logged
    /// only.
    pub async fn publish(&self, draft: impl Into<EventDraft>) -> Result<Event, PublishError> {
        let draft = draft.into();
        let timestamp = draft.timestamp.unwrap_or_else(now_millis);
        let event = Event::new(self.service_id.clone(), timestamp, draft.payload, draft.metadata)?;
        let message = Bytes::from(event.encode()?);

        let sent = self.transport.publish(&self.channel, message).await;
        self.mirror(&event).await;

        match sent {
            Ok(receivers) => {
                tracing::debug!(
                    event_type = event.kind().as_str(),
                    channel = %self.channel,
                    receivers,
                    "event published"
                );
                Ok(event)
            }
            Err(e) => {
                tracing::warn!(
                    event_type = event.kind().as_str(),
                    channel = %self.channel,
                    error = %e,
                    "event publish failed"
                );
                Err(e.into())
            }
        }
    }

    /// Publishes an `ERROR_OCCURRED` event describing a failed operation.
    ///
    /// # Errors
    ///
    /// Same as [`Publisher::publish`]; a blank `context` or `error` is
    /// rejected as invalid.
    pub async fn publish_failure(
        &self,
        context: &str,
        error: &(dyn std::fmt::Display + Sync),
    ) -> Result<Event, PublishError> {
        let payload = EventPayload::error_occurred(error.to_string(), context, None)?;
        self.publish(payload).await
    }

    async fn mirror(&self, event: &Event) {
        let samples = metric_samples(event);
        match self.series.append_batch(samples).await {
            Ok(outcome) => {
                for failure in &outcome.errors {
                    tracing::warn!(
                        key = %failure.key,
                        error = %failure.message,
                        "failed to record event metric"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    event_type = event.kind().as_str(),
                    error = %e,
                    "failed to record event metrics"
                );
            }
        }
    }
}

/// The samples recorded for an event: a count of one, plus each numeric
/// field the event carries.
pub fn metric_samples(event: &Event) -> Vec<SampleWrite> {
    let kind = event.kind();
    let payload = event.payload();
    let labels = Labels::from([
        ("eventType".to_string(), kind.as_str().to_string()),
        ("service".to_string(), event.origin_id().to_string()),
    ]);

    [
        (SeriesMetric::Count, Some(1)),
        (SeriesMetric::Records, payload.record_count()),
        (SeriesMetric::Duration, payload.duration()),
        (SeriesMetric::FileSize, payload.file_size()),
    ]
    .into_iter()
    .filter_map(|(metric, value)| {
        value.map(|v| SampleWrite {
            key: series_key(kind, metric),
            timestamp: event.timestamp(),
            value: v as f64,
            labels: labels.clone(),
        })
    })
    .collect()
}
