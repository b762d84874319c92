//! Deterministic series keys derived from `(event kind, metric)`.

use beacon_types::EventKind;

/// Prefix shared by every event-derived series.
pub const SERIES_PREFIX: &str = "ts:events:";

/// The numeric quantities mirrored per event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesMetric {
    /// One sample of value 1 per event.
    Count,
    /// The event's `recordCount`.
    Records,
    /// The event's `duration` in milliseconds.
    Duration,
    /// The event's `fileSize` in bytes.
    FileSize,
}

impl SeriesMetric {
    /// Returns the key segment for this metric.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Records => "records",
            Self::Duration => "duration",
            Self::FileSize => "filesize",
        }
    }
}

/// Builds the series key for `metric` of events of `kind`.
pub fn series_key(kind: EventKind, metric: SeriesMetric) -> String {
    format!("{SERIES_PREFIX}{}:{}", kind.as_str(), metric.as_str())
}
