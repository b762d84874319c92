//! Report windows and bucket granularity.

use beacon_types::EpochMillis;
use chrono::{DateTime, Utc};

use crate::error::ReportError;

const MINUTE_MS: i64 = 60 * 1_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Length of the window used when no start is given.
pub const DEFAULT_WINDOW_MS: i64 = 7 * DAY_MS;

/// Windows strictly longer than this bucket by hour.
pub const HOURLY_THRESHOLD_MS: i64 = DAY_MS;

/// An inclusive `[from, to]` range in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    from: EpochMillis,
    to: EpochMillis,
}

impl ReportWindow {
    /// Builds a window, rejecting one that ends before it starts or has a
    /// bound outside the calendar range.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidWindow` if `from > to` or either bound
    /// is not a representable UTC instant.
    pub fn new(from: EpochMillis, to: EpochMillis) -> Result<Self, ReportError> {
        let representable =
            |t: EpochMillis| DateTime::<Utc>::from_timestamp_millis(t).is_some();
        if from > to || !representable(from) || !representable(to) {
            return Err(ReportError::InvalidWindow { from, to });
        }
        Ok(Self { from, to })
    }

    /// Fills in missing bounds: `to` defaults to `now` and `from` defaults
    /// to seven days before `now`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidWindow` if the resolved bounds are
    /// reversed.
    pub fn resolve(
        from: Option<EpochMillis>,
        to: Option<EpochMillis>,
        now: EpochMillis,
    ) -> Result<Self, ReportError> {
        Self::new(
            from.unwrap_or(now.saturating_sub(DEFAULT_WINDOW_MS)),
            to.unwrap_or(now),
        )
    }

    /// Window start.
    pub fn from(self) -> EpochMillis {
        self.from
    }

    /// Window end.
    pub fn to(self) -> EpochMillis {
        self.to
    }

    /// `to - from`.
    pub fn span(self) -> i64 {
        self.to.saturating_sub(self.from)
    }

    /// Bucket size for charts over this window.
    pub fn granularity(self) -> Granularity {
        Granularity::for_span(self.span())
    }
}

/// Width of a chart bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One bucket per minute.
    Minute,
    /// One bucket per hour.
    Hour,
}

impl Granularity {
    /// Hour buckets for spans strictly longer than a day, minute buckets
    /// otherwise.
    pub fn for_span(span_ms: i64) -> Self {
        if span_ms > HOURLY_THRESHOLD_MS {
            Self::Hour
        } else {
            Self::Minute
        }
    }

    fn width_ms(self) -> i64 {
        match self {
            Self::Minute => MINUTE_MS,
            Self::Hour => HOUR_MS,
        }
    }

    /// Start of the bucket containing `timestamp`.
    pub fn bucket_start(self, timestamp: EpochMillis) -> EpochMillis {
        timestamp - timestamp.rem_euclid(self.width_ms())
    }

    /// Human-readable UTC label for a bucket start.
    pub fn label(self, bucket_start: EpochMillis) -> String {
        let Some(at) = DateTime::<Utc>::from_timestamp_millis(bucket_start) else {
            return bucket_start.to_string();
        };
        match self {
            Self::Minute => at.format("%H:%M").to_string(),
            Self::Hour => at.format("%b %-d, %H:00").to_string(),
        }
    }
}

/// Formats a timestamp for display in report text.
pub(crate) fn display_time(timestamp: EpochMillis) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp)
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
