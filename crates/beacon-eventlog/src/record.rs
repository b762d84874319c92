//! Record, filter, and result types for the event log.

use beacon_types::{EpochMillis, Event, EventKind};
use serde::Serialize;

/// The durable form of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// The event as it was received.
    #[serde(flatten)]
    pub event: Event,
    /// When the subscriber persisted the event, in epoch milliseconds.
    pub received_at: EpochMillis,
}

impl LogRecord {
    /// Pairs an event with its persistence time.
    pub fn new(event: Event, received_at: EpochMillis) -> Self {
        Self { event, received_at }
    }
}

/// Filter criteria for log queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Only events of this kind.
    pub kind: Option<EventKind>,
    /// Only events produced by this service.
    pub origin_id: Option<String>,
    /// Only events that occurred at or after this time.
    pub from_time: Option<EpochMillis>,
    /// Only events that occurred at or before this time.
    pub to_time: Option<EpochMillis>,
}

/// A normalised 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Page size used when none is requested.
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    /// Largest page size honoured.
    pub const MAX_PAGE_SIZE: u32 = 1_000;

    /// Builds a page request, raising `page` to at least 1 and clamping
    /// `page_size` to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// The 1-indexed page number.
    pub fn page(self) -> u32 {
        self.page
    }

    /// Records per page.
    pub fn page_size(self) -> u32 {
        self.page_size
    }

    /// Number of records to skip.
    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of log records plus pagination totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    /// Records on this page, most recent occurrence first.
    pub records: Vec<LogRecord>,
    /// The page that was returned.
    pub page: u32,
    /// The page size that was applied.
    pub page_size: u32,
    /// Number of records matching the filter across all pages.
    pub total: i64,
    /// Number of pages at this page size.
    pub total_pages: i64,
}

/// A group key and the number of records in the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    /// The grouped value (an event kind or an origin id).
    pub key: String,
    /// Records in the group.
    pub count: i64,
}

/// Count statistics over a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    /// Records in the window.
    pub total_count: i64,
    /// Counts per event kind, largest first.
    pub count_by_kind: Vec<CountEntry>,
    /// Counts per origin service, largest first.
    pub count_by_origin: Vec<CountEntry>,
}

impl LogStats {
    /// Count for one kind, zero if absent.
    pub fn kind_count(&self, kind: EventKind) -> i64 {
        lookup(&self.count_by_kind, kind.as_str())
    }

    /// Count for one origin, zero if absent.
    pub fn origin_count(&self, origin_id: &str) -> i64 {
        lookup(&self.count_by_origin, origin_id)
    }
}

fn lookup(entries: &[CountEntry], key: &str) -> i64 {
    entries
        .iter()
        .find(|entry| entry.key == key)
        .map_or(0, |entry| entry.count)
}
