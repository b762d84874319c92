//! Durable event log for the Beacon pipeline.
//!
//! The subscriber writes every event it receives into the `event_log`
//! table together with the time it was persisted. The log is append-only
//! from this crate's point of view: there is no update and no delete.
//!
//! Reads support AND-combined filters on kind, origin service, and
//! occurrence time, newest-first offset pagination, and count statistics
//! grouped by kind and by origin.
//!
//! # Usage
//!
//! ```rust,ignore
//! use beacon_eventlog::{insert_record, query_records, LogFilter, LogRecord, PageRequest};
//!
//! insert_record(&conn, &LogRecord::new(event, received_at))?;
//!
//! let page = query_records(
//!     &conn,
//!     &LogFilter { kind: Some(EventKind::ErrorOccurred), ..Default::default() },
//!     PageRequest::new(1, 10),
//! )?;
//! ```

mod handle;
mod record;
mod store;

pub use handle::EventLogStore;
pub use record::{CountEntry, LogFilter, LogPage, LogRecord, LogStats, PageRequest};
pub use store::{insert_record, log_stats, query_records, recent_records};

#[cfg(test)]
mod tests;
