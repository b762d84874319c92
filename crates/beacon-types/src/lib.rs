//! Shared event model for the Beacon pipeline.
//!
//! Every service in the pipeline speaks the same event vocabulary: a
//! producer builds an [`Event`] when an operation completes (or fails),
//! the channel carries its wire form, and the durable side decodes it
//! back. This crate owns that vocabulary and nothing else, so the
//! transport, the stores, and the server can all depend on it without
//! depending on each other.
//!
//! # Event kinds
//!
//! | Kind | Required fields | Optional fields |
//! |------|-----------------|-----------------|
//! | `DATA_FETCHED` | none | `recordCount`, `source`, `duration` |
//! | `FILE_UPLOADED` | `fileName` | `fileSize`, `fileType` |
//! | `DATA_INSERTED` | `collectionName` | `recordCount`, `duration` |
//! | `SEARCH_PERFORMED` | `query` | `resultCount`, `page`, `limit`, `duration` |
//! | `ERROR_OCCURRED` | `error`, `context` | `stack` |
//!
//! # Wire format
//!
//! Events travel as a flat JSON object:
//!
//! ```json
//! {
//!   "eventType": "DATA_FETCHED",
//!   "timestamp": 1760600000000,
//!   "serviceId": "service-a",
//!   "recordCount": 42,
//!   "duration": 120
//! }
//! ```
//!
//! Unknown fields are ignored on decode. Unset optional fields are omitted
//! on encode, never written as `null`.

mod error;
mod event;

pub use error::InvalidEventError;
pub use event::{Event, EventKind, EventPayload, ParseEventKindError};

/// Milliseconds since the Unix epoch, the timestamp unit used across the
/// pipeline.
pub type EpochMillis = i64;
