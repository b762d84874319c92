//! Append-only numeric time-series store.
//!
//! The publisher mirrors the numeric fields of every event into named
//! series (`ts:events:{KIND}:{metric}`); the reporting engine reads them
//! back over a window. A series is created lazily by its first sample and
//! creating it again is a no-op, so writers never coordinate.
//!
//! Operations come in two forms: synchronous functions over a
//! `rusqlite::Connection` (used inside transactions and tests) and the
//! pooled [`TimeSeriesStore`] handle for async callers.

mod handle;
mod key;
mod store;

pub use handle::TimeSeriesStore;
pub use key::{series_key, SeriesMetric, SERIES_PREFIX};
pub use store::{
    append, append_batch, list_keys, query_range, series_info, BatchOutcome, Labels, Sample,
    SampleError, SampleWrite, SeriesInfo,
};

#[cfg(test)]
mod tests;
