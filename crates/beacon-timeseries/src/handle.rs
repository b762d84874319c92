//! Pooled async handle over the synchronous store functions.

use std::collections::BTreeSet;

use beacon_db::{with_conn, DbPool, StoreError};
use beacon_types::EpochMillis;

use crate::store::{self, BatchOutcome, Labels, Sample, SampleWrite, SeriesInfo};

/// Cloneable time-series store backed by a connection pool.
///
/// Each call checks out a connection on the blocking thread pool, so
/// concurrent callers never wait on each other's SQLite I/O.
#[derive(Clone)]
pub struct TimeSeriesStore {
    pool: DbPool,
}

impl TimeSeriesStore {
    /// Wraps a pool whose database has been migrated.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// See [`store::append`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure.
    pub async fn append(
        &self,
        key: &str,
        timestamp: EpochMillis,
        value: f64,
        labels: Labels,
    ) -> Result<(), StoreError> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| {
            store::append(conn, &key, timestamp, value, &labels)
        })
        .await
    }

    /// See [`store::append_batch`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only if no connection could be obtained;
    /// per-sample failures are reported in the outcome.
    pub async fn append_batch(&self, samples: Vec<SampleWrite>) -> Result<BatchOutcome, StoreError> {
        with_conn(&self.pool, move |conn| Ok(store::append_batch(conn, &samples))).await
    }

    /// See [`store::query_range`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure.
    pub async fn query_range(
        &self,
        key: &str,
        from: EpochMillis,
        to: EpochMillis,
    ) -> Result<Vec<Sample>, StoreError> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| store::query_range(conn, &key, from, to)).await
    }

    /// See [`store::list_keys`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure.
    pub async fn list_keys(&self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        let prefix = prefix.to_string();
        with_conn(&self.pool, move |conn| store::list_keys(conn, &prefix)).await
    }

    /// See [`store::series_info`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure.
    pub async fn series_info(&self, key: &str) -> Result<Option<SeriesInfo>, StoreError> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| store::series_info(conn, &key)).await
    }
}
