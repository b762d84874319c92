//! Pooled async handle over the synchronous log functions.

use beacon_db::{with_conn, DbPool, StoreError};
use beacon_types::EpochMillis;

use crate::record::{LogFilter, LogPage, LogRecord, LogStats, PageRequest};
use crate::store;

/// Cloneable event log backed by a connection pool.
#[derive(Clone)]
pub struct EventLogStore {
    pool: DbPool,
}

impl EventLogStore {
    /// Wraps a pool whose database has been migrated.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// See [`store::insert_record`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool, SQL, or encoding failure.
    pub async fn insert(&self, record: LogRecord) -> Result<i64, StoreError> {
        with_conn(&self.pool, move |conn| store::insert_record(conn, &record)).await
    }

    /// See [`store::query_records`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure, or if a row is corrupt.
    pub async fn query(&self, filter: LogFilter, page: PageRequest) -> Result<LogPage, StoreError> {
        with_conn(&self.pool, move |conn| store::query_records(conn, &filter, page)).await
    }

    /// See [`store::log_stats`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure.
    pub async fn stats(
        &self,
        from_time: Option<EpochMillis>,
        to_time: Option<EpochMillis>,
    ) -> Result<LogStats, StoreError> {
        with_conn(&self.pool, move |conn| store::log_stats(conn, from_time, to_time)).await
    }

    /// See [`store::recent_records`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on pool or SQL failure, or if a row is corrupt.
    pub async fn recent(&self, limit: u32) -> Result<Vec<LogRecord>, StoreError> {
        with_conn(&self.pool, move |conn| store::recent_records(conn, limit)).await
    }
}
