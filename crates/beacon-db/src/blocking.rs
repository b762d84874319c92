//! Bridge from async callers to the synchronous SQLite API.

use rusqlite::Connection;

use crate::{DbPool, StoreError};

/// Checks out a pooled connection on the blocking thread pool and runs `f`
/// against it.
///
/// Store operations are plain synchronous functions over a `&Connection`;
/// async callers go through this helper so that SQLite I/O never stalls
/// the executor.
///
/// # Errors
///
/// Returns `StoreError::Pool` if no connection is available,
/// `StoreError::Task` if the blocking task fails, or whatever `f` returns.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&conn)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, DbRuntimeSettings};

    #[tokio::test]
    async fn runs_closure_on_pooled_connection() {
        let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
        let value: i64 = with_conn(&pool, |conn| {
            Ok(conn.query_row("SELECT 40 + 2", [], |row| row.get(0))?)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn surfaces_sql_errors() {
        let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
        let err = with_conn(&pool, |conn| {
            conn.execute("INSERT INTO missing_table VALUES (1)", [])?;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
