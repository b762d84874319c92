//! Database layer for the Beacon pipeline.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, the shared [`StoreError`] type, and a helper for
//! running store operations off the async executor. Both the event log and
//! the time-series store live in the same database file but own disjoint
//! tables, so a failed write to one never rolls back the other.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent readers (queries, reports) with a
//!   single writer, no external database process.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` and cannot drift from the code that depends on them.

mod blocking;
mod error;
mod migrations;
mod pool;

pub use blocking::with_conn;
pub use error::StoreError;
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError, MEMORY_PATH};
