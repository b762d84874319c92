//! Persistence operations for the event log.
//!
//! Writes go through [`insert_record`], which stores the event's wire form
//! alongside the indexed columns used for filtering. Reads go through
//! [`query_records`], [`log_stats`], and [`recent_records`].

use beacon_db::StoreError;
use beacon_types::{EpochMillis, Event};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};

use crate::record::{CountEntry, LogFilter, LogPage, LogRecord, LogStats, PageRequest};

/// Appends a record to the log and returns its row id.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure or
/// `StoreError::Serialization` if the event cannot be encoded.
pub fn insert_record(conn: &Connection, record: &LogRecord) -> Result<i64, StoreError> {
    let event_json = serde_json::to_string(&record.event)?;
    conn.execute(
        "INSERT INTO event_log (event_type, origin_id, occurred_at, received_at, event_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.event.kind().as_str(),
            record.event.origin_id(),
            record.event.timestamp(),
            record.received_at,
            event_json,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Builds the parameterised WHERE clause shared by queries and counts.
///
/// Clauses and bind values are collected separately so nothing from the
/// filter is interpolated into SQL.
fn where_clause(filter: &LogFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(kind) = filter.kind {
        values.push(Box::new(kind.as_str()));
        clauses.push(format!("event_type = ?{}", values.len()));
    }
    if let Some(ref origin) = filter.origin_id {
        values.push(Box::new(origin.clone()));
        clauses.push(format!("origin_id = ?{}", values.len()));
    }
    if let Some(from) = filter.from_time {
        values.push(Box::new(from));
        clauses.push(format!("occurred_at >= ?{}", values.len()));
    }
    if let Some(to) = filter.to_time {
        values.push(Box::new(to));
        clauses.push(format!("occurred_at <= ?{}", values.len()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn decode_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, EpochMillis)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_record((id, event_json, received_at): (i64, String, EpochMillis)) -> Result<LogRecord, StoreError> {
    let event = Event::decode(event_json.as_bytes())
        .map_err(|e| StoreError::Corrupt(format!("event_log row {id}: {e}")))?;
    Ok(LogRecord::new(event, received_at))
}

/// Returns one page of records matching `filter`, most recent occurrence
/// first, together with the total number of matches.
///
/// Records with equal occurrence times are ordered newest insertion first.
/// The page and the count are read inside one transaction so they agree.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure or `StoreError::Corrupt`
/// if a stored row no longer decodes.
pub fn query_records(
    conn: &Connection,
    filter: &LogFilter,
    page: PageRequest,
) -> Result<LogPage, StoreError> {
    let (where_sql, mut values) = where_clause(filter);
    let tx = conn.unchecked_transaction()?;

    let total: i64 = {
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v).collect();
        tx.query_row(
            &format!("SELECT COUNT(*) FROM event_log {where_sql}"),
            refs.as_slice(),
            |row| row.get(0),
        )?
    };

    values.push(Box::new(i64::from(page.page_size())));
    let limit_idx = values.len();
    values.push(Box::new(page.offset()));
    let offset_idx = values.len();

    let sql = format!(
        "SELECT id, event_json, received_at
         FROM event_log
         {where_sql}
         ORDER BY occurred_at DESC, id DESC
         LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v).collect();

    let rows = {
        let mut stmt = tx.prepare(&sql)?;
        let mapped = stmt.query_map(refs.as_slice(), decode_row)?;
        mapped.collect::<Result<Vec<_>, _>>()?
    };
    tx.commit()?;

    let records = rows
        .into_iter()
        .map(into_record)
        .collect::<Result<Vec<_>, _>>()?;

    let page_size = i64::from(page.page_size());
    Ok(LogPage {
        records,
        page: page.page(),
        page_size: page.page_size(),
        total,
        total_pages: (total + page_size - 1) / page_size,
    })
}

/// Counts records in an optional occurrence-time window, in total and
/// grouped by kind and by origin.
///
/// Groups are sorted by count descending, then key ascending.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure.
pub fn log_stats(
    conn: &Connection,
    from_time: Option<EpochMillis>,
    to_time: Option<EpochMillis>,
) -> Result<LogStats, StoreError> {
    let filter = LogFilter {
        from_time,
        to_time,
        ..Default::default()
    };
    let (where_sql, values) = where_clause(&filter);
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v).collect();
    let tx = conn.unchecked_transaction()?;

    let total_count: i64 = tx.query_row(
        &format!("SELECT COUNT(*) FROM event_log {where_sql}"),
        refs.as_slice(),
        |row| row.get(0),
    )?;

    let grouped = |column: &str| -> Result<Vec<CountEntry>, StoreError> {
        let sql = format!(
            "SELECT {column}, COUNT(*) AS n
             FROM event_log
             {where_sql}
             GROUP BY {column}
             ORDER BY n DESC, {column} ASC"
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), |row| {
            Ok(CountEntry {
                key: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    };

    let count_by_kind = grouped("event_type")?;
    let count_by_origin = grouped("origin_id")?;
    tx.commit()?;

    Ok(LogStats {
        total_count,
        count_by_kind,
        count_by_origin,
    })
}

/// Returns the `limit` most recently occurred records.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure or `StoreError::Corrupt`
/// if a stored row no longer decodes.
pub fn recent_records(conn: &Connection, limit: u32) -> Result<Vec<LogRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, event_json, received_at
         FROM event_log
         ORDER BY occurred_at DESC, id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![i64::from(limit)], decode_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(into_record).collect()
}
