//! Persistence operations for time series.

use std::collections::{BTreeMap, BTreeSet};

use beacon_db::StoreError;
use beacon_types::EpochMillis;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Labels attached to a series at creation.
pub type Labels = BTreeMap<String, String>;

/// One `(timestamp, value)` point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sample time in epoch milliseconds.
    pub timestamp: EpochMillis,
    /// Sample value.
    pub value: f64,
}

/// A sample destined for a named series.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWrite {
    /// Series key.
    pub key: String,
    /// Sample time in epoch milliseconds.
    pub timestamp: EpochMillis,
    /// Sample value.
    pub value: f64,
    /// Labels used if this write creates the series.
    pub labels: Labels,
}

/// A sample that could not be written during the per-sample fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleError {
    /// Position of the sample in the submitted batch.
    pub index: usize,
    /// Series key of the failed sample.
    pub key: String,
    /// The underlying error message.
    pub message: String,
}

/// Result of [`append_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Number of samples written.
    pub inserted: usize,
    /// Samples that failed, in batch order.
    pub errors: Vec<SampleError>,
}

impl BatchOutcome {
    /// True when every sample was written.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Metadata about one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesInfo {
    /// Series key.
    pub key: String,
    /// Labels recorded when the series was created.
    pub labels: Labels,
    /// Creation time in epoch milliseconds.
    pub created_at: EpochMillis,
    /// Number of stored samples.
    pub sample_count: i64,
    /// Earliest sample time.
    pub first_timestamp: Option<EpochMillis>,
    /// Latest sample time.
    pub last_timestamp: Option<EpochMillis>,
}

/// Appends one sample, creating the series first if it does not exist.
///
/// Creating an existing series is a no-op; its original labels are kept.
///
/// # Errors
///
/// Returns `StoreError` on SQL failure.
pub fn append(
    conn: &Connection,
    key: &str,
    timestamp: EpochMillis,
    value: f64,
    labels: &Labels,
) -> Result<(), StoreError> {
    let labels_json = serde_json::to_string(labels)?;
    conn.execute(
        "INSERT INTO ts_series (series_key, labels_json, created_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(series_key) DO NOTHING",
        params![key, labels_json, chrono::Utc::now().timestamp_millis()],
    )?;
    conn.execute(
        "INSERT INTO ts_samples (series_key, ts, value) VALUES (?1, ?2, ?3)",
        params![key, timestamp, value],
    )?;
    Ok(())
}

/// Appends a batch of samples with a two-phase strategy.
///
/// Phase one writes the whole batch in a single transaction. If any write
/// fails the transaction is rolled back and phase two appends each sample
/// on its own, collecting failures instead of stopping at the first one.
pub fn append_batch(conn: &Connection, samples: &[SampleWrite]) -> BatchOutcome {
    if samples.is_empty() {
        return BatchOutcome::default();
    }

    match append_all(conn, samples) {
        Ok(()) => BatchOutcome {
            inserted: samples.len(),
            errors: Vec::new(),
        },
        Err(e) => {
            tracing::warn!(
                count = samples.len(),
                error = %e,
                "batch append failed, falling back to individual appends"
            );
            append_each(conn, samples)
        }
    }
}

fn append_all(conn: &Connection, samples: &[SampleWrite]) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;
    for sample in samples {
        append(&tx, &sample.key, sample.timestamp, sample.value, &sample.labels)?;
    }
    tx.commit()?;
    Ok(())
}

fn append_each(conn: &Connection, samples: &[SampleWrite]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (index, sample) in samples.iter().enumerate() {
        match append(conn, &sample.key, sample.timestamp, sample.value, &sample.labels) {
            Ok(()) => outcome.inserted += 1,
            Err(e) => {
                tracing::error!(index, key = %sample.key, error = %e, "sample append failed");
                outcome.errors.push(SampleError {
                    index,
                    key: sample.key.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    outcome
}

/// Returns the samples of `key` with `from <= timestamp <= to`, oldest
/// first.
///
/// Samples sharing a timestamp keep their append order. An unknown key or
/// an empty (or inverted) range yields an empty vector.
///
/// # Errors
///
/// Returns `StoreError` on SQL failure.
pub fn query_range(
    conn: &Connection,
    key: &str,
    from: EpochMillis,
    to: EpochMillis,
) -> Result<Vec<Sample>, StoreError> {
    if from > to {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT ts, value FROM ts_samples
         WHERE series_key = ?1 AND ts >= ?2 AND ts <= ?3
         ORDER BY ts ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![key, from, to], |row| {
        Ok(Sample {
            timestamp: row.get(0)?,
            value: row.get(1)?,
        })
    })?;

    let mut samples = Vec::new();
    for row in rows {
        samples.push(row?);
    }
    Ok(samples)
}

/// Returns every series key starting with `prefix`.
///
/// # Errors
///
/// Returns `StoreError` on SQL failure.
pub fn list_keys(conn: &Connection, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
    // substr() keeps `%` and `_` in the prefix literal, unlike LIKE.
    let mut stmt = conn.prepare(
        "SELECT series_key FROM ts_series
         WHERE substr(series_key, 1, length(?1)) = ?1",
    )?;
    let rows = stmt.query_map([prefix], |row| row.get::<_, String>(0))?;

    let mut keys = BTreeSet::new();
    for row in rows {
        keys.insert(row?);
    }
    Ok(keys)
}

/// Returns metadata for `key`, or `None` if the series does not exist.
///
/// # Errors
///
/// Returns `StoreError` on SQL failure or if the stored labels are corrupt.
pub fn series_info(conn: &Connection, key: &str) -> Result<Option<SeriesInfo>, StoreError> {
    let row = conn
        .query_row(
            "SELECT s.labels_json, s.created_at,
                    COUNT(p.id), MIN(p.ts), MAX(p.ts)
             FROM ts_series s
             LEFT JOIN ts_samples p ON p.series_key = s.series_key
             WHERE s.series_key = ?1
             GROUP BY s.series_key",
            [key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((labels_json, created_at, sample_count, first_timestamp, last_timestamp)) = row else {
        return Ok(None);
    };

    Ok(Some(SeriesInfo {
        key: key.to_string(),
        labels: serde_json::from_str(&labels_json)?,
        created_at,
        sample_count,
        first_timestamp,
        last_timestamp,
    }))
}
