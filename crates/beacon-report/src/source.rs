//! Where report data comes from.

use async_trait::async_trait;
use beacon_db::StoreError;
use beacon_timeseries::{Sample, TimeSeriesStore};
use beacon_types::EpochMillis;

/// Read access to time series, as needed by the report engine.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Keys starting with `prefix`, in ascending order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Samples of `key` with `from <= timestamp <= to`, oldest first.
    async fn query_range(
        &self,
        key: &str,
        from: EpochMillis,
        to: EpochMillis,
    ) -> Result<Vec<Sample>, StoreError>;
}

#[async_trait]
impl SeriesSource for TimeSeriesStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(TimeSeriesStore::list_keys(self, prefix).await?.into_iter().collect())
    }

    async fn query_range(
        &self,
        key: &str,
        from: EpochMillis,
        to: EpochMillis,
    ) -> Result<Vec<Sample>, StoreError> {
        TimeSeriesStore::query_range(self, key, from, to).await
    }
}
