//! Error types for report generation.

use beacon_db::StoreError;
use beacon_types::EpochMillis;
use thiserror::Error;

/// A chart or document could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// There were no labels or no series to draw.
    #[error("chart has no data to draw")]
    EmptyChart,

    /// A series does not have one value per label.
    #[error("series '{series}' has {actual} values for {expected} labels")]
    LengthMismatch {
        /// Name of the offending series.
        series: String,
        /// Number of labels.
        expected: usize,
        /// Number of values in the series.
        actual: usize,
    },

    /// A series contains NaN or an infinity.
    #[error("series '{0}' contains a non-finite value")]
    NonFinite(String),

    /// A pluggable renderer or writer failed for its own reasons.
    #[error("render backend failed: {0}")]
    Backend(String),
}

/// Report generation failed as a whole.
///
/// Failures confined to a single series never surface here; they leave a
/// gap or a placeholder in the report instead.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Series discovery failed, so nothing could be reported.
    #[error("time-series store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The requested window ends before it starts or lies outside the
    /// calendar range.
    #[error("invalid report window [{from}, {to}]: start must not be after end and both must be valid dates")]
    InvalidWindow {
        /// Requested start.
        from: EpochMillis,
        /// Requested end.
        to: EpochMillis,
    },

    /// Generation was cancelled before it finished.
    #[error("report generation cancelled")]
    Cancelled,

    /// The document writer rejected the assembled blocks.
    #[error("document rendering failed: {0}")]
    Document(#[from] RenderError),
}
