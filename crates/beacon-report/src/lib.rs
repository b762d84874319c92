//! Aggregation and reporting over Beacon time series.
//!
//! A report covers an inclusive `[from, to]` window. For every series key
//! with samples in the window it carries a section with count, sum,
//! average, min and max over the raw values, and a chart of the values
//! summed into minute buckets (hour buckets when the window is longer than
//! a day, at most twenty buckets per chart).
//!
//! Reports are never stored. [`ReportEngine::generate`] recomputes one on
//! every call, reading whatever the store holds at that moment.
//!
//! Charts and documents are produced by [`ChartRenderer`] and
//! [`DocumentWriter`] implementations. The built-in pair renders SVG line
//! charts into a single printable HTML page.

mod engine;
mod error;
mod html;
mod layout;
mod render;
mod source;
mod stats;
mod svg;
mod window;

pub use engine::{ChartStatus, Report, ReportEngine, ReportSection, REPORT_TITLE};
pub use error::{RenderError, ReportError};
pub use html::HtmlDocumentWriter;
pub use layout::{
    PageLayout, CHART_BREAK_THRESHOLD, CHART_HEIGHT, SECTION_BREAK_THRESHOLD, TOP_MARGIN,
};
pub use render::{ChartImage, ChartRenderer, ChartSeries, DocumentBlock, DocumentWriter};
pub use source::SeriesSource;
pub use stats::{bucket_samples, series_title, BucketedSeries, SeriesStats, MAX_BUCKET_LABELS};
pub use svg::SvgChartRenderer;
pub use window::{Granularity, ReportWindow, DEFAULT_WINDOW_MS, HOURLY_THRESHOLD_MS};
