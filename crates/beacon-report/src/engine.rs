//! Report assembly.

use std::sync::Arc;

use beacon_timeseries::{Sample, SERIES_PREFIX};
use beacon_types::EpochMillis;
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::error::{RenderError, ReportError};
use crate::html::HtmlDocumentWriter;
use crate::layout::PageLayout;
use crate::render::{ChartImage, ChartRenderer, ChartSeries, DocumentBlock, DocumentWriter};
use crate::source::SeriesSource;
use crate::stats::{bucket_samples, series_title, BucketedSeries, SeriesStats};
use crate::svg::SvgChartRenderer;
use crate::window::{display_time, Granularity, ReportWindow};

/// Title printed at the top of every report.
pub const REPORT_TITLE: &str = "Event Analytics Report";

/// Whether a section's chart made it into the document.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartStatus {
    /// The chart was rendered and embedded.
    Rendered,
    /// Rendering failed and a placeholder was written instead.
    Unavailable(RenderError),
}

/// One series' contribution to a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    /// Series key.
    pub key: String,
    /// Human-readable title derived from the key.
    pub title: String,
    /// Statistics over the raw samples.
    pub stats: SeriesStats,
    /// Bucketed values passed to the chart renderer.
    pub buckets: BucketedSeries,
    /// Outcome of chart rendering.
    pub chart: ChartStatus,
}

/// A generated report and the data it was built from.
#[derive(Debug, Clone)]
pub struct Report {
    /// The window the report covers.
    pub window: ReportWindow,
    /// Bucket width used for every chart.
    pub granularity: Granularity,
    /// Number of series keys discovered, including those without samples
    /// in the window.
    pub series_keys: usize,
    /// Sections in key order; series without samples have none.
    pub sections: Vec<ReportSection>,
    /// Keys whose range query failed and were left out.
    pub failed_series: Vec<String>,
    /// When the report was generated.
    pub generated_at: EpochMillis,
    /// MIME type of `document`.
    pub content_type: &'static str,
    /// The rendered artifact.
    pub document: Vec<u8>,
}

impl Report {
    /// Total samples across all sections.
    pub fn data_points(&self) -> usize {
        self.sections.iter().map(|s| s.stats.count).sum()
    }
}

/// Builds reports from a series source with pluggable renderers.
#[derive(Clone)]
pub struct ReportEngine {
    source: Arc<dyn SeriesSource>,
    renderer: Arc<dyn ChartRenderer>,
    writer: Arc<dyn DocumentWriter>,
}

impl ReportEngine {
    /// An engine with explicit collaborators.
    pub fn new(
        source: Arc<dyn SeriesSource>,
        renderer: Arc<dyn ChartRenderer>,
        writer: Arc<dyn DocumentWriter>,
    ) -> Self {
        Self {
            source,
            renderer,
            writer,
        }
    }

    /// An engine producing HTML documents with SVG charts.
    pub fn with_default_renderers(source: Arc<dyn SeriesSource>) -> Self {
        Self::new(
            source,
            Arc::new(SvgChartRenderer::default()),
            Arc::new(HtmlDocumentWriter),
        )
    }

    /// Generates a report over `window`.
    ///
    /// Every discovered series is queried concurrently. A series whose
    /// query fails is omitted and listed in [`Report::failed_series`]; a
    /// series whose chart fails gets a placeholder.
    ///
    /// Cancelling `cancel` returns promptly and drops the pending query
    /// futures. A query already running on the blocking pool still runs to
    /// completion there; its result is discarded.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Store` if series discovery fails,
    /// `ReportError::Cancelled` if cancelled, or `ReportError::Document` if
    /// the document writer fails.
    pub async fn generate(
        &self,
        window: ReportWindow,
        cancel: &CancellationToken,
    ) -> Result<Report, ReportError> {
        let keys = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::Cancelled),
            keys = self.source.list_keys(SERIES_PREFIX) => keys?,
        };
        let series_keys = keys.len();
        tracing::debug!(series = series_keys, from = window.from(), to = window.to(), "generating report");

        let source = self.source.as_ref();
        let queries = keys.into_iter().map(|key| async move {
            let result = source.query_range(&key, window.from(), window.to()).await;
            (key, result)
        });
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::Cancelled),
            fetched = join_all(queries) => fetched,
        };

        let granularity = window.granularity();
        let mut rendered = Vec::new();
        let mut failed_series = Vec::new();
        for (key, result) in fetched {
            match result {
                Ok(samples) => rendered.extend(self.section(key, &samples, granularity)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "series query failed, omitting from report");
                    failed_series.push(key);
                }
            }
        }

        let (sections, images): (Vec<_>, Vec<_>) = rendered.into_iter().unzip();
        let mut report = Report {
            window,
            granularity,
            series_keys,
            sections,
            failed_series,
            generated_at: chrono::Utc::now().timestamp_millis(),
            content_type: self.writer.content_type(),
            document: Vec::new(),
        };
        let blocks = layout(&report, images);
        report.document = self.writer.write(&blocks)?;

        tracing::info!(
            sections = report.sections.len(),
            failed = report.failed_series.len(),
            data_points = report.data_points(),
            "report generated"
        );
        Ok(report)
    }

    /// Builds one series section and renders its chart, or returns `None`
    /// if the series has no samples in the window.
    fn section(
        &self,
        key: String,
        samples: &[Sample],
        granularity: Granularity,
    ) -> Option<(ReportSection, Option<ChartImage>)> {
        let stats = SeriesStats::from_samples(samples)?;
        let title = series_title(&key);
        let buckets = bucket_samples(samples, granularity);

        let series = [ChartSeries {
            name: title.clone(),
            values: buckets.values.clone(),
        }];
        let (chart, image) = match self.renderer.render_line_chart(&buckets.labels, &series, &title) {
            Ok(image) => (ChartStatus::Rendered, Some(image)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "chart rendering failed");
                (ChartStatus::Unavailable(e), None)
            }
        };

        Some((
            ReportSection {
                key,
                title,
                stats,
                buckets,
                chart,
            },
            image,
        ))
    }
}

/// Lays out the title block, summary, one section per series, and the
/// footer. `images` is index-aligned with `report.sections`.
fn layout(report: &Report, images: Vec<Option<ChartImage>>) -> Vec<DocumentBlock> {
    let mut page = PageLayout::new();
    page.heading(1, REPORT_TITLE);
    page.paragraph(format!(
        "Report Period: {} - {}",
        display_time(report.window.from()),
        display_time(report.window.to())
    ));
    page.heading(2, "Summary");
    page.paragraph(format!(
        "Total Time Series Keys: {}\nTotal Data Points: {}",
        report.series_keys,
        report.data_points()
    ));

    for (section, image) in report.sections.iter().zip(images) {
        let stats = &section.stats;
        page.heading(2, section.title.clone());
        page.paragraph(format!(
            "Data Points: {}\nSum: {:.2}\nAverage: {:.2}\nMax: {:.2}\nMin: {:.2}",
            stats.count, stats.sum, stats.average, stats.max, stats.min
        ));
        match image {
            Some(image) => page.chart(image),
            None => page.paragraph(format!("Chart unavailable for {}", section.title)),
        }
        page.end_section();
    }

    page.paragraph(format!("Generated: {}", display_time(report.generated_at)));
    page.into_blocks()
}
