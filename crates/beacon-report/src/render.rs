//! Collaborator contracts for charts and documents.
//!
//! The engine decides what goes into a report; a [`ChartRenderer`] turns
//! bucketed series into an image and a [`DocumentWriter`] turns an ordered
//! list of [`DocumentBlock`]s into the final artifact. Both are trait
//! objects so a deployment can swap in other formats.

use crate::error::RenderError;

/// A rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    /// MIME type of `data`, e.g. `image/svg+xml`.
    pub mime_type: &'static str,
    /// Encoded image bytes.
    pub data: Vec<u8>,
}

/// One named line on a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Legend name.
    pub name: String,
    /// One value per chart label.
    pub values: Vec<f64>,
}

/// Draws line charts.
pub trait ChartRenderer: Send + Sync {
    /// Renders `series` against the shared x-axis `labels`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the input cannot be drawn.
    fn render_line_chart(
        &self,
        labels: &[String],
        series: &[ChartSeries],
        title: &str,
    ) -> Result<ChartImage, RenderError>;
}

/// A unit of document content.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBlock {
    /// A heading; level 1 is the document title.
    Heading {
        /// Nesting level, 1 to 3.
        level: u8,
        /// Heading text.
        text: String,
    },
    /// Body text. Embedded newlines separate lines.
    Paragraph(String),
    /// An embedded image.
    Image(ChartImage),
    /// Forces following content onto a new page.
    PageBreak,
}

/// Assembles blocks into a single artifact.
pub trait DocumentWriter: Send + Sync {
    /// MIME type of the produced artifact.
    fn content_type(&self) -> &'static str;

    /// Writes `blocks` in order.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the document cannot be produced.
    fn write(&self, blocks: &[DocumentBlock]) -> Result<Vec<u8>, RenderError>;
}

/// Escapes text for inclusion in HTML or SVG markup.
pub(crate) fn escape_markup(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
