//! Vertical layout tracking for paged documents.
//!
//! The writer only sees blocks, so pagination is decided here by
//! estimating how far down the page each block pushes the cursor.

use crate::render::{ChartImage, DocumentBlock};

/// Cursor position at the top of every page.
pub const TOP_MARGIN: f32 = 50.0;
/// Height reserved for an embedded chart.
pub const CHART_HEIGHT: f32 = 250.0;
/// A chart starting below this point moves to a new page.
pub const CHART_BREAK_THRESHOLD: f32 = 500.0;
/// A section ending below this point is followed by a page break.
pub const SECTION_BREAK_THRESHOLD: f32 = 650.0;

const LINE_HEIGHT: f32 = 14.0;
const BLOCK_GAP: f32 = 10.0;
const CHART_GAP: f32 = 20.0;

/// Accumulates blocks while tracking the vertical cursor.
#[derive(Debug, Clone)]
pub struct PageLayout {
    blocks: Vec<DocumentBlock>,
    cursor: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl PageLayout {
    /// An empty layout positioned at the top margin.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            cursor: TOP_MARGIN,
        }
    }

    /// Current distance from the top of the page.
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Adds a heading.
    pub fn heading(&mut self, level: u8, text: impl Into<String>) {
        self.cursor += match level {
            0 | 1 => 40.0,
            2 => 28.0,
            _ => 22.0,
        };
        self.blocks.push(DocumentBlock::Heading {
            level,
            text: text.into(),
        });
    }

    /// Adds a paragraph; each embedded newline counts as a line.
    pub fn paragraph(&mut self, text: impl Into<String>) {
        let text = text.into();
        let lines = text.lines().count().max(1) as f32;
        self.cursor += lines * LINE_HEIGHT + BLOCK_GAP;
        self.blocks.push(DocumentBlock::Paragraph(text));
    }

    /// Adds a chart, first breaking the page if the cursor is too low to
    /// fit it.
    pub fn chart(&mut self, image: ChartImage) {
        if self.cursor > CHART_BREAK_THRESHOLD {
            self.page_break();
        }
        self.cursor += CHART_HEIGHT + CHART_GAP;
        self.blocks.push(DocumentBlock::Image(image));
    }

    /// Closes a section, breaking the page if little room is left.
    pub fn end_section(&mut self) {
        if self.cursor > SECTION_BREAK_THRESHOLD {
            self.page_break();
        }
    }

    /// Starts a new page.
    pub fn page_break(&mut self) {
        self.blocks.push(DocumentBlock::PageBreak);
        self.cursor = TOP_MARGIN;
    }

    /// The accumulated blocks.
    pub fn into_blocks(self) -> Vec<DocumentBlock> {
        self.blocks
    }
}
