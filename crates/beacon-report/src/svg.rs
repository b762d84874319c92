//! Built-in SVG line-chart renderer.

use crate::error::RenderError;
use crate::render::{escape_markup, ChartImage, ChartRenderer, ChartSeries};

const PALETTE: [&str; 6] = [
    "rgb(54,162,235)",
    "rgb(255,99,132)",
    "rgb(75,192,192)",
    "rgb(255,206,86)",
    "rgb(153,102,255)",
    "rgb(255,159,64)",
];

const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;

/// Renders charts as standalone SVG documents.
///
/// The y axis starts at zero. Labels are drawn under each point, rotated
/// so that up to twenty of them stay legible.
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    width: u32,
    height: u32,
}

impl SvgChartRenderer {
    /// A renderer producing images of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self::new(800, 400)
    }
}

fn validate(labels: &[String], series: &[ChartSeries]) -> Result<(), RenderError> {
    if labels.is_empty() || series.is_empty() {
        return Err(RenderError::EmptyChart);
    }
    for s in series {
        if s.values.len() != labels.len() {
            return Err(RenderError::LengthMismatch {
                series: s.name.clone(),
                expected: labels.len(),
                actual: s.values.len(),
            });
        }
        if s.values.iter().any(|v| !v.is_finite()) {
            return Err(RenderError::NonFinite(s.name.clone()));
        }
    }
    Ok(())
}

impl ChartRenderer for SvgChartRenderer {
    fn render_line_chart(
        &self,
        labels: &[String],
        series: &[ChartSeries],
        title: &str,
    ) -> Result<ChartImage, RenderError> {
        validate(labels, series)?;

        let width = f64::from(self.width);
        let height = f64::from(self.height);
        let plot_w = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
        let plot_h = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
        let baseline = MARGIN_TOP + plot_h;

        let peak = series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0_f64, f64::max);
        let top = if peak > 0.0 { peak } else { 1.0 };

        let x_at = |i: usize| {
            if labels.len() == 1 {
                MARGIN_LEFT + plot_w / 2.0
            } else {
                MARGIN_LEFT + plot_w * i as f64 / (labels.len() - 1) as f64
            }
        };
        let y_at = |v: f64| baseline - plot_h * v.max(0.0) / top;

        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        ));
        svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="24" font-size="16" text-anchor="middle">{title}</text>"#,
            x = width / 2.0,
            title = escape_markup(title),
        ));

        // Axes and y-range annotations.
        svg.push_str(&format!(
            r#"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="black"/><line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="black"/>"#,
            l = MARGIN_LEFT,
            t = MARGIN_TOP,
            b = baseline,
            r = MARGIN_LEFT + plot_w,
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" font-size="10" text-anchor="end">0</text><text x="{x:.1}" y="{t:.1}" font-size="10" text-anchor="end">{top}</text>"#,
            x = MARGIN_LEFT - 6.0,
            y = baseline,
            t = MARGIN_TOP + 4.0,
            top = format_axis_value(top),
        ));

        for (i, label) in labels.iter().enumerate() {
            let x = x_at(i);
            let y = baseline + 14.0;
            svg.push_str(&format!(
                r#"<text x="{x:.1}" y="{y:.1}" font-size="10" text-anchor="end" transform="rotate(-40 {x:.1} {y:.1})">{label}</text>"#,
                label = escape_markup(label),
            ));
        }

        for (n, s) in series.iter().enumerate() {
            let color = PALETTE[n % PALETTE.len()];
            let points = s
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{:.1},{:.1}", x_at(i), y_at(*v)))
                .collect::<Vec<_>>()
                .join(" ");
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{points}"/>"#
            ));
            svg.push_str(&format!(
                r#"<text x="{x:.1}" y="{y:.1}" font-size="11" fill="{color}">{name}</text>"#,
                x = MARGIN_LEFT + 8.0 + 150.0 * n as f64,
                y = MARGIN_TOP - 8.0,
                name = escape_markup(&s.name),
            ));
        }

        svg.push_str("</svg>");
        Ok(ChartImage {
            mime_type: "image/svg+xml",
            data: svg.into_bytes(),
        })
    }
}

fn format_axis_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}
