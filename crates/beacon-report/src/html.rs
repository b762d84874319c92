//! Built-in HTML document writer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::RenderError;
use crate::render::{escape_markup, DocumentBlock, DocumentWriter};

const STYLES: &str = r#"body { font-family: Helvetica, Arial, sans-serif; margin: 50px; color: #111; }
h1 { text-align: center; font-size: 24px; }
h2 { font-size: 16px; text-decoration: underline; margin-top: 28px; }
p { font-size: 12px; white-space: pre-line; }
figure { margin: 12px 0; text-align: center; }
figure img { max-width: 500px; max-height: 250px; }
.page-break { page-break-after: always; break-after: page; }
@media screen { .page-break { border-top: 1px dashed #bbb; margin: 24px 0; } }"#;

/// Writes a self-contained, printable HTML page.
///
/// Images are inlined as base64 data URIs so the artifact has no
/// external references.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDocumentWriter;

impl DocumentWriter for HtmlDocumentWriter {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn write(&self, blocks: &[DocumentBlock]) -> Result<Vec<u8>, RenderError> {
        let title = blocks
            .iter()
            .find_map(|block| match block {
                DocumentBlock::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("Report");

        let mut body = String::new();
        for block in blocks {
            match block {
                DocumentBlock::Heading { level, text } => {
                    let level = (*level).clamp(1, 6);
                    body.push_str(&format!("<h{level}>{}</h{level}>\n", escape_markup(text)));
                }
                DocumentBlock::Paragraph(text) => {
                    body.push_str(&format!("<p>{}</p>\n", escape_markup(text)));
                }
                DocumentBlock::Image(image) => {
                    body.push_str(&format!(
                        "<figure><img src=\"data:{};base64,{}\" alt=\"chart\"></figure>\n",
                        image.mime_type,
                        STANDARD.encode(&image.data),
                    ));
                }
                DocumentBlock::PageBreak => body.push_str("<div class=\"page-break\"></div>\n"),
            }
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{STYLES}
</style>
</head>
<body>
{body}</body>
</html>
"#,
            title = escape_markup(title),
        );
        Ok(html.into_bytes())
    }
}
