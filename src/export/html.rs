//! HTML export.

use std::fmt::Write;
use std::sync::OnceLock;

use regex::Regex;

use super::{Degradations, Encoded, ExportFormat, ExportOptions, Exporter};
use crate::error::{Error, Result};
use crate::model::TextAttributes;
use crate::session::Snapshot;

/// Font names that cannot be quoted safely inside a CSS declaration.
fn unsafe_css_font(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"["'\\<>;{}\x00-\x1f]"#).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(name))
}

/// HTML exporter: one `<p>` per paragraph, one `<span>` per attribute run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExporter;

impl HtmlExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for HtmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn name(&self) -> &str {
        "html"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    fn encode(&self, snapshot: &Snapshot, options: &ExportOptions) -> Result<Encoded> {
        let mut degradations = Degradations::new("HTML");
        let html = render(snapshot, options, &mut degradations)
            .map_err(|e| Error::Serialization(format!("HTML encoding failed: {}", e)))?;
        Ok(degradations.finish(html.into_bytes()))
    }
}

fn render(
    snapshot: &Snapshot,
    options: &ExportOptions,
    degradations: &mut Degradations,
) -> std::result::Result<String, std::fmt::Error> {
    let doc = &snapshot.document;
    let setup = snapshot.setup;
    let mut out = String::with_capacity(doc.len() * 2 + 512);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    writeln!(
        out,
        "<title>{}</title>",
        escape(options.title.as_deref().unwrap_or("Untitled"))
    )?;
    if let Some(author) = &options.author {
        writeln!(out, "<meta name=\"author\" content=\"{}\">", escape(author))?;
    }
    writeln!(
        out,
        "<style>body {{ max-width: {}pt; margin: {}pt auto; }} p {{ margin: 0; white-space: pre-wrap; }}</style>",
        setup.content_size().width,
        setup.margins.top
    )?;
    out.push_str("</head>\n<body>\n");

    let length = doc.len();
    let mut offset = 0;
    while offset < length {
        let paragraph = doc.paragraph_range(offset);
        let attrs = doc
            .attributes_at(paragraph.start)
            .map(|run| run.attributes)
            .map_err(|_| std::fmt::Error)?;
        write!(out, "<p style=\"{}\">", paragraph_style(&attrs))?;

        let content_end = if doc.char_at(paragraph.end.saturating_sub(1)) == Some('\n') {
            paragraph.end - 1
        } else {
            paragraph.end
        };
        if content_end == paragraph.start {
            out.push_str("<br>");
        }
        for run in doc
            .runs_in(paragraph.start..content_end)
            .map_err(|_| std::fmt::Error)?
        {
            let text: String = doc.chars_from(run.range.start).take(run.len()).collect();
            write!(
                out,
                "<span style=\"{}\">{}</span>",
                span_style(&run.attributes, degradations),
                escape(&text)
            )?;
        }
        out.push_str("</p>\n");
        offset = paragraph.end;
    }

    out.push_str("</body>\n</html>\n");
    Ok(out)
}

fn paragraph_style(attrs: &TextAttributes) -> String {
    format!(
        "text-align: {}; line-height: {}; margin-top: {}pt; margin-bottom: {}pt;",
        attrs.alignment.as_str(),
        1.2 * attrs.line_spacing,
        attrs.paragraph_spacing_before,
        attrs.paragraph_spacing_after
    )
}

fn span_style(attrs: &TextAttributes, degradations: &mut Degradations) -> String {
    let mut style = String::new();
    if unsafe_css_font(&attrs.font_family) {
        degradations.note(format!("dropped font family {:?}", attrs.font_family));
    } else {
        style.push_str(&format!("font-family: '{}'; ", attrs.font_family));
    }
    style.push_str(&format!("font-size: {}pt; ", attrs.font_size));
    if attrs.bold {
        style.push_str("font-weight: bold; ");
    }
    if attrs.italic {
        style.push_str("font-style: italic; ");
    }
    match (attrs.underline, attrs.strikethrough) {
        (true, true) => style.push_str("text-decoration: underline line-through; "),
        (true, false) => style.push_str("text-decoration: underline; "),
        (false, true) => style.push_str("text-decoration: line-through; "),
        (false, false) => {}
    }
    style.push_str(&format!("color: {};", attrs.text_color.to_hex()));
    style
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, CharacterStyle, Rgb};
    use crate::{EditingSession, SessionOptions};

    fn encode(session: &mut EditingSession) -> (String, Vec<String>) {
        let snapshot = session.snapshot().unwrap();
        let encoded = HtmlExporter::new()
            .encode(&snapshot, &ExportOptions::new().with_title("Tom & Jerry"))
            .unwrap();
        (String::from_utf8(encoded.bytes).unwrap(), encoded.warnings)
    }

    #[test]
    fn test_html_carries_every_attribute() {
        let mut session = EditingSession::with_text("a < b\n\nquote", SessionOptions::default());
        session.on_selection_changed(0..5).unwrap();
        session.toggle_bold().unwrap();
        session.toggle_underline().unwrap();
        session.toggle_strikethrough().unwrap();
        session.update_alignment(Alignment::Right).unwrap();
        session.on_selection_changed(7..12).unwrap();
        session.apply_character_style(CharacterStyle::Quote).unwrap();

        let (html, warnings) = encode(&mut session);
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("<title>Tom &amp; Jerry</title>"));
        assert!(html.contains("text-align: right;"));
        assert!(html.contains("font-weight: bold;"));
        assert!(html.contains("text-decoration: underline line-through;"));
        assert!(html.contains(">a &lt; b</span>"));
        assert!(html.contains("<br></p>"));
        assert!(html.contains("font-style: italic; color: #555555;"));
        assert_eq!(html.matches("<p ").count(), 3);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unsafe_font_is_dropped() {
        let mut session = EditingSession::with_text("x", SessionOptions::default());
        session.on_selection_changed(0..1).unwrap();
        session.update_font_family("Evil'; }").unwrap();
        session.update_text_color(Rgb::new(1, 2, 3)).unwrap();

        let (html, warnings) = encode(&mut session);
        assert!(!html.contains("Evil"));
        assert!(html.contains("color: #010203;"));
        assert_eq!(warnings.len(), 1);
    }
}
