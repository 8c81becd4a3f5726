//! RTF export.
//!
//! Paragraph properties (alignment, line spacing, spacing before/after) are
//! written once per paragraph from its first character, matching how layout
//! reads them. Character properties are written per attribute run.

use std::fmt::Write;
use std::sync::OnceLock;

use regex::Regex;

use super::{Degradations, Encoded, ExportFormat, ExportOptions, Exporter};
use crate::error::{Error, Result};
use crate::model::{Alignment, Rgb, TextAttributes};
use crate::session::Snapshot;

/// Twips per point.
const TWIPS: f32 = 20.0;

/// Font names RTF's font table cannot carry.
fn unsafe_font_name(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[;{}\\\x00-\x1f]").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(name))
}

/// Rich Text Format exporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtfExporter;

impl RtfExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for RtfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Rtf
    }

    fn name(&self) -> &str {
        "rtf"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["rtf"]
    }

    fn encode(&self, snapshot: &Snapshot, options: &ExportOptions) -> Result<Encoded> {
        let mut writer = RtfWriter::new(snapshot);
        writer.write(options).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(writer.degradations.finish(writer.out.into_bytes()))
    }
}

struct RtfWriter<'a> {
    snapshot: &'a Snapshot,
    fonts: Vec<String>,
    colors: Vec<Rgb>,
    degradations: Degradations,
    out: String,
}

impl<'a> RtfWriter<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        let mut degradations = Degradations::new("RTF");
        let default_family = &snapshot.document.default_attributes().font_family;
        let mut fonts = vec![if unsafe_font_name(default_family) {
            crate::model::DEFAULT_FONT_FAMILY.to_string()
        } else {
            default_family.clone()
        }];
        let mut colors = vec![Rgb::BLACK];

        for run in snapshot.document.runs() {
            let family = &run.attributes.font_family;
            if unsafe_font_name(family) {
                degradations.note(format!("dropped font family {:?}", family));
            } else if !fonts.contains(family) {
                fonts.push(family.clone());
            }
            if !colors.contains(&run.attributes.text_color) {
                colors.push(run.attributes.text_color);
            }
        }

        Self {
            snapshot,
            fonts,
            colors,
            degradations,
            out: String::new(),
        }
    }

    fn write(&mut self, options: &ExportOptions) -> std::fmt::Result {
        self.out.push_str("{\\rtf1\\ansi\\ansicpg1252\\deff0\\uc1\n");

        self.out.push_str("{\\fonttbl");
        for (index, family) in self.fonts.iter().enumerate() {
            write!(self.out, "{{\\f{}\\fnil {};}}", index, family)?;
        }
        self.out.push_str("}\n");

        // Entry 0 stays empty so \cf0 means "auto"
        self.out.push_str("{\\colortbl;");
        for color in &self.colors {
            write!(self.out, "\\red{}\\green{}\\blue{};", color.r, color.g, color.b)?;
        }
        self.out.push_str("}\n");

        if options.title.is_some() || options.author.is_some() {
            self.out.push_str("{\\info");
            if let Some(title) = &options.title {
                self.out.push_str("{\\title ");
                push_escaped(&mut self.out, title)?;
                self.out.push('}');
            }
            if let Some(author) = &options.author {
                self.out.push_str("{\\author ");
                push_escaped(&mut self.out, author)?;
                self.out.push('}');
            }
            self.out.push_str("}\n");
        }

        let setup = self.snapshot.setup;
        writeln!(
            self.out,
            "\\paperw{}\\paperh{}\\margl{}\\margr{}\\margt{}\\margb{}",
            twips(setup.width),
            twips(setup.height),
            twips(setup.margins.left),
            twips(setup.margins.right),
            twips(setup.margins.top),
            twips(setup.margins.bottom)
        )?;

        let doc = &self.snapshot.document;
        let length = doc.len();
        if length == 0 {
            let attrs = doc.default_attributes().clone();
            self.paragraph_header(&attrs)?;
            self.out.push_str("\n}");
            return Ok(());
        }

        let mut offset = 0;
        while offset < length {
            let paragraph = doc.paragraph_range(offset);
            let attrs = doc
                .attributes_at(paragraph.start)
                .map(|run| run.attributes)
                .map_err(|_| std::fmt::Error)?;
            self.paragraph_header(&attrs)?;

            let has_newline = doc.char_at(paragraph.end.saturating_sub(1)) == Some('\n');
            let content_end = if has_newline {
                paragraph.end - 1
            } else {
                paragraph.end
            };
            for run in doc.runs_in(paragraph.start..content_end).map_err(|_| std::fmt::Error)? {
                let text: String = doc.chars_from(run.range.start).take(run.len()).collect();
                self.run(&run.attributes, &text)?;
            }
            if has_newline {
                self.out.push_str("\\par\n");
            }
            offset = paragraph.end;
        }
        self.out.push_str("\n}");
        Ok(())
    }

    fn paragraph_header(&mut self, attrs: &TextAttributes) -> std::fmt::Result {
        let align = match attrs.alignment {
            Alignment::Left => "\\ql",
            Alignment::Center => "\\qc",
            Alignment::Right => "\\qr",
            Alignment::Justify => "\\qj",
        };
        write!(
            self.out,
            "\\pard{}\\sl{}\\slmult1\\sb{}\\sa{} ",
            align,
            (240.0 * attrs.line_spacing).round() as i32,
            twips(attrs.paragraph_spacing_before),
            twips(attrs.paragraph_spacing_after)
        )
    }

    fn run(&mut self, attrs: &TextAttributes, text: &str) -> std::fmt::Result {
        let font = self
            .fonts
            .iter()
            .position(|family| *family == attrs.font_family)
            .unwrap_or(0);
        let color = self
            .colors
            .iter()
            .position(|c| *c == attrs.text_color)
            .map_or(0, |index| index + 1);

        write!(
            self.out,
            "{{\\f{}\\fs{}\\cf{}",
            font,
            (attrs.font_size * 2.0).round() as i32,
            color
        )?;
        if attrs.bold {
            self.out.push_str("\\b");
        }
        if attrs.italic {
            self.out.push_str("\\i");
        }
        if attrs.underline {
            self.out.push_str("\\ul");
        }
        if attrs.strikethrough {
            self.out.push_str("\\strike");
        }
        self.out.push(' ');
        push_escaped(&mut self.out, text)?;
        self.out.push('}');
        Ok(())
    }
}

fn twips(points: f32) -> i32 {
    (points * TWIPS).round() as i32
}

/// Escape text for an RTF body. Non-ASCII characters become `\uN?` with
/// `N` a signed 16-bit UTF-16 code unit.
fn push_escaped(out: &mut String, text: &str) -> std::fmt::Result {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\t' => out.push_str("\\tab "),
            '\n' => out.push_str("\\line "),
            '\r' => {}
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units).iter() {
                    write!(out, "\\u{}?", *unit as i16)?;
                }
            }
        }
    }
    Ok(())
}
