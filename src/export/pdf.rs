//! PDF export.
//!
//! Renders the paginated view: one PDF page per [`Page`] of the snapshot,
//! each laid out line by line with the same measurer that paginated the
//! session, so page breaks in the file are exactly the on-screen breaks.
//! Text is drawn with the standard-14 Type1 faces in WinAnsi encoding. Each
//! font dictionary carries `/Widths` taken from the measurer, so a viewer
//! advances every glyph by exactly the width the layout gave it.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use rayon::prelude::*;

use super::{Degradations, Encoded, ExportFormat, ExportOptions, Exporter};
use crate::error::Result;
use crate::layout::{LayoutMeasurer, LinePlacer, PlacedLine, ResolvedFont};
use crate::model::{Alignment, Page, TextAttributes};
use crate::session::Snapshot;

/// Offset of the underline below the baseline, in em.
const UNDERLINE_OFFSET: f32 = 0.12;
/// Offset of the strikethrough above the baseline, in em.
const STRIKE_OFFSET: f32 = 0.28;
/// Rule thickness, in em.
const RULE_THICKNESS: f32 = 0.05;
/// First WinAnsi code covered by `/Widths`.
const FIRST_CHAR: u8 = 32;
/// Last WinAnsi code covered by `/Widths`.
const LAST_CHAR: u8 = 255;

/// Paginated PDF exporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExporter;

impl PdfExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for PdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn encode(&self, snapshot: &Snapshot, options: &ExportOptions) -> Result<Encoded> {
        let fonts = FontTable::new(snapshot);

        let rendered = snapshot
            .pages()
            .par_iter()
            .map(|page| render_page(snapshot, page, &fonts))
            .collect::<Result<Vec<_>>>()?;

        let mut degradations = Degradations::new("PDF");
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font_dict = Dictionary::new();
        for face in &fonts.faces {
            let widths: Vec<Object> = face.widths.iter().map(|&w| Object::Real(w)).collect();
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_font,
                "Encoding" => "WinAnsiEncoding",
                "FirstChar" => i64::from(FIRST_CHAR),
                "LastChar" => i64::from(LAST_CHAR),
                "Widths" => widths,
            });
            font_dict.set(face.resource.as_bytes().to_vec(), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => font_dict });

        let mut kids: Vec<Object> = Vec::with_capacity(rendered.len());
        for (page, (content, page_degradations)) in snapshot.pages().iter().zip(rendered) {
            degradations.merge(page_degradations);
            let stream = if options.compress {
                Stream::new(dictionary! { "Filter" => "FlateDecode" }, deflate(&content)?)
            } else {
                Stream::new(Dictionary::new(), content)
            };
            let content_id = doc.add_object(stream);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.setup.width),
                    Object::Real(page.setup.height),
                ],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = info_dictionary(&mut doc, options);
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        log::debug!(
            "Rendered {} PDF pages ({} bytes)",
            snapshot.pages().len(),
            bytes.len()
        );
        Ok(degradations.finish(bytes))
    }
}

/// One font dictionary: a standard-14 face with the measurer's advances.
struct FontFace {
    resource: String,
    base_font: &'static str,
    /// Advance of each code from `FIRST_CHAR`, in thousandths of an em
    widths: Vec<f32>,
}

impl FontFace {
    /// Advance of `byte` in points at `size`, as a viewer computes it.
    fn drawn_advance(&self, byte: u8, size: f32) -> f32 {
        let index = usize::from(byte.saturating_sub(FIRST_CHAR));
        self.widths.get(index).copied().unwrap_or(0.0) * size / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FaceKey {
    family: String,
    size: u32,
    bold: bool,
    italic: bool,
}

impl FaceKey {
    fn of(font: &ResolvedFont) -> Self {
        Self {
            family: font.family.clone(),
            size: font.size.to_bits(),
            bold: font.bold,
            italic: font.italic,
        }
    }
}

/// Font dictionaries for every face the document uses.
///
/// Two families can share a standard-14 face yet measure differently, so
/// faces are told apart by their widths as well as their PostScript name.
struct FontTable {
    faces: Vec<FontFace>,
    by_key: HashMap<FaceKey, usize>,
}

impl FontTable {
    fn new(snapshot: &Snapshot) -> Self {
        let measurer: &dyn LayoutMeasurer = snapshot.measurer.as_ref();
        let mut faces: Vec<FontFace> = Vec::new();
        let mut by_key = HashMap::new();

        for run in snapshot.document.runs() {
            let font = measurer.resolve_font(&run.attributes);
            let key = FaceKey::of(&font);
            if by_key.contains_key(&key) {
                continue;
            }

            let base_font = font.postscript_name();
            let widths = glyph_widths(measurer, &run.attributes, font.size);
            let index = match faces
                .iter()
                .position(|face| face.base_font == base_font && face.widths == widths)
            {
                Some(index) => index,
                None => {
                    faces.push(FontFace {
                        resource: format!("F{}", faces.len() + 1),
                        base_font,
                        widths,
                    });
                    faces.len() - 1
                }
            };
            by_key.insert(key, index);
        }

        Self { faces, by_key }
    }

    fn get(&self, font: &ResolvedFont) -> Option<&FontFace> {
        self.by_key
            .get(&FaceKey::of(font))
            .and_then(|&index| self.faces.get(index))
    }
}

/// Measured advance of every WinAnsi code, in thousandths of an em.
fn glyph_widths(measurer: &dyn LayoutMeasurer, attributes: &TextAttributes, size: f32) -> Vec<f32> {
    (FIRST_CHAR..=LAST_CHAR)
        .map(|code| match win_ansi_char(code) {
            Some(ch) if size > 0.0 => measurer.advance(ch, attributes) / size * 1000.0,
            _ => 0.0,
        })
        .collect()
}

fn info_dictionary(doc: &mut Document, options: &ExportOptions) -> ObjectId {
    let mut info = dictionary! {
        "Producer" => Object::string_literal(concat!("quire ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(
            chrono::Utc::now().format("D:%Y%m%d%H%M%S+00'00'").to_string()
        ),
    };
    if let Some(title) = &options.title {
        info.set("Title", text_string(title));
    }
    if let Some(author) = &options.author {
        info.set("Author", text_string(author));
    }
    doc.add_object(info)
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn render_page(
    snapshot: &Snapshot,
    page: &Page,
    fonts: &FontTable,
) -> Result<(Vec<u8>, Degradations)> {
    let mut degradations = Degradations::new("PDF");
    let mut operations = Vec::new();
    let measurer: &dyn LayoutMeasurer = snapshot.measurer.as_ref();
    let area = page.setup.content_size();

    let placer = LinePlacer::new(measurer, &snapshot.document, page.range.start, area)
        .until(page.range.end);
    for placed in placer {
        draw_line(
            snapshot,
            page,
            &placed,
            fonts,
            &mut operations,
            &mut degradations,
        )?;
    }

    let bytes = Content { operations }.encode()?;
    Ok((bytes, degradations))
}

fn draw_line(
    snapshot: &Snapshot,
    page: &Page,
    placed: &PlacedLine,
    fonts: &FontTable,
    ops: &mut Vec<Operation>,
    degradations: &mut Degradations,
) -> Result<()> {
    let doc = &snapshot.document;
    let line = &placed.line;
    let margins = page.setup.margins;
    let area = page.setup.content_size();

    let visible_end = doc
        .chars_from(line.range.start)
        .take(line.range.len())
        .enumerate()
        .filter(|(_, ch)| !ch.is_whitespace())
        .map(|(index, _)| line.range.start + index + 1)
        .last()
        .unwrap_or(line.range.start);
    if visible_end == line.range.start {
        return Ok(());
    }

    let free = (area.width - line.width).max(0.0);
    let (indent, word_spacing) = match line.alignment {
        Alignment::Left => (0.0, 0.0),
        Alignment::Center => (free / 2.0, 0.0),
        Alignment::Right => (free, 0.0),
        Alignment::Justify if !line.ends_paragraph && line.spaces > 0 => {
            (0.0, free / line.spaces as f32)
        }
        Alignment::Justify => (0.0, 0.0),
    };

    let baseline = page.setup.height - margins.top - placed.baseline();
    let mut x = margins.left + indent;

    let mut chars = doc.chars_from(line.range.start);
    for run in doc.iter_runs(line.range.start..visible_end)? {
        let attrs = &run.attributes;
        let font = snapshot.measurer.resolve_font(attrs);
        let face = match fonts.get(&font) {
            Some(face) => face,
            None => {
                degradations.note(format!("no font resource for {}", font.postscript_name()));
                x += chars
                    .by_ref()
                    .take(run.len())
                    .map(|ch| snapshot.measurer.advance(ch, attrs))
                    .sum::<f32>();
                continue;
            }
        };

        // Text pieces for TJ; numbers between them shift the pen wherever
        // the drawn byte advances differently from the measured character.
        let mut pieces: Vec<Object> = Vec::new();
        let mut encoded = Vec::with_capacity(run.len());
        let mut width = 0.0;
        for ch in chars.by_ref().take(run.len()) {
            let mut advance = snapshot.measurer.advance(ch, attrs);
            if ch == ' ' {
                advance += word_spacing;
            }
            width += advance;

            let byte = match win_ansi(ch) {
                Some(byte) => byte,
                None => {
                    degradations.note(format!(
                        "U+{:04X} is not in WinAnsi encoding, replaced with '?'",
                        ch as u32
                    ));
                    b'?'
                }
            };
            encoded.push(byte);

            let mut drawn = face.drawn_advance(byte, font.size);
            if byte == b' ' {
                drawn += word_spacing;
            }
            let shift = advance - drawn;
            if shift.abs() > 1e-3 && font.size > 0.0 {
                pieces.push(Object::String(
                    std::mem::take(&mut encoded),
                    StringFormat::Literal,
                ));
                pieces.push(Object::Real(-shift / font.size * 1000.0));
            }
        }

        let (r, g, b) = attrs.text_color.to_unit();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(face.resource.as_bytes().to_vec()),
                Object::Real(font.size),
            ],
        ));
        ops.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        ops.push(Operation::new("Tw", vec![Object::Real(word_spacing)]));
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(x),
                Object::Real(baseline),
            ],
        ));
        if pieces.is_empty() {
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encoded, StringFormat::Literal)],
            ));
        } else {
            if !encoded.is_empty() {
                pieces.push(Object::String(encoded, StringFormat::Literal));
            }
            ops.push(Operation::new("TJ", vec![Object::Array(pieces)]));
        }
        ops.push(Operation::new("ET", vec![]));

        let thickness = font.size * RULE_THICKNESS;
        if attrs.underline {
            rule(ops, x, baseline - font.size * UNDERLINE_OFFSET, width, thickness);
        }
        if attrs.strikethrough {
            rule(ops, x, baseline + font.size * STRIKE_OFFSET, width, thickness);
        }

        x += width;
    }
    Ok(())
}

/// Filled rectangle in the current fill color.
fn rule(ops: &mut Vec<Operation>, x: f32, y: f32, width: f32, thickness: f32) {
    ops.push(Operation::new(
        "re",
        vec![
            Object::Real(x),
            Object::Real(y),
            Object::Real(width),
            Object::Real(thickness),
        ],
    ));
    ops.push(Operation::new("f", vec![]));
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// WinAnsi codes in 0x80..=0x9f, where the encoding departs from Latin-1.
const WIN_ANSI_EXTRA: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8a),
    ('‹', 0x8b),
    ('Œ', 0x8c),
    ('Ž', 0x8e),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201c}', 0x93),
    ('\u{201d}', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9a),
    ('›', 0x9b),
    ('œ', 0x9c),
    ('ž', 0x9e),
    ('Ÿ', 0x9f),
];

/// Map a character to its WinAnsiEncoding byte.
fn win_ansi(ch: char) -> Option<u8> {
    let code = ch as u32;
    match ch {
        '\t' => Some(b' '),
        _ if (0x20..0x7f).contains(&code) || (0xa0..=0xff).contains(&code) => Some(code as u8),
        _ => WIN_ANSI_EXTRA
            .iter()
            .find(|(extra, _)| *extra == ch)
            .map(|&(_, byte)| byte),
    }
}

/// The character a WinAnsiEncoding byte stands for.
fn win_ansi_char(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7e | 0xa0..=0xff => Some(char::from(byte)),
        _ => WIN_ANSI_EXTRA
            .iter()
            .find(|(_, extra)| *extra == byte)
            .map(|&(ch, _)| ch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EditingSession, SessionOptions};

    /// Bytes shown by a Tj or TJ operation.
    fn shown_bytes(op: &Operation) -> Vec<u8> {
        let mut bytes = Vec::new();
        let items: &[Object] = match (op.operator.as_str(), op.operands.first()) {
            ("Tj", _) => &op.operands,
            ("TJ", Some(Object::Array(items))) => items,
            _ => &[],
        };
        for item in items {
            if let Object::String(piece, _) = item {
                bytes.extend_from_slice(piece);
            }
        }
        bytes
    }

    /// `(baseline, start, end)` of every text object on a page, advancing
    /// glyphs by the font dictionaries' `/Widths` as a viewer does.
    fn drawn_spans(pdf: &Document, page_id: ObjectId) -> Vec<(f32, f32, f32)> {
        let fonts = pdf.get_page_fonts(page_id).unwrap();
        let content = Content::decode(&pdf.get_page_content(page_id).unwrap()).unwrap();

        let mut spans = Vec::new();
        let mut widths: Vec<f32> = Vec::new();
        let (mut size, mut spacing, mut x, mut y) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for op in &content.operations {
            let number = |index: usize| op.operands[index].as_float().unwrap();
            match op.operator.as_str() {
                "Tf" => {
                    let font = fonts[op.operands[0].as_name().unwrap()];
                    assert_eq!(font.get(b"FirstChar").unwrap().as_i64().unwrap(), 32);
                    widths = font
                        .get(b"Widths")
                        .unwrap()
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|width| width.as_float().unwrap())
                        .collect();
                    size = number(1);
                }
                "Tw" => spacing = number(0),
                "Tm" => {
                    x = number(4);
                    y = number(5);
                }
                "Tj" | "TJ" => {
                    let start = x;
                    let items = match op.operands.first() {
                        Some(Object::Array(items)) => items.clone(),
                        _ => op.operands.clone(),
                    };
                    for item in &items {
                        match item {
                            Object::String(bytes, _) => {
                                for &byte in bytes {
                                    x += widths[usize::from(byte - 32)] * size / 1000.0;
                                    if byte == b' ' {
                                        x += spacing;
                                    }
                                }
                            }
                            other => x -= other.as_float().unwrap() * size / 1000.0,
                        }
                    }
                    spans.push((y, start, x));
                }
                _ => {}
            }
        }
        spans
    }

    fn load(snapshot: &Snapshot, options: &ExportOptions) -> (Document, Vec<String>) {
        let encoded = PdfExporter::new().encode(snapshot, options).unwrap();
        (Document::load_mem(&encoded.bytes).unwrap(), encoded.warnings)
    }

    fn shown_text(doc: &Document, page_id: ObjectId) -> String {
        let content = doc.get_page_content(page_id).unwrap();
        let content = Content::decode(&content).unwrap();
        content
            .operations
            .iter()
            .map(|op| String::from_utf8_lossy(&shown_bytes(op)).into_owned())
            .collect()
    }

    #[test]
    fn test_page_count_matches_pagination() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(400);
        let mut session = EditingSession::with_text(&text, SessionOptions::default());
        let snapshot = session.snapshot().unwrap();
        assert!(snapshot.pages().len() > 1);

        let (pdf, _) = load(&snapshot, &ExportOptions::new().with_compression(false));
        let pages = pdf.get_pages();
        assert_eq!(pages.len(), snapshot.pages().len());

        for (index, page_id) in pages.values().enumerate() {
            let expected: String = snapshot
                .page_text(index)
                .unwrap()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let shown: String = shown_text(&pdf, *page_id)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            assert_eq!(shown, expected, "page {}", index);
        }
    }

    #[test]
    fn test_media_box_and_fonts() {
        let mut session = EditingSession::with_text("plain bold", SessionOptions::default());
        session.on_selection_changed(6..10).unwrap();
        session.toggle_bold().unwrap();
        let snapshot = session.snapshot().unwrap();

        let (pdf, warnings) = load(&snapshot, &ExportOptions::default());
        assert!(warnings.is_empty());
        let page_id = *pdf.get_pages().values().next().unwrap();
        let page = pdf.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 612.0);
        assert_eq!(media_box[3].as_float().unwrap(), 792.0);

        let fonts = pdf.get_page_fonts(page_id).unwrap();
        let names: Vec<String> = fonts
            .values()
            .map(|font| {
                String::from_utf8_lossy(font.get(b"BaseFont").unwrap().as_name().unwrap())
                    .into_owned()
            })
            .collect();
        assert!(names.contains(&"Helvetica".to_string()));
        assert!(names.contains(&"Helvetica-Bold".to_string()));
    }

    #[test]
    fn test_empty_document_has_minimum_pages() {
        let mut session = EditingSession::new(SessionOptions::new().with_minimum_pages(2));
        let snapshot = session.snapshot().unwrap();
        let (pdf, _) = load(&snapshot, &ExportOptions::default());
        assert_eq!(pdf.get_pages().len(), 2);
    }

    #[test]
    fn test_unencodable_characters_degrade() {
        let mut session = EditingSession::with_text("漢字 and café", SessionOptions::default());
        let snapshot = session.snapshot().unwrap();
        let (pdf, warnings) = load(&snapshot, &ExportOptions::new().with_compression(false));
        assert_eq!(warnings.len(), 2);

        let page_id = *pdf.get_pages().values().next().unwrap();
        let content = pdf.get_page_content(page_id).unwrap();
        let decoded = Content::decode(&content).unwrap();
        let shown = decoded
            .operations
            .iter()
            .find(|op| op.operator == "TJ")
            .map(shown_bytes)
            .unwrap();
        assert_eq!(shown.as_slice(), b"?? and caf\xe9");

        // The wide glyphs keep their measured advance
        let (_, start, end) = drawn_spans(&pdf, page_id)[0];
        let measured: f32 = "漢字 and café"
            .chars()
            .map(|ch| snapshot.measurer.advance(ch, &TextAttributes::default()))
            .sum();
        assert!((end - start - measured).abs() < 0.01);
    }

    #[test]
    fn test_fonts_carry_measured_widths() {
        let mut session = EditingSession::with_text("neue verdana", SessionOptions::default());
        session.on_selection_changed(5..12).unwrap();
        session.update_font_family("Verdana").unwrap();
        let snapshot = session.snapshot().unwrap();

        let (pdf, _) = load(&snapshot, &ExportOptions::default());
        let page_id = *pdf.get_pages().values().next().unwrap();
        let fonts = pdf.get_page_fonts(page_id).unwrap();
        // Both families draw with Helvetica but measure differently
        assert_eq!(fonts.len(), 2);

        let mut m_widths = Vec::new();
        for font in fonts.values() {
            assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
            assert_eq!(font.get(b"LastChar").unwrap().as_i64().unwrap(), 255);
            let widths = font.get(b"Widths").unwrap().as_array().unwrap();
            assert_eq!(widths.len(), 224);
            m_widths.push(widths[usize::from(b'm' - 32)].as_float().unwrap());
        }
        m_widths.sort_by(f32::total_cmp);
        assert!((m_widths[0] - 500.0).abs() < 0.01);
        assert!((m_widths[1] - 580.0).abs() < 0.01);
    }

    #[test]
    fn test_lines_end_inside_right_margin() {
        let text = format!(
            "{}\n{}\n{}\n{}\nkey\tvalue\twith tabs\n",
            "m".repeat(200),
            "Wide words like mummy and maximum wrap here. ".repeat(12),
            "Justified prose spreads its spaces to both edges. ".repeat(12),
            "Right aligned paragraph text. ".repeat(6),
        );
        let mut session = EditingSession::with_text(&text, SessionOptions::default());
        let justified_start = 201 + 45 * 12 + 1;
        let justified_end = justified_start + 50 * 12;
        session
            .on_selection_changed(justified_start..justified_end)
            .unwrap();
        session.update_alignment(Alignment::Justify).unwrap();
        session.on_selection_changed(justified_end + 1..justified_end + 2).unwrap();
        session.update_alignment(Alignment::Right).unwrap();
        session.on_selection_changed(205..215).unwrap();
        session.toggle_bold().unwrap();
        let snapshot = session.snapshot().unwrap();

        let setup = snapshot.setup;
        let right_edge = setup.margins.left + setup.content_size().width;
        let (pdf, _) = load(&snapshot, &ExportOptions::new().with_compression(false));

        let mut flush_lines = 0;
        for page_id in pdf.get_pages().values() {
            let spans = drawn_spans(&pdf, *page_id);
            assert!(!spans.is_empty());
            for (index, &(baseline, start, end)) in spans.iter().enumerate() {
                assert!(start >= setup.margins.left - 0.01);
                assert!(end <= right_edge + 0.05, "line at {} ends at {}", baseline, end);
                if (end - right_edge).abs() < 0.05 {
                    flush_lines += 1;
                }
                // Runs of one line abut exactly
                if let Some(&(next_baseline, next_start, _)) = spans.get(index + 1) {
                    if next_baseline == baseline {
                        assert!((next_start - end).abs() < 0.01);
                    }
                }
            }
        }
        // Justified and right-aligned lines reach the margin
        assert!(flush_lines >= 5, "{} flush lines", flush_lines);
    }

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi('A'), Some(b'A'));
        assert_eq!(win_ansi('é'), Some(0xe9));
        assert_eq!(win_ansi('€'), Some(0x80));
        assert_eq!(win_ansi('\u{201c}'), Some(0x93));
        assert_eq!(win_ansi('漢'), None);
    }
}
