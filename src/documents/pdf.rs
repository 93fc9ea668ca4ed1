//! Lesson plan PDF rendering
//!
//! Produces an uncompressed PDF 1.4 file on A4 paper using the base-14
//! Helvetica fonts, so no font data has to be embedded. Text is encoded as
//! WinAnsi; characters outside that code page are replaced with `?`.

use super::markdown::{Block, LessonDocument};
use crate::error::{ForgeError, Result};
use std::fmt::Write as _;

/// Header printed at the top of every lesson plan
pub const LESSON_HEADER: &str = "LESSON FORGE - LESSON PLAN";

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 50.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 60.0;
const BULLET_INDENT: f32 = 16.0;

// Average Helvetica glyph width as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.52;

/// Brand colour #016B61
const PRIMARY_RGB: (f32, f32, f32) = (0.004, 0.420, 0.380);
const TEXT_RGB: (f32, f32, f32) = (0.15, 0.15, 0.15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Italic => "F3",
        }
    }
}

/// Page-by-page content stream builder
#[derive(Debug)]
struct PageLayout {
    pages: Vec<String>,
    current: String,
    cursor_y: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            cursor_y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor_y - height < MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.cursor_y = PAGE_HEIGHT - MARGIN_TOP;
    }

    fn space(&mut self, height: f32) {
        self.cursor_y -= height;
    }

    fn text_line(&mut self, text: &str, font: Font, size: f32, x: f32, rgb: (f32, f32, f32)) {
        let leading = size * 1.35;
        self.ensure_room(leading);
        self.cursor_y -= leading;
        let _ = writeln!(
            self.current,
            "BT {:.3} {:.3} {:.3} rg /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET",
            rgb.0,
            rgb.1,
            rgb.2,
            font.resource(),
            size,
            x,
            self.cursor_y,
            encode_text(text)
        );
    }

    /// Write `text` wrapped to the available width
    fn paragraph(&mut self, text: &str, font: Font, size: f32, indent: f32, rgb: (f32, f32, f32)) {
        let width = PAGE_WIDTH - 2.0 * MARGIN_X - indent;
        for line in wrap(text, max_chars(width, size)) {
            self.text_line(&line, font, size, MARGIN_X + indent, rgb);
        }
    }

    fn bullet(&mut self, text: &str, size: f32) {
        let width = PAGE_WIDTH - 2.0 * MARGIN_X - BULLET_INDENT * 2.0;
        let lines = wrap(text, max_chars(width, size));
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                let leading = size * 1.35;
                self.ensure_room(leading);
                let y = self.cursor_y - leading;
                let _ = writeln!(
                    self.current,
                    "BT {:.3} {:.3} {:.3} rg /F1 {:.1} Tf {:.2} {:.2} Td (\\225) Tj ET",
                    PRIMARY_RGB.0,
                    PRIMARY_RGB.1,
                    PRIMARY_RGB.2,
                    size,
                    MARGIN_X + BULLET_INDENT,
                    y
                );
            }
            self.text_line(line, Font::Regular, size, MARGIN_X + BULLET_INDENT * 2.0, TEXT_RGB);
        }
    }

    fn rule(&mut self) {
        self.ensure_room(8.0);
        self.cursor_y -= 6.0;
        let _ = writeln!(
            self.current,
            "{:.3} {:.3} {:.3} RG 1 w {:.2} {:.2} m {:.2} {:.2} l S",
            PRIMARY_RGB.0,
            PRIMARY_RGB.1,
            PRIMARY_RGB.2,
            MARGIN_X,
            self.cursor_y,
            PAGE_WIDTH - MARGIN_X,
            self.cursor_y
        );
        self.cursor_y -= 6.0;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn max_chars(width: f32, size: f32) -> usize {
    ((width / (size * GLYPH_WIDTH)).floor() as usize).max(10)
}

/// Greedy word wrap on character counts
fn wrap(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        // Split words that would never fit on a line of their own
        while word.chars().count() > max {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let head: String = word.chars().take(max).collect();
            word = word.chars().skip(max).collect();
            lines.push(head);
        }
        if word.is_empty() {
            continue;
        }
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > max && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Map a character to its WinAnsi byte
fn win_ansi(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2026}' => Some(0x85),
        '\u{20AC}' => Some(0x80),
        '\t' => Some(b' '),
        _ => None,
    }
}

/// Escape text for a PDF literal string
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match win_ansi(c) {
            Some(b'(') => out.push_str("\\("),
            Some(b')') => out.push_str("\\)"),
            Some(b'\\') => out.push_str("\\\\"),
            Some(b) if b.is_ascii() => out.push(b as char),
            Some(b) => {
                let _ = write!(out, "\\{:03o}", b);
            }
            None => out.push('?'),
        }
    }
    out
}

/// Lay out a lesson plan into per-page content streams
fn layout(doc: &LessonDocument) -> Vec<String> {
    let mut page = PageLayout::new();

    let header_size = 18.0;
    let header_width = LESSON_HEADER.len() as f32 * header_size * 0.62;
    let header_x = ((PAGE_WIDTH - header_width) / 2.0).max(MARGIN_X);
    page.text_line(LESSON_HEADER, Font::Bold, header_size, header_x, PRIMARY_RGB);
    page.space(6.0);

    for (key, value) in &doc.metadata {
        page.paragraph(&format!("{}: {}", key, value), Font::Bold, 11.0, 0.0, TEXT_RGB);
    }
    page.rule();

    for block in &doc.blocks {
        match block {
            Block::Heading(text) => {
                page.space(8.0);
                page.paragraph(text, Font::Bold, 14.0, 0.0, PRIMARY_RGB);
                page.space(2.0);
            }
            Block::Bullet(text) => page.bullet(text, 11.0),
            Block::Paragraph(text) => page.paragraph(text, Font::Regular, 11.0, 0.0, TEXT_RGB),
            Block::Image(text) => {
                page.paragraph(&format!("[Image: {}]", text), Font::Italic, 10.0, 0.0, PRIMARY_RGB)
            }
        }
    }

    page.finish()
}

/// Serialise pages into a complete PDF file
fn assemble(pages: &[String]) -> Vec<u8> {
    // Object numbering: 1 catalog, 2 page tree, 3-5 fonts, then a
    // (page, content) pair per page.
    let first_page_obj = 6;
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| first_page_obj + i * 2).collect();

    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" "),
        pages.len()
    ));
    for base in ["Helvetica", "Helvetica-Bold", "Helvetica-Oblique"] {
        objects.push(format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            base
        ));
    }
    for (i, content) in pages.iter().enumerate() {
        let content_id = page_ids[i] + 1;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH, PAGE_HEIGHT, content_id
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

/// Render a parsed lesson plan to PDF bytes
///
/// # Errors
///
/// Returns `ForgeError::Document` if the plan has no content at all
///
/// # Examples
///
/// ```
/// use lesson_forge::documents::markdown::parse_lesson;
/// use lesson_forge::documents::pdf::render_lesson;
///
/// let bytes = render_lesson(&parse_lesson("## Warm-up\n- Say hello")).unwrap();
/// assert!(bytes.starts_with(b"%PDF-1.4"));
/// ```
pub fn render_lesson(doc: &LessonDocument) -> Result<Vec<u8>> {
    if doc.blocks.is_empty() && doc.metadata.is_empty() {
        return Err(ForgeError::Document("Lesson plan has no content".to_string()).into());
    }
    let pages = layout(doc);
    tracing::debug!("Rendered lesson plan PDF with {} page(s)", pages.len());
    Ok(assemble(&pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::markdown::parse_lesson;

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_render_contains_header_and_metadata() {
        let doc = parse_lesson("SUBJECT: English\nTOPIC: Food\nLEVEL: A2\n## Warm-up\n- Name fruits");
        let pdf = as_text(&render_lesson(&doc).unwrap());
        assert!(pdf.contains("(LESSON FORGE - LESSON PLAN)"));
        assert!(pdf.contains("(SUBJECT: English)"));
        assert!(pdf.contains("(Warm-up)"));
        assert!(pdf.contains("(Name fruits)"));
        assert!(pdf.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn test_render_rejects_empty_document() {
        assert!(render_lesson(&LessonDocument::default()).is_err());
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let doc = parse_lesson("Paragraph");
        let bytes = render_lesson(&doc).unwrap();
        let text = as_text(&bytes);
        let xref_at: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .unwrap()
            .parse()
            .unwrap();
        assert!(bytes[xref_at..].starts_with(b"xref"));

        let xref = String::from_utf8(bytes[xref_at..].to_vec()).unwrap();
        let first_entry = xref.lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(bytes[offset..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn test_long_content_breaks_pages() {
        let text: String = (0..200).map(|i| format!("- item number {}\n", i)).collect();
        let bytes = render_lesson(&parse_lesson(&text)).unwrap();
        let pdf = as_text(&bytes);
        assert!(!pdf.contains("/Count 1 "));
        assert!(pdf.contains("(item number 199)"));
    }

    #[test]
    fn test_encode_text_escapes_and_transcodes() {
        assert_eq!(encode_text("a (b) \\ c"), "a \\(b\\) \\\\ c");
        assert_eq!(encode_text("café"), "caf\\351");
        assert_eq!(encode_text("日本"), "??");
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("one two three four five six", 9);
        assert_eq!(lines, vec!["one two", "three", "four five", "six"]);
        for line in wrap(&"x".repeat(25), 10) {
            assert!(line.chars().count() <= 10);
        }
    }
}
