use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::{DocumentWriter, RenderedDocument};
use crate::types::{AppResult, PlannerError};

// A4 in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
/// 15 mm. Content never crosses it; the next line starts a new page instead.
const MARGIN: i64 = 42;

const HEADING_SIZE: i64 = 14;
const HEADING_LEADING: i64 = 20;
const HEADING_CHARS: usize = 58;

// Courier advances 0.6 em per glyph, so 10 pt text fits 85 columns in 511 pt.
const BODY_SIZE: i64 = 10;
const BODY_LEADING: i64 = 14;
const BODY_CHARS: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (BODY_SIZE * 6)) as usize;

const SECTION_GAP: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Heading,
    Body,
}

impl Style {
    fn font(&self) -> &'static [u8] {
        match self {
            Style::Heading => b"F2",
            Style::Body => b"F1",
        }
    }

    fn size(&self) -> i64 {
        match self {
            Style::Heading => HEADING_SIZE,
            Style::Body => BODY_SIZE,
        }
    }

    fn leading(&self) -> i64 {
        match self {
            Style::Heading => HEADING_LEADING,
            Style::Body => BODY_LEADING,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    style: Style,
    baseline: i64,
    text: String,
}

/// Writes an A4 PDF: bold heading, then the body wrapped line by line.
pub struct PdfReportWriter;

impl DocumentWriter for PdfReportWriter {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn render(&self, title: &str, body: &str) -> AppResult<RenderedDocument> {
        let pages = layout(title, body);
        let page_count = pages.len();
        let bytes = build_document(&pages).map_err(|e| PlannerError::Internal(format!("PDF rendering failed: {}", e)))?;
        Ok(RenderedDocument { bytes, page_count })
    }
}

/// Assign every wrapped line to a page and a baseline.
fn layout(title: &str, body: &str) -> Vec<Vec<PlacedLine>> {
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut cursor = PAGE_HEIGHT - MARGIN;

    for line in wrap(title, HEADING_CHARS) {
        place(&mut pages, &mut cursor, Style::Heading, line);
    }
    cursor -= SECTION_GAP;

    for raw in body.split('\n') {
        for line in wrap(raw, BODY_CHARS) {
            place(&mut pages, &mut cursor, Style::Body, line);
        }
    }

    pages
}

fn place(pages: &mut Vec<Vec<PlacedLine>>, cursor: &mut i64, style: Style, text: String) {
    if *cursor - style.leading() < MARGIN {
        pages.push(Vec::new());
        *cursor = PAGE_HEIGHT - MARGIN;
    }
    *cursor -= style.leading();
    if let Some(page) = pages.last_mut() {
        page.push(PlacedLine {
            style,
            baseline: *cursor,
            text,
        });
    }
}

/// Greedy word wrap. Leading indentation is kept on every continuation line,
/// capped at half the width. Words longer than the remaining width are
/// hard-split. An empty input yields one empty line so blank lines survive.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let text = text.trim_end_matches('\r').replace('\t', "    ");
    let width = width.max(1);
    let indent_len = text.chars().take_while(|c| *c == ' ').count().min(width / 2);
    let indent = " ".repeat(indent_len);
    let room = (width - indent_len).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for chunk in chars.chunks(room) {
            let piece: String = chunk.iter().collect();
            let needed = if current_len == 0 { chunk.len() } else { current_len + 1 + chunk.len() };
            if needed > room && current_len > 0 {
                lines.push(format!("{}{}", indent, std::mem::take(&mut current)));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += chunk.len();
        }
    }

    if current_len > 0 {
        lines.push(format!("{}{}", indent, current));
    } else if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Standard Type1 fonts only cover Latin-1; anything else prints as `?`.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn build_document(pages: &[Vec<PlacedLine>]) -> lopdf::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let heading_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => heading_font,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let mut operations = vec![Operation::new("BT", vec![])];
        for line in lines {
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(line.style.font().to_vec()), Object::Integer(line.style.size())],
            ));
            operations.push(Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Integer(MARGIN),
                    Object::Integer(line.baseline),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_latin1(&line.text), StringFormat::Literal)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
