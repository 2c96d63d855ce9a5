use std::collections::HashMap;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::Timelike;
use tracing::{info, warn};

use super::converters::Converters;
use super::detect::detect;
use super::table::Table;
use crate::models::{ContentKind, ExtractedContent, ItemOutcome, Preview, UploadedItem};
use crate::types::{AppResult, PlannerError};

pub const PDF_UNAVAILABLE_PLACEHOLDER: &str = "[pdf text extraction unavailable]";
pub const OCR_UNAVAILABLE_PLACEHOLDER: &str = "[ocr engine unavailable]";

/// Everything an extractor function may consult besides the bytes.
pub struct ExtractContext<'a> {
    pub converters: &'a Converters,
    pub preview_rows: usize,
}

pub type ExtractFn = fn(&ExtractContext<'_>, &[u8]) -> AppResult<ExtractedContent>;

/// Dispatches raw bytes to the extractor registered for their kind.
pub struct ContentExtractor {
    converters: Converters,
    preview_rows: usize,
    handlers: HashMap<ContentKind, ExtractFn>,
}

impl ContentExtractor {
    pub fn new(converters: Converters, preview_rows: usize) -> Self {
        info!(
            pdf = converters.pdf.as_ref().map_or("none", |c| c.name()),
            ocr = converters.ocr.as_ref().map_or("none", |c| c.name()),
            preview_rows,
            "Content extractor ready"
        );

        let mut extractor = Self {
            converters,
            preview_rows,
            handlers: HashMap::new(),
        };
        extractor.register(ContentKind::Csv, extract_csv);
        extractor.register(ContentKind::Excel, extract_excel);
        extractor.register(ContentKind::Json, extract_json);
        extractor.register(ContentKind::Pdf, extract_pdf);
        extractor.register(ContentKind::Image, extract_image);
        extractor.register(ContentKind::Text, extract_text);
        extractor
    }

    /// Replace or add the extractor for a kind.
    pub fn register(&mut self, kind: ContentKind, handler: ExtractFn) {
        self.handlers.insert(kind, handler);
    }

    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    pub fn extract(&self, bytes: &[u8], kind: ContentKind) -> AppResult<ExtractedContent> {
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| PlannerError::ConverterUnavailable(format!("no extractor registered for {}", kind)))?;

        let ctx = ExtractContext {
            converters: &self.converters,
            preview_rows: self.preview_rows,
        };

        // Parsers see untrusted bytes; a panic in one must stay scoped to its item.
        panic::catch_unwind(AssertUnwindSafe(|| handler(&ctx, bytes)))
            .unwrap_or_else(|_| Err(PlannerError::decode(kind, "parser aborted on malformed input")))
    }

    pub fn extract_item(&self, item: &UploadedItem, override_kind: Option<ContentKind>) -> ItemOutcome {
        let kind = detect(&item.name, &item.mime_hint, override_kind);
        let result = self.extract(&item.bytes, kind);

        match &result {
            Ok(content) => info!(
                file = %item.name,
                kind = %kind,
                bytes = item.bytes.len(),
                text_len = content.normalized_text.len(),
                placeholder = content.notice.is_some(),
                "Extracted upload"
            ),
            Err(e) => warn!(file = %item.name, kind = %kind, error = %e, "Failed to extract upload"),
        }

        ItemOutcome {
            name: item.name.clone(),
            kind,
            result,
        }
    }

    /// Extract every item independently, in upload order.
    pub fn extract_batch(&self, items: &[UploadedItem], override_kind: Option<ContentKind>) -> Vec<ItemOutcome> {
        items
            .iter()
            .map(|item| self.extract_item(item, override_kind))
            .collect()
    }
}

fn extract_csv(ctx: &ExtractContext<'_>, bytes: &[u8]) -> AppResult<ExtractedContent> {
    let table = Table::parse_csv(bytes).map_err(|e| PlannerError::decode(ContentKind::Csv, e))?;
    if table.headers.is_empty() {
        return Err(PlannerError::decode(ContentKind::Csv, "no columns to parse"));
    }

    let text = table.to_csv()?;
    Ok(ExtractedContent::new(ContentKind::Csv, text).with_preview(Preview::Table(table.head(ctx.preview_rows))))
}

fn extract_excel(ctx: &ExtractContext<'_>, bytes: &[u8]) -> AppResult<ExtractedContent> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| PlannerError::decode(ContentKind::Excel, e))?;

    let mut sections = Vec::new();
    let mut sheets = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| PlannerError::decode(ContentKind::Excel, format!("sheet {}: {}", name, e)))?;

        let records: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        let table = Table::from_records(records);

        sections.push(format!("Sheet: {}\n{}", name, table.to_csv()?));
        sheets.push((name, table.head(ctx.preview_rows)));
    }

    Ok(ExtractedContent::new(ContentKind::Excel, sections.join("\n")).with_preview(Preview::Workbook { sheets }))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => excel_datetime_to_string(d),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Date-formatted cells render as ISO dates, with the time only when it is not midnight.
fn excel_datetime_to_string(d: &ExcelDateTime) -> String {
    if d.is_duration() {
        return d.as_f64().to_string();
    }
    match d.as_datetime() {
        Some(dt) if dt.time().num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => d.as_f64().to_string(),
    }
}

fn extract_json(_ctx: &ExtractContext<'_>, bytes: &[u8]) -> AppResult<ExtractedContent> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| PlannerError::decode(ContentKind::Json, e))?;
    let text = serde_json::to_string(&value)
        .map_err(|e| PlannerError::Internal(format!("JSON serialization failed: {}", e)))?;

    Ok(ExtractedContent::new(ContentKind::Json, text).with_preview(Preview::Structured { value }))
}

fn extract_pdf(ctx: &ExtractContext<'_>, bytes: &[u8]) -> AppResult<ExtractedContent> {
    let Some(pdf) = ctx.converters.pdf.as_ref() else {
        return Ok(ExtractedContent::new(ContentKind::Pdf, PDF_UNAVAILABLE_PLACEHOLDER)
            .with_notice("PDF text extraction is not available on this server"));
    };

    match pdf.page_texts(bytes) {
        Ok(pages) => Ok(ExtractedContent::new(ContentKind::Pdf, pages.join("\n"))),
        Err(PlannerError::ConverterUnavailable(reason)) => {
            Ok(ExtractedContent::new(ContentKind::Pdf, PDF_UNAVAILABLE_PLACEHOLDER).with_notice(reason))
        }
        Err(e) => Err(e),
    }
}

fn extract_image(ctx: &ExtractContext<'_>, bytes: &[u8]) -> AppResult<ExtractedContent> {
    let decoded = image::load_from_memory(bytes).map_err(|e| PlannerError::decode(ContentKind::Image, e))?;
    let preview = Preview::Image {
        width: decoded.width(),
        height: decoded.height(),
        color: format!("{:?}", decoded.color()),
    };
    let rgb = decoded.to_rgb8();

    let Some(ocr) = ctx.converters.ocr.as_ref() else {
        return Ok(ExtractedContent::new(ContentKind::Image, OCR_UNAVAILABLE_PLACEHOLDER)
            .with_preview(preview)
            .with_notice("OCR is not available on this server"));
    };

    match ocr.recognize(&rgb) {
        Ok(text) => Ok(ExtractedContent::new(ContentKind::Image, text).with_preview(preview)),
        Err(PlannerError::ConverterUnavailable(reason)) => Ok(ExtractedContent::new(
            ContentKind::Image,
            OCR_UNAVAILABLE_PLACEHOLDER,
        )
        .with_preview(preview)
        .with_notice(reason)),
        Err(e) => Err(e),
    }
}

fn extract_text(_ctx: &ExtractContext<'_>, bytes: &[u8]) -> AppResult<ExtractedContent> {
    let text = std::str::from_utf8(bytes).map_err(|e| PlannerError::decode(ContentKind::Text, e))?;
    Ok(ExtractedContent::new(ContentKind::Text, text))
}
