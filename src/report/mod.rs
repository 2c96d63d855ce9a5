//! Report export: turns the generated plan into a downloadable document.

pub mod pdf;

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::ExportConfig;
use crate::types::{AppResult, PlannerError};

pub use pdf::PdfReportWriter;

const REPORT_STEM: &str = "migration_report";

pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Renders `(title, body)` into a document format.
pub trait DocumentWriter: Send + Sync {
    fn extension(&self) -> &'static str;

    fn content_type(&self) -> &'static str;

    fn render(&self, title: &str, body: &str) -> AppResult<RenderedDocument>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedReport {
    pub file_name: String,
    pub content_type: String,
    pub page_count: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ReportExporter {
    writer: Option<Arc<dyn DocumentWriter>>,
}

impl ReportExporter {
    pub fn new(writer: Option<Arc<dyn DocumentWriter>>) -> Self {
        Self { writer }
    }

    pub fn pdf() -> Self {
        Self::new(Some(Arc::new(PdfReportWriter)))
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        if config.enabled {
            Self::pdf()
        } else {
            info!("Report export disabled by configuration");
            Self::new(None)
        }
    }

    pub fn is_available(&self) -> bool {
        self.writer.is_some()
    }

    pub fn export(&self, title: &str, body: &str) -> AppResult<ExportedReport> {
        let writer = self.writer.as_ref().ok_or(PlannerError::ExporterUnavailable)?;
        let rendered = writer.render(title, body)?;

        info!(
            pages = rendered.page_count,
            bytes = rendered.bytes.len(),
            "Rendered report"
        );

        Ok(ExportedReport {
            file_name: format!("{}.{}", REPORT_STEM, writer.extension()),
            content_type: writer.content_type().to_string(),
            page_count: rendered.page_count,
            bytes: rendered.bytes,
        })
    }
}
