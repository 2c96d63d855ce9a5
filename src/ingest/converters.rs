//! Pluggable text converters for PDF and image content.
//!
//! Both are optional capabilities: an absent converter is a configuration
//! state the extractor handles with a placeholder, not an error.

use std::io::{Cursor, Write};
use std::panic::{self, AssertUnwindSafe};
use std::process::{Command, Stdio};
use std::sync::Arc;

use image::{ImageFormat, RgbImage};
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::models::ContentKind;
use crate::types::{AppResult, PlannerError};

/// Extracts the text of every page, in page order.
pub trait PdfTextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// One entry per page. Pages without text yield an empty string.
    fn page_texts(&self, bytes: &[u8]) -> AppResult<Vec<String>>;
}

/// Recognizes text in an RGB bitmap.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &RgbImage) -> AppResult<String>;
}

/// Capability set handed to the extractor at construction time.
#[derive(Clone, Default)]
pub struct Converters {
    pub pdf: Option<Arc<dyn PdfTextExtractor>>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
}

impl Converters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        let pdf: Option<Arc<dyn PdfTextExtractor>> = if config.pdf_enabled {
            Some(Arc::new(PdfExtractText))
        } else {
            info!("PDF text extraction disabled by configuration");
            None
        };

        let ocr: Option<Arc<dyn OcrEngine>> = if config.ocr_enabled {
            match TesseractCli::detect(&config.tesseract_path, &config.ocr_language) {
                Some(engine) => Some(Arc::new(engine)),
                None => {
                    warn!(
                        binary = %config.tesseract_path,
                        "Tesseract not found; image uploads will contain a placeholder instead of OCR text"
                    );
                    None
                }
            }
        } else {
            info!("OCR disabled by configuration");
            None
        };

        Self { pdf, ocr }
    }
}

/// Text layer extraction with `pdf-extract`, which keeps line breaks and
/// word spacing from the glyph positions.
pub struct PdfExtractText;

impl PdfTextExtractor for PdfExtractText {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn page_texts(&self, bytes: &[u8]) -> AppResult<Vec<String>> {
        // pdf-extract can panic on malformed font tables
        let text = match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "PDF text extraction failed");
                return Err(PlannerError::decode(ContentKind::Pdf, e));
            }
            Err(_) => {
                error!("PDF text extraction panicked");
                return Err(PlannerError::decode(ContentKind::Pdf, "malformed PDF"));
            }
        };

        Ok(split_pages(&text))
    }
}

/// Pages come back separated by form feeds when the extractor marks them.
fn split_pages(text: &str) -> Vec<String> {
    text.split('\x0c')
        .map(|page| page.trim_end().to_string())
        .collect()
}

/// Runs the `tesseract` binary, streaming a PNG through stdin/stdout.
pub struct TesseractCli {
    binary: String,
    language: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// Returns the engine only when the binary answers `--version`.
    pub fn detect(binary: &str, language: &str) -> Option<Self> {
        let status = Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => {
                info!(binary, language, "Tesseract OCR available");
                Some(Self::new(binary, language))
            }
            _ => None,
        }
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &RgbImage) -> AppResult<String> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| PlannerError::Internal(format!("Failed to encode image for OCR: {}", e)))?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PlannerError::ConverterUnavailable(format!("{} could not be started: {}", self.binary, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| PlannerError::Internal(format!("Failed to send image to OCR: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| PlannerError::Internal(format!("OCR process failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlannerError::decode(ContentKind::Image, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
