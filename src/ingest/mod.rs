//! Document ingestion: format detection, content extraction and the
//! optional PDF/OCR converters behind them.

pub mod converters;
pub mod detect;
pub mod extract;
pub mod table;

pub use converters::{Converters, OcrEngine, PdfExtractText, PdfTextExtractor, TesseractCli};
pub use detect::{detect, mime_hint_for_path};
pub use extract::{ContentExtractor, ExtractContext, ExtractFn};
pub use table::Table;
