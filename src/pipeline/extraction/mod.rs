pub mod types;
pub mod pdf;
pub mod pdf_renderer;
pub mod ocr;
pub mod docx;
pub mod legacy_doc;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use types::*;
pub use pdf::*;
pub use pdf_renderer::*;
pub use ocr::*;
pub use docx::*;
pub use legacy_doc::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF page rendering failed: {0}")]
    PdfRendering(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("DOCX archive error: {0}")]
    DocxArchive(String),

    #[error("DOCX XML error: {0}")]
    DocxXml(String),

    #[error("Legacy DOC read failed: {0}")]
    LegacyDoc(String),

    #[error("External tool '{tool}' failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(PathBuf),

    #[error("Parser panicked on malformed input")]
    ParserPanic,
}
