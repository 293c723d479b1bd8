use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::Document;

/// How text was obtained from a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractionMethod {
    PdfDirect,
    PdfOcr,
    DocxXml,
    LegacyDoc,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfDirect => "pdf_direct",
            Self::PdfOcr => "pdf_ocr",
            Self::DocxXml => "docx_xml",
            Self::LegacyDoc => "legacy_doc",
        }
    }
}

/// Best-effort text of one document.
///
/// Extraction never returns an error to its caller. Failures are carried as
/// tagged variants and rendered into the prompt as inline text, so every
/// document travels through the same downstream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedText {
    Content {
        text: String,
        method: ExtractionMethod,
    },
    Failed {
        path: PathBuf,
        cause: String,
    },
    Unsupported {
        extension: String,
    },
}

impl ExtractedText {
    pub fn failed(path: &Path, cause: impl std::fmt::Display) -> Self {
        Self::Failed {
            path: path.to_path_buf(),
            cause: cause.to_string(),
        }
    }

    /// Text handed to the model. Failures render as
    /// `Error processing <path>: <cause>` / `Unsupported file format: <ext>`.
    pub fn as_prompt_text(&self) -> Cow<'_, str> {
        match self {
            Self::Content { text, .. } => Cow::Borrowed(text.as_str()),
            Self::Failed { path, cause } => {
                Cow::Owned(format!("Error processing {}: {cause}", path.display()))
            }
            Self::Unsupported { extension } => {
                Cow::Owned(format!("Unsupported file format: {extension}"))
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }

    pub fn method(&self) -> Option<ExtractionMethod> {
        match self {
            Self::Content { method, .. } => Some(*method),
            _ => None,
        }
    }

    /// Extracted text, `None` for failures.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Content { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Per-page direct extraction result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    /// Recognize the text of one rendered page image.
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF text layer extraction abstraction
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

/// Renders a single PDF page (0-based index) to PNG bytes for OCR.
pub trait PdfPageRenderer {
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Reader for Word 97-2003 binary documents.
///
/// Implementations own the whole open → read → close cycle of whatever they
/// use underneath and must release it before returning, on success or error.
pub trait LegacyDocReader {
    fn read_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Main extraction entry point
pub trait TextExtractor {
    fn extract(&self, document: &Document) -> ExtractedText;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_renders_inline_error_string() {
        let text = ExtractedText::failed(Path::new("/cv/a.pdf"), "bad xref");
        assert_eq!(text.as_prompt_text(), "Error processing /cv/a.pdf: bad xref");
        assert!(text.is_failure());
        assert!(text.content().is_none());
    }

    #[test]
    fn unsupported_renders_extension() {
        let text = ExtractedText::Unsupported {
            extension: ".txt".into(),
        };
        assert_eq!(text.as_prompt_text(), "Unsupported file format: .txt");
        assert!(text.is_failure());
    }

    #[test]
    fn content_passes_through() {
        let text = ExtractedText::Content {
            text: "Jane Smith\nLahore\n".into(),
            method: ExtractionMethod::PdfDirect,
        };
        assert_eq!(text.as_prompt_text(), "Jane Smith\nLahore\n");
        assert_eq!(text.method(), Some(ExtractionMethod::PdfDirect));
        assert!(!text.is_failure());
    }

    #[test]
    fn traits_are_object_safe() {
        fn _ocr(_: &dyn OcrEngine) {}
        fn _pdf(_: &dyn PdfExtractor) {}
        fn _render(_: &dyn PdfPageRenderer) {}
        fn _doc(_: &dyn LegacyDocReader) {}
        fn _text(_: &dyn TextExtractor) {}
    }
}
