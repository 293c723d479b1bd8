use std::path::Path;

use super::docx::docx_to_text;
use super::legacy_doc::FallbackDocReader;
use super::ocr::TesseractCli;
use super::pdf::PdfTextExtractor;
use super::pdf_renderer::RendererChain;
use super::types::{
    ExtractedText, ExtractionMethod, LegacyDocReader, OcrEngine, PdfExtractor, PdfPageRenderer,
    TextExtractor,
};
use super::ExtractionError;
use crate::config::ExtractorConfig;
use crate::models::{Document, DocumentFormat};

pub const DEFAULT_OCR_DPI: u32 = 300;

/// Concrete implementation of the text extractor.
/// Uses trait objects for every format backend, enabling dependency injection.
pub struct DocumentExtractor {
    pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    doc_reader: Box<dyn LegacyDocReader + Send + Sync>,
    ocr_dpi: u32,
}

impl DocumentExtractor {
    pub fn new(
        pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
        pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>,
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
        doc_reader: Box<dyn LegacyDocReader + Send + Sync>,
    ) -> Self {
        Self {
            pdf_extractor,
            pdf_renderer,
            ocr_engine,
            doc_reader,
            ocr_dpi: DEFAULT_OCR_DPI,
        }
    }

    pub fn with_ocr_dpi(mut self, dpi: u32) -> Self {
        self.ocr_dpi = dpi;
        self
    }

    /// Production wiring: pdf-extract, pdftoppm/embedded-scan rendering,
    /// Tesseract, and soffice with the compound-file reader behind it.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(
            Box::new(PdfTextExtractor),
            Box::new(RendererChain::standard(&config.pdftoppm_path)),
            build_ocr_engine(config),
            Box::new(FallbackDocReader::standard(&config.soffice_path)),
        )
        .with_ocr_dpi(config.ocr_dpi)
    }

    /// PDF: direct text of non-blank pages; OCR of every page when none has text.
    fn extract_pdf(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let pages = self.pdf_extractor.extract_text(&bytes)?;

        let mut text = String::new();
        for page in &pages {
            let page_text = page.text.trim();
            if !page_text.is_empty() {
                text.push_str(page_text);
                text.push('\n');
            }
        }

        if !text.trim().is_empty() {
            return Ok(ExtractedText::Content {
                text,
                method: ExtractionMethod::PdfDirect,
            });
        }

        tracing::info!(
            path = %path.display(),
            pages = pages.len(),
            "No direct text found, using OCR fallback"
        );

        let mut text = String::new();
        for index in 0..pages.len() {
            let image = self.pdf_renderer.render_page(&bytes, index, self.ocr_dpi)?;
            let recognized = self.ocr_engine.ocr_image(&image)?;
            tracing::debug!(page = index + 1, chars = recognized.len(), "OCR page complete");
            text.push_str(&recognized);
            text.push('\n');
        }

        Ok(ExtractedText::Content {
            text,
            method: ExtractionMethod::PdfOcr,
        })
    }
}

#[cfg(feature = "ocr")]
fn build_ocr_engine(config: &ExtractorConfig) -> Box<dyn OcrEngine + Send + Sync> {
    use super::ocr::BundledTesseract;
    match BundledTesseract::new(None, &config.ocr_lang) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            tracing::warn!(error = %e, "Bundled Tesseract unavailable, using CLI");
            Box::new(tesseract_cli(config))
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn build_ocr_engine(config: &ExtractorConfig) -> Box<dyn OcrEngine + Send + Sync> {
    Box::new(tesseract_cli(config))
}

fn tesseract_cli(config: &ExtractorConfig) -> TesseractCli {
    let engine = TesseractCli::new(&config.tesseract_path).with_languages(&config.ocr_lang);
    if !engine.is_available() {
        tracing::warn!(
            binary = %config.tesseract_path.display(),
            "Tesseract not found, scanned PDFs will be recorded as extraction failures"
        );
    }
    engine
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, document: &Document) -> ExtractedText {
        let path = document.path.as_path();
        tracing::info!(
            serial = document.serial_no,
            path = %path.display(),
            format = document.format.map(|f| f.as_str()).unwrap_or("unknown"),
            "Starting text extraction"
        );

        let result = match document.format {
            Some(DocumentFormat::Pdf) => self.extract_pdf(path),
            Some(DocumentFormat::Docx) => docx_to_text(path).map(|text| ExtractedText::Content {
                text,
                method: ExtractionMethod::DocxXml,
            }),
            Some(DocumentFormat::Doc) => {
                self.doc_reader
                    .read_text(path)
                    .map(|text| ExtractedText::Content {
                        text,
                        method: ExtractionMethod::LegacyDoc,
                    })
            }
            None => Ok(ExtractedText::Unsupported {
                extension: document.extension_label(),
            }),
        };

        match result {
            Ok(extracted) => {
                tracing::info!(
                    serial = document.serial_no,
                    method = extracted.method().map(|m| m.as_str()).unwrap_or("none"),
                    text_length = extracted.content().map(str::len).unwrap_or(0),
                    "Text extraction complete"
                );
                extracted
            }
            Err(e) => {
                tracing::warn!(
                    serial = document.serial_no,
                    path = %path.display(),
                    error = %e,
                    "Text extraction failed"
                );
                ExtractedText::failed(path, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::fixtures::{make_doc, make_docx, make_pdf, paragraphs};
    use crate::pipeline::extraction::legacy_doc::CfbDocReader;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::types::PageExtraction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns fixed page texts regardless of input.
    struct StubPdfExtractor(Vec<&'static str>);

    impl PdfExtractor for StubPdfExtractor {
        fn extract_text(&self, _: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, t)| PageExtraction {
                    page_number: i + 1,
                    text: t.to_string(),
                })
                .collect())
        }
    }

    /// Renders page i as the bytes "page-{i+1}" and counts calls.
    struct LabelRenderer(Arc<AtomicUsize>);

    impl PdfPageRenderer for LabelRenderer {
        fn render_page(&self, _: &[u8], index: usize, _: u32) -> Result<Vec<u8>, ExtractionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("page-{}", index + 1).into_bytes())
        }
    }

    struct FailingRenderer;

    impl PdfPageRenderer for FailingRenderer {
        fn render_page(&self, _: &[u8], _: usize, _: u32) -> Result<Vec<u8>, ExtractionError> {
            Err(ExtractionError::PdfRendering("no renderer".into()))
        }
    }

    struct FailingDocReader;

    impl LegacyDocReader for FailingDocReader {
        fn read_text(&self, _: &Path) -> Result<String, ExtractionError> {
            Err(ExtractionError::LegacyDoc("Word not available".into()))
        }
    }

    fn extractor_with(
        pdf: Box<dyn PdfExtractor + Send + Sync>,
        renderer: Box<dyn PdfPageRenderer + Send + Sync>,
        ocr: Box<dyn OcrEngine + Send + Sync>,
    ) -> DocumentExtractor {
        DocumentExtractor::new(pdf, renderer, ocr, Box::new(CfbDocReader))
    }

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Document {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        Document::new(path, 1)
    }

    #[test]
    fn digital_pdf_uses_direct_text() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "a.pdf", b"%PDF-stub");
        let ocr = MockOcrEngine::new("should not be used");
        let extractor = extractor_with(
            Box::new(StubPdfExtractor(vec!["  Jane Smith  ", "   ", "Lahore"])),
            Box::new(FailingRenderer),
            Box::new(ocr),
        );

        let result = extractor.extract(&doc);
        assert_eq!(result.content(), Some("Jane Smith\nLahore\n"));
        assert_eq!(result.method(), Some(ExtractionMethod::PdfDirect));
    }

    #[test]
    fn blank_pdf_falls_back_to_ocr_once_per_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "scan.pdf", b"%PDF-stub");
        let renders = Arc::new(AtomicUsize::new(0));
        let extractor = extractor_with(
            Box::new(StubPdfExtractor(vec!["", " \n ", ""])),
            Box::new(LabelRenderer(renders.clone())),
            Box::new(MockOcrEngine::echo()),
        );

        let result = extractor.extract(&doc);
        assert_eq!(result.content(), Some("page-1\npage-2\npage-3\n"));
        assert_eq!(result.method(), Some(ExtractionMethod::PdfOcr));
        assert_eq!(renders.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn ocr_failure_becomes_inline_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "scan.pdf", b"%PDF-stub");
        let extractor = extractor_with(
            Box::new(StubPdfExtractor(vec![""])),
            Box::new(LabelRenderer(Arc::new(AtomicUsize::new(0)))),
            Box::new(MockOcrEngine::failing("engine crashed")),
        );

        let result = extractor.extract(&doc);
        assert!(result.is_failure());
        let text = result.as_prompt_text();
        assert!(text.starts_with("Error processing "));
        assert!(text.contains("scan.pdf"));
        assert!(text.ends_with("engine crashed"));
    }

    #[test]
    fn real_pdf_through_pdf_extract() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "cv.pdf", &make_pdf(&[Some("Curriculum Vitae")]));
        let extractor = extractor_with(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
        );
        let result = extractor.extract(&doc);
        assert_eq!(result.method(), Some(ExtractionMethod::PdfDirect));
        assert!(result.content().unwrap().contains("Curriculum"));
    }

    #[test]
    fn corrupt_pdf_never_raises() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "broken.pdf", b"not a pdf at all");
        let extractor = extractor_with(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
        );
        let result = extractor.extract(&doc);
        assert!(result.is_failure());
        assert!(result.as_prompt_text().starts_with("Error processing "));
    }

    #[test]
    fn docx_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let body = paragraphs(&["Ali Khan", "", "Karachi"]);
        let doc = write_file(dir.path(), "cv.DOCX", &make_docx(&body));
        let extractor = DocumentExtractor::new(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
            Box::new(FailingDocReader),
        );
        let result = extractor.extract(&doc);
        assert_eq!(result.content(), Some("Ali Khan\nKarachi\n"));
        assert_eq!(result.method(), Some(ExtractionMethod::DocxXml));
    }

    #[test]
    fn corrupt_docx_becomes_inline_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "bad.docx", b"garbage");
        let extractor = extractor_with(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
        );
        assert!(extractor.extract(&doc).is_failure());
    }

    #[test]
    fn legacy_doc_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "old.doc", &make_doc("Sara Ahmed\r", false));
        let extractor = extractor_with(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
        );
        let result = extractor.extract(&doc);
        assert_eq!(result.content(), Some("Sara Ahmed\n"));
        assert_eq!(result.method(), Some(ExtractionMethod::LegacyDoc));
    }

    #[test]
    fn legacy_doc_failure_becomes_inline_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write_file(dir.path(), "old.doc", b"whatever");
        let extractor = DocumentExtractor::new(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
            Box::new(FailingDocReader),
        );
        let result = extractor.extract(&doc);
        assert!(result
            .as_prompt_text()
            .ends_with("Legacy DOC read failed: Word not available"));
    }

    #[test]
    fn unsupported_extension_is_reported_inline() {
        let extractor = extractor_with(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
        );
        let result = extractor.extract(&Document::new("/cv/notes.txt", 1));
        assert_eq!(result.as_prompt_text(), "Unsupported file format: .txt");
    }

    #[test]
    fn missing_file_never_raises() {
        let extractor = extractor_with(
            Box::new(PdfTextExtractor),
            Box::new(FailingRenderer),
            Box::new(MockOcrEngine::new("")),
        );
        for name in ["/nonexistent/a.pdf", "/nonexistent/b.docx", "/nonexistent/c.doc"] {
            assert!(extractor.extract(&Document::new(name, 1)).is_failure());
        }
    }

    #[test]
    fn from_config_uses_configured_dpi() {
        let mut config = ExtractorConfig::default();
        config.ocr_dpi = 200;
        let extractor = DocumentExtractor::from_config(&config);
        assert_eq!(extractor.ocr_dpi, 200);
    }
}
