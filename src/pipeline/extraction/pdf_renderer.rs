//! Page → image rendering for the OCR fallback.
//!
//! Two strategies: rasterize the page with poppler's `pdftoppm`, or pull the
//! scan image straight out of the page's XObjects with lopdf. Scanned CVs are
//! almost always a single full-page image, so the second one covers most
//! machines without poppler installed.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::ImageOutputFormat;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::types::PdfPageRenderer;
use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// pdftoppm
// ═══════════════════════════════════════════════════════════

/// Rasterizes one page at a time with `pdftoppm -png -singlefile`.
pub struct PdftoppmRenderer {
    binary: PathBuf,
}

impl PdftoppmRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl PdfPageRenderer for PdftoppmRenderer {
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.pdf");
        std::fs::write(&input, pdf_bytes)?;

        // pdftoppm pages are 1-based
        let page = (page_index + 1).to_string();
        let prefix = workdir.path().join("page");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|e| spawn_error(&self.binary, e))?;

        if !output.status.success() {
            return Err(ExtractionError::ExternalTool {
                tool: self.binary.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let png = std::fs::read(prefix.with_extension("png")).map_err(|e| {
            ExtractionError::PdfRendering(format!("pdftoppm produced no image for page {page}: {e}"))
        })?;

        tracing::debug!(page = page_index + 1, dpi, png_size = png.len(), "Rendered PDF page");
        Ok(png)
    }
}

pub(crate) fn spawn_error(binary: &Path, e: std::io::Error) -> ExtractionError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ExtractionError::ToolNotFound(binary.to_path_buf())
    } else {
        ExtractionError::ExternalTool {
            tool: binary.display().to_string(),
            message: e.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Embedded scan images
// ═══════════════════════════════════════════════════════════

/// Takes the largest image XObject of a page and re-encodes it as PNG.
/// `dpi` is ignored: the scan is returned at its native resolution.
pub struct EmbeddedScanRenderer;

impl PdfPageRenderer for EmbeddedScanRenderer {
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(format!("Failed to parse PDF: {e}")))?;

        let page_ids: Vec<ObjectId> = doc.page_iter().collect();
        let &page_id = page_ids.get(page_index).ok_or_else(|| {
            ExtractionError::PdfRendering(format!(
                "Page {} not found (PDF has {} pages)",
                page_index + 1,
                page_ids.len()
            ))
        })?;

        let image = largest_page_image(&doc, page_id)?;
        let decoded = decode_image_stream(&image)?;

        let mut png = Cursor::new(Vec::new());
        decoded
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encode failed: {e}")))?;

        tracing::debug!(
            page = page_index + 1,
            raw_size = image.content.len(),
            png_size = png.get_ref().len(),
            "Extracted scan image from PDF page"
        );
        Ok(png.into_inner())
    }
}

/// Page dict → /Resources → /XObject → biggest /Subtype /Image stream.
fn largest_page_image(doc: &Document, page_id: ObjectId) -> Result<lopdf::Stream, ExtractionError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| ExtractionError::PdfParsing(format!("Page object error: {e}")))?;
    let resources = resolve_dict(doc, page, b"Resources")?;
    let xobjects = resolve_dict(doc, resources, b"XObject")?;

    xobjects
        .iter()
        .filter_map(|(_, obj)| match resolve(doc, obj) {
            Object::Stream(s) if is_image(&s.dict) => Some(s),
            _ => None,
        })
        .max_by_key(|s| s.content.len())
        .cloned()
        .ok_or_else(|| ExtractionError::PdfRendering("No image XObjects found on this page".into()))
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
}

fn has_filter(dict: &Dictionary, name: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == name,
        Ok(Object::Array(items)) => items
            .iter()
            .any(|o| matches!(o, Object::Name(n) if n == name)),
        _ => false,
    }
}

fn decode_image_stream(stream: &lopdf::Stream) -> Result<image::DynamicImage, ExtractionError> {
    // DCTDecode content is a complete JPEG file
    if has_filter(&stream.dict, b"DCTDecode") {
        return image::load_from_memory(&stream.content)
            .map_err(|e| ExtractionError::ImageProcessing(format!("JPEG decode failed: {e}")));
    }

    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    if let Ok(img) = image::load_from_memory(&content) {
        return Ok(img);
    }

    raw_pixels_to_image(&stream.dict, content)
}

/// Rebuild an 8-bit gray or RGB image from raw samples using /Width, /Height
/// and /ColorSpace.
fn raw_pixels_to_image(
    dict: &Dictionary,
    pixels: Vec<u8>,
) -> Result<image::DynamicImage, ExtractionError> {
    let width = int_entry(dict, b"Width")? as u32;
    let height = int_entry(dict, b"Height")? as u32;
    let bits = int_entry(dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(ExtractionError::ImageProcessing(format!(
            "Unsupported bits per component: {bits}"
        )));
    }

    let gray = matches!(dict.get(b"ColorSpace"), Ok(Object::Name(n)) if n == b"DeviceGray");
    let img = if gray {
        image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8)
    } else {
        image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8)
    };

    img.ok_or_else(|| {
        ExtractionError::ImageProcessing(format!(
            "Raw pixel buffer does not match {width}x{height} image"
        ))
    })
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Result<&'a Dictionary, ExtractionError> {
    let name = String::from_utf8_lossy(key);
    let obj = dict
        .get(key)
        .map_err(|_| ExtractionError::PdfParsing(format!("Missing /{name} in dictionary")))?;
    resolve(doc, obj)
        .as_dict()
        .map_err(|_| ExtractionError::PdfParsing(format!("/{name} is not a dictionary")))
}

fn int_entry(dict: &Dictionary, key: &[u8]) -> Result<i64, ExtractionError> {
    dict.get(key)
        .and_then(Object::as_i64)
        .map_err(|_| {
            ExtractionError::ImageProcessing(format!(
                "Missing integer /{}",
                String::from_utf8_lossy(key)
            ))
        })
}

// ═══════════════════════════════════════════════════════════
// Chain
// ═══════════════════════════════════════════════════════════

/// Tries each renderer in turn and returns the first image produced.
pub struct RendererChain {
    renderers: Vec<Box<dyn PdfPageRenderer + Send + Sync>>,
}

impl RendererChain {
    pub fn new(renderers: Vec<Box<dyn PdfPageRenderer + Send + Sync>>) -> Self {
        Self { renderers }
    }

    /// `pdftoppm` first, embedded scan images second.
    pub fn standard(pdftoppm: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(PdftoppmRenderer::new(pdftoppm)),
            Box::new(EmbeddedScanRenderer),
        ])
    }
}

impl PdfPageRenderer for RendererChain {
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let mut last_error = None;
        for renderer in &self.renderers {
            match renderer.render_page(pdf_bytes, page_index, dpi) {
                Ok(png) => return Ok(png),
                Err(e) => {
                    tracing::debug!(page = page_index + 1, error = %e, "Renderer failed, trying next");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| ExtractionError::PdfRendering("No page renderer configured".into())))
    }
}
