use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::pdf_renderer::spawn_error;
use super::types::OcrEngine;
use super::ExtractionError;

/// Tesseract driven through its command-line binary.
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            lang: "eng".to_string(),
        }
    }

    /// Set language(s) for OCR (e.g., "eng", "eng+fra")
    pub fn with_languages(mut self, langs: &str) -> Self {
        self.lang = langs.to_string();
        self
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.binary).arg("--version").output().is_ok()
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let image = tempfile::Builder::new().suffix(".png").tempfile()?;
        std::fs::write(image.path(), image_bytes)?;

        let output = Command::new(&self.binary)
            .arg(image.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .map_err(|e| spawn_error(&self.binary, e))?;

        if !output.status.success() {
            return Err(ExtractionError::OcrProcessing(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Bundled Tesseract engine (libtesseract bindings).
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<PathBuf>,
    lang: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// `tessdata_dir = None` lets libtesseract use its compiled-in search path.
    pub fn new(tessdata_dir: Option<&std::path::Path>, lang: &str) -> Result<Self, ExtractionError> {
        if let Some(dir) = tessdata_dir {
            let traineddata = dir.join(format!("{}.traineddata", lang.split('+').next().unwrap_or("eng")));
            if !traineddata.exists() {
                return Err(ExtractionError::OcrInit(format!(
                    "{} not found",
                    traineddata.display()
                )));
            }
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.map(|p| p.to_path_buf()),
            lang: lang.to_string(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(datapath, Some(&self.lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        tess.get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    mode: MockOcrMode,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<u8>>>,
}

enum MockOcrMode {
    Fixed(String),
    Echo,
    Fail(String),
}

impl MockOcrEngine {
    /// Returns the same text for every image.
    pub fn new(text: &str) -> Self {
        Self::with_mode(MockOcrMode::Fixed(text.to_string()))
    }

    /// Returns the image bytes read back as UTF-8.
    pub fn echo() -> Self {
        Self::with_mode(MockOcrMode::Echo)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_mode(MockOcrMode::Fail(message.to_string()))
    }

    fn with_mode(mode: MockOcrMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Images received so far, in call order.
    pub fn seen_images(&self) -> Vec<Vec<u8>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(image_bytes.to_vec());
        }
        match &self.mode {
            MockOcrMode::Fixed(text) => Ok(text.clone()),
            MockOcrMode::Echo => Ok(String::from_utf8_lossy(image_bytes).into_owned()),
            MockOcrMode::Fail(message) => Err(ExtractionError::OcrProcessing(message.clone())),
        }
    }
}
