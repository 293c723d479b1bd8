use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::DocumentFormat;

/// A CV file found during discovery. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    /// `None` when the extension is not one we can read.
    pub format: Option<DocumentFormat>,
    /// 1-based, assigned in discovery order.
    pub serial_no: u32,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, serial_no: u32) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension);
        Self {
            path,
            format,
            serial_no,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Lowercased extension with its leading dot (".txt", "" when absent).
    pub fn extension_label(&self) -> String {
        extension_label(&self.path)
    }

    pub fn is_pdf(&self) -> bool {
        self.format == Some(DocumentFormat::Pdf)
    }
}

pub fn extension_label(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
