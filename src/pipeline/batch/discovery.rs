use std::path::{Path, PathBuf};

use super::BatchError;
use crate::config::DiscoveryOrder;
use crate::models::{Document, DocumentFormat};

/// List the PDF/DOC/DOCX files of `dir` and number them 1..N.
///
/// With `DiscoveryOrder::Listing` the order is whatever the filesystem
/// returns, so serial numbers may differ between runs on the same folder.
pub fn discover_documents(dir: &Path, order: DiscoveryOrder) -> Result<Vec<Document>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path()));
    let mut paths = supported_files(entries);

    if order == DiscoveryOrder::ByName {
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    tracing::info!(
        dir = %dir.display(),
        count = paths.len(),
        order = ?order,
        "Discovered documents"
    );

    Ok(paths
        .into_iter()
        .zip(1u32..)
        .map(|(path, serial)| Document::new(path, serial))
        .collect())
}

/// Supported regular files, in iteration order. Entries that cannot be read
/// are logged and skipped.
fn supported_files(entries: impl IntoIterator<Item = std::io::Result<PathBuf>>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() && is_supported(&path) => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable directory entry"),
        }
    }
    paths
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension)
        .is_some()
}
