use std::path::{Path, PathBuf};

const PDF_EXTENSION: &str = ".pdf";

/// Capitalize the first cased character of every word and lowercase the rest.
///
/// A word starts after any character that is not itself cased, so digits and
/// punctuation split words: `"o'brien 3rd"` becomes `"O'Brien 3Rd"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased {
            if previous_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        previous_cased = cased;
    }
    out
}

/// Keep ASCII letters, digits, space and `-_.()`; drop everything else.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ' '))
        .collect()
}

/// First of `base.ext`, `base (1).ext`, `base (2).ext`, … not present in `folder`.
/// `ext` includes its leading dot.
pub fn unique_filename(folder: &Path, base: &str, ext: &str) -> String {
    let base = sanitize_filename(base);
    let mut candidate = format!("{base}{ext}");
    let mut counter = 1;
    while folder.join(&candidate).exists() {
        candidate = format!("{base} ({counter}){ext}");
        counter += 1;
    }
    candidate
}

/// Rename a PDF in place after the candidate's name.
///
/// Returns `Ok(None)` when nothing was renamed: the name sanitizes to
/// nothing, or the file already carries the desired name.
pub fn rename_after_candidate(path: &Path, candidate_name: &str) -> std::io::Result<Option<PathBuf>> {
    let proper = title_case(candidate_name.trim());
    let base = sanitize_filename(&proper).trim().to_string();
    if base.is_empty() {
        tracing::debug!(path = %path.display(), "Candidate name has no usable characters, not renaming");
        return Ok(None);
    }

    let desired = format!("{base}{PDF_EXTENSION}");
    if path.file_name().and_then(|n| n.to_str()) == Some(desired.as_str()) {
        return Ok(None);
    }

    let folder = path.parent().unwrap_or_else(|| Path::new("."));
    let target = folder.join(unique_filename(folder, &base, PDF_EXTENSION));
    std::fs::rename(path, &target)?;

    tracing::info!(from = %path.display(), to = %target.display(), "Renamed document");
    Ok(Some(target))
}
