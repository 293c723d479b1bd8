//! Word 97-2003 (.doc) text.
//!
//! Primary path: a headless office suite (LibreOffice `soffice`) converts the
//! file to UTF-8 text. The process is owned by [`OfficeProcess`], which kills
//! and reaps it on every exit path. When no office suite is installed the
//! [`CfbDocReader`] reads the piece table of the OLE compound file directly.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use super::pdf_renderer::spawn_error;
use super::types::LegacyDocReader;
use super::ExtractionError;

/// CFB / OLE2 signature shared by all legacy Office formats.
const CFB_MAGIC_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(120);

// ═══════════════════════════════════════════════════════════
// Office application
// ═══════════════════════════════════════════════════════════

/// Converts through `soffice --headless --convert-to txt`.
pub struct SofficeDocReader {
    binary: PathBuf,
    timeout: Duration,
}

impl SofficeDocReader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl LegacyDocReader for SofficeDocReader {
    fn read_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let workdir = tempfile::tempdir()?;
        // Private profile so we never attach to (or leave behind) a user instance
        let profile_url = format!("file://{}", workdir.path().join("profile").display());
        // Diagnostics go to a file; an undrained pipe would stall a chatty process
        let log_path = workdir.path().join("soffice.log");
        let log = std::fs::File::create(&log_path)?;

        let child = Command::new(&self.binary)
            .arg(format!("-env:UserInstallation={profile_url}"))
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg("txt:Text (encoded):UTF8")
            .arg("--outdir")
            .arg(workdir.path())
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        let mut process = OfficeProcess::new(child, &self.binary, log_path);
        process.wait(self.timeout)?;
        drop(process);

        let stem = path
            .file_stem()
            .ok_or_else(|| ExtractionError::LegacyDoc("path has no file name".into()))?;
        let converted = workdir.path().join(format!("{}.txt", stem.to_string_lossy()));
        let bytes = std::fs::read(&converted).map_err(|e| {
            ExtractionError::LegacyDoc(format!("no converted output for {}: {e}", path.display()))
        })?;

        Ok(String::from_utf8_lossy(&bytes)
            .trim_start_matches('\u{feff}')
            .to_string())
    }
}

/// Scoped handle on the office process. Dropping it terminates the process
/// if it is still running and always reaps it.
struct OfficeProcess {
    child: Child,
    tool: String,
    log_path: PathBuf,
    finished: bool,
}

impl OfficeProcess {
    fn new(child: Child, binary: &Path, log_path: PathBuf) -> Self {
        Self {
            child,
            tool: binary.display().to_string(),
            log_path,
            finished: false,
        }
    }

    fn wait(&mut self, timeout: Duration) -> Result<(), ExtractionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.finished = true;
                if status.success() {
                    return Ok(());
                }
                let stderr = std::fs::read_to_string(&self.log_path).unwrap_or_default();
                return Err(ExtractionError::ExternalTool {
                    tool: self.tool.clone(),
                    message: format!("exited with {status}: {}", stderr.trim()),
                });
            }
            if Instant::now() >= deadline {
                return Err(ExtractionError::ExternalTool {
                    tool: self.tool.clone(),
                    message: format!("timed out after {}s", timeout.as_secs()),
                });
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

impl Drop for OfficeProcess {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.child.kill() {
                tracing::warn!(tool = %self.tool, error = %e, "Failed to kill office process");
            }
        }
        // Reap so no zombie outlives the conversion
        let _ = self.child.wait();
    }
}

// ═══════════════════════════════════════════════════════════
// Compound file reader
// ═══════════════════════════════════════════════════════════

/// Pure-Rust reader for the main text story of a Word 97+ document.
pub struct CfbDocReader;

// FIB offsets (Word 97 and later)
pub(super) const FIB_IDENT: usize = 0x0000;
const FIB_FLAGS: usize = 0x000A;
pub(super) const FIB_CCP_TEXT: usize = 0x004C;
pub(super) const FIB_FC_CLX: usize = 0x01A2;
pub(super) const FIB_LCB_CLX: usize = 0x01A6;
pub(super) const WORD_IDENT: u16 = 0xA5EC;
const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;

impl LegacyDocReader for CfbDocReader {
    fn read_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let mut file = std::fs::File::open(path)?;
        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)
            .map_err(|_| ExtractionError::LegacyDoc("file too small to be a .doc".into()))?;
        if magic != CFB_MAGIC_SIGNATURE {
            return Err(ExtractionError::LegacyDoc(format!(
                "invalid .doc signature {magic:02X?}"
            )));
        }

        let file = std::fs::File::open(path)?;
        let mut compound = cfb::CompoundFile::open(file)
            .map_err(|e| ExtractionError::LegacyDoc(format!("not an OLE compound file: {e}")))?;

        let word = read_stream(&mut compound, "/WordDocument")?;
        let fib = Fib::parse(&word)?;
        let table_name = if fib.table_one { "/1Table" } else { "/0Table" };
        let table = read_stream(&mut compound, table_name)?;

        let raw = piece_table_text(&word, &table, &fib)?;
        Ok(clean_word_text(&raw))
    }
}

fn read_stream<F: Read + std::io::Seek>(
    compound: &mut cfb::CompoundFile<F>,
    name: &str,
) -> Result<Vec<u8>, ExtractionError> {
    let mut stream = compound
        .open_stream(name)
        .map_err(|e| ExtractionError::LegacyDoc(format!("missing stream {name}: {e}")))?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes)
}

struct Fib {
    table_one: bool,
    ccp_text: usize,
    fc_clx: usize,
    lcb_clx: usize,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self, ExtractionError> {
        if u16_at(word, FIB_IDENT)? != WORD_IDENT {
            return Err(ExtractionError::LegacyDoc("not a Word 97+ document".into()));
        }
        let flags = u16_at(word, FIB_FLAGS)?;
        if flags & FLAG_ENCRYPTED != 0 {
            return Err(ExtractionError::LegacyDoc("document is encrypted".into()));
        }
        Ok(Self {
            table_one: flags & FLAG_WHICH_TABLE != 0,
            ccp_text: u32_at(word, FIB_CCP_TEXT)? as usize,
            fc_clx: u32_at(word, FIB_FC_CLX)? as usize,
            lcb_clx: u32_at(word, FIB_LCB_CLX)? as usize,
        })
    }
}

/// Walk the Clx piece descriptors and decode the first `ccp_text` characters.
fn piece_table_text(word: &[u8], table: &[u8], fib: &Fib) -> Result<String, ExtractionError> {
    let clx = table
        .get(fib.fc_clx..fib.fc_clx + fib.lcb_clx)
        .ok_or_else(|| ExtractionError::LegacyDoc("Clx outside table stream".into()))?;

    // Skip Prc entries (0x01) until the Pcdt (0x02)
    let mut pos = 0;
    while clx.get(pos) == Some(&0x01) {
        pos += 3 + u16_at(clx, pos + 1)? as usize;
    }
    if clx.get(pos) != Some(&0x02) {
        return Err(ExtractionError::LegacyDoc("piece table not found".into()));
    }
    let lcb = u32_at(clx, pos + 1)? as usize;
    let plc = clx
        .get(pos + 5..pos + 5 + lcb)
        .ok_or_else(|| ExtractionError::LegacyDoc("truncated piece table".into()))?;
    if lcb < 4 || (lcb - 4) % 12 != 0 {
        return Err(ExtractionError::LegacyDoc("malformed piece table".into()));
    }
    let pieces = (lcb - 4) / 12;
    let pcd_base = 4 * (pieces + 1);

    let mut text = String::new();
    let mut remaining = fib.ccp_text;
    for i in 0..pieces {
        if remaining == 0 {
            break;
        }
        let cp_start = u32_at(plc, 4 * i)? as usize;
        let cp_end = u32_at(plc, 4 * (i + 1))? as usize;
        let count = cp_end.saturating_sub(cp_start).min(remaining);
        remaining -= count;

        let fc_raw = u32_at(plc, pcd_base + 8 * i + 2)?;
        let compressed = fc_raw & 0x4000_0000 != 0;
        let fc = (fc_raw & 0x3FFF_FFFF) as usize;

        if compressed {
            let start = fc / 2;
            let bytes = word
                .get(start..start + count)
                .ok_or_else(|| ExtractionError::LegacyDoc("piece outside WordDocument".into()))?;
            text.extend(bytes.iter().map(|&b| cp1252_char(b)));
        } else {
            let bytes = word
                .get(fc..fc + 2 * count)
                .ok_or_else(|| ExtractionError::LegacyDoc("piece outside WordDocument".into()))?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            text.push_str(&String::from_utf16_lossy(&units));
        }
    }
    Ok(text)
}

/// Map Word control characters to plain text and drop field instructions.
fn clean_word_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    // One entry per open field: true while still inside its instruction part
    let mut fields: Vec<bool> = Vec::new();

    for c in raw.chars() {
        match c {
            '\u{13}' => fields.push(true),
            '\u{14}' => {
                if let Some(top) = fields.last_mut() {
                    *top = false;
                }
            }
            '\u{15}' => {
                fields.pop();
            }
            _ if fields.iter().any(|&instr| instr) => {}
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            '\u{07}' => out.push('\t'),
            '\t' | '\n' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Windows-1252 for the 0x80..0x9F block, Latin-1 elsewhere.
fn cp1252_char(b: u8) -> char {
    const HIGH: [char; 32] = [
        '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8D}', 'Ž',
        '\u{8F}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9D}',
        'ž', 'Ÿ',
    ];
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

fn u16_at(bytes: &[u8], offset: usize) -> Result<u16, ExtractionError> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| ExtractionError::LegacyDoc(format!("truncated at offset {offset:#x}")))
}

fn u32_at(bytes: &[u8], offset: usize) -> Result<u32, ExtractionError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| ExtractionError::LegacyDoc(format!("truncated at offset {offset:#x}")))
}

// ═══════════════════════════════════════════════════════════
// Fallback
// ═══════════════════════════════════════════════════════════

/// Office application first, compound file reader when it is unavailable or fails.
pub struct FallbackDocReader {
    primary: Box<dyn LegacyDocReader + Send + Sync>,
    fallback: Box<dyn LegacyDocReader + Send + Sync>,
}

impl FallbackDocReader {
    pub fn new(
        primary: Box<dyn LegacyDocReader + Send + Sync>,
        fallback: Box<dyn LegacyDocReader + Send + Sync>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn standard(soffice: impl Into<PathBuf>) -> Self {
        Self::new(
            Box::new(SofficeDocReader::new(soffice)),
            Box::new(CfbDocReader),
        )
    }
}

impl LegacyDocReader for FallbackDocReader {
    fn read_text(&self, path: &Path) -> Result<String, ExtractionError> {
        match self.primary.read_text(path) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::info!(
                    path = %path.display(),
                    error = %e,
                    "Office conversion unavailable, reading compound file directly"
                );
                self.fallback.read_text(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::fixtures::make_doc;

    fn write_temp(bytes: &[u8], name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_compressed_piece() {
        let (_dir, path) = write_temp(&make_doc("Jane Smith\rLahore\r", false), "cv.doc");
        let text = CfbDocReader.read_text(&path).unwrap();
        assert_eq!(text, "Jane Smith\nLahore\n");
    }

    #[test]
    fn reads_unicode_piece() {
        let (_dir, path) = write_temp(&make_doc("Zoë Ünal\r", true), "cv.doc");
        let text = CfbDocReader.read_text(&path).unwrap();
        assert_eq!(text, "Zoë Ünal\n");
    }

    #[test]
    fn rejects_non_cfb_file() {
        let (_dir, path) = write_temp(b"INVALID_ and more bytes", "cv.doc");
        let err = CfbDocReader.read_text(&path).unwrap_err();
        assert!(err.to_string().contains("invalid .doc signature"));
    }

    #[test]
    fn rejects_tiny_file() {
        let (_dir, path) = write_temp(&CFB_MAGIC_SIGNATURE[..3], "cv.doc");
        assert!(CfbDocReader.read_text(&path).is_err());
    }

    #[test]
    fn field_instructions_are_dropped() {
        let raw = "Site: \u{13} HYPERLINK \"http://x\" \u{14}example.com\u{15}\r";
        assert_eq!(clean_word_text(raw), "Site: example.com\n");
    }

    #[test]
    fn cell_marks_become_tabs() {
        assert_eq!(clean_word_text("BSc\u{07}2019\u{07}\r"), "BSc\t2019\t\n");
    }

    #[test]
    fn cp1252_high_block() {
        assert_eq!(cp1252_char(0x93), '“');
        assert_eq!(cp1252_char(0x80), '€');
        assert_eq!(cp1252_char(b'A'), 'A');
        assert_eq!(cp1252_char(0xE9), 'é');
    }

    #[test]
    fn missing_soffice_is_tool_not_found() {
        let (_dir, path) = write_temp(&make_doc("x\r", false), "cv.doc");
        let reader = SofficeDocReader::new("/nonexistent/bin/soffice");
        assert!(matches!(
            reader.read_text(&path),
            Err(ExtractionError::ToolNotFound(_))
        ));
    }

    #[test]
    fn fallback_reader_uses_compound_file_when_office_missing() {
        let (_dir, path) = write_temp(&make_doc("Ali Khan\r", false), "cv.doc");
        let reader = FallbackDocReader::standard("/nonexistent/bin/soffice");
        assert_eq!(reader.read_text(&path).unwrap(), "Ali Khan\n");
    }

    #[cfg(unix)]
    #[test]
    fn hung_office_process_is_killed_on_timeout() {
        // A stand-in "office" that never finishes
        let dir = tempfile::tempdir().unwrap();
        let script = fake_office(dir.path(), "sleep 30");
        let (_doc_dir, path) = write_temp(&make_doc("x\r", false), "cv.doc");

        let reader = SofficeDocReader::new(&script).with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let err = reader.read_text(&path).unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    fn fake_office(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("fake-soffice");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn verbose_office_process_does_not_stall() {
        // Far more stderr than a pipe buffer holds, then a normal conversion; $7 is --outdir
        let dir = tempfile::tempdir().unwrap();
        let script = fake_office(
            dir.path(),
            "head -c 300000 /dev/zero | tr '\\0' x >&2\nprintf 'Jane Smith\\n' > \"$7/cv.txt\"",
        );
        let (_doc_dir, path) = write_temp(&make_doc("x\r", false), "cv.doc");

        let reader = SofficeDocReader::new(&script).with_timeout(Duration::from_secs(20));
        assert_eq!(reader.read_text(&path).unwrap(), "Jane Smith\n");
    }

    #[cfg(unix)]
    #[test]
    fn failed_conversion_reports_office_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_office(dir.path(), "echo 'source file could not be loaded' >&2\nexit 1");
        let (_doc_dir, path) = write_temp(&make_doc("x\r", false), "cv.doc");

        let err = SofficeDocReader::new(&script).read_text(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::ExternalTool { .. }));
        assert!(err.to_string().contains("could not be loaded"));
    }
}
