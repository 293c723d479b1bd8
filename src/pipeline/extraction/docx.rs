//! DOCX paragraph text.
//!
//! DOCX files are ZIP archives; the body lives in `word/document.xml`.
//! Every `<w:p>` becomes one line (tables and text boxes included), blank
//! paragraphs are skipped.

use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read the non-blank paragraphs of a DOCX file, one per line.
pub fn docx_to_text(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path)?;
    docx_reader_to_text(BufReader::new(file))
}

pub fn docx_reader_to_text<R: Read + Seek>(reader: R) -> Result<String, ExtractionError> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| ExtractionError::DocxArchive(e.to_string()))?;
    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::DocxArchive(format!("{DOCUMENT_PART}: {e}")))?;

    let paragraphs = read_paragraphs(BufReader::new(part))?;

    let mut text = String::new();
    for paragraph in paragraphs {
        let trimmed = paragraph.trim();
        if !trimmed.is_empty() {
            text.push_str(trimmed);
            text.push('\n');
        }
    }
    Ok(text)
}

/// Walk WordprocessingML and collect the text of each paragraph in document order.
fn read_paragraphs<R: std::io::BufRead>(source: R) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut out = Vec::new();
    // Text boxes nest paragraphs inside paragraphs
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if let Some(current) = open.last_mut() {
                    match e.local_name().as_ref() {
                        b"tab" if !in_tab_stops => current.push('\t'),
                        b"br" | b"cr" => current.push('\n'),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::DocxXml(e.to_string()))?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(done) = open.pop() {
                        out.push(done);
                    }
                }
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::DocxXml(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
