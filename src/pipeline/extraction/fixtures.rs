//! Synthetic documents for extraction tests.

use std::io::{Cursor, Write};

use lopdf::{dictionary, Document, Object, Stream};

use super::legacy_doc::{FIB_CCP_TEXT, FIB_FC_CLX, FIB_IDENT, FIB_LCB_CLX, WORD_IDENT};

/// Build a PDF with one page per entry. `None` pages carry no text operators.
pub fn make_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let content = match page {
            Some(text) => format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET"),
            None => "q Q".to_string(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Build a minimal DOCX archive around the given `<w:body>` inner XML.
pub fn make_docx(body_xml: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
    );

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Wrap plain strings as `<w:p><w:r><w:t>..</w:t></w:r></w:p>` paragraphs.
pub fn paragraphs(texts: &[&str]) -> String {
    texts
        .iter()
        .map(|t| format!(r#"<w:p><w:r><w:t xml:space="preserve">{t}</w:t></w:r></w:p>"#))
        .collect()
}

/// Build a minimal Word 97 compound file holding `text` in a single piece.
pub fn make_doc(text: &str, unicode: bool) -> Vec<u8> {
    const TEXT_OFFSET: usize = 0x800;

    let encoded: Vec<u8> = if unicode {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    } else {
        text.chars().map(|c| c as u8).collect()
    };
    let char_count = text.chars().count() as u32;

    let mut word = vec![0u8; TEXT_OFFSET];
    word[FIB_IDENT..FIB_IDENT + 2].copy_from_slice(&WORD_IDENT.to_le_bytes());
    word[FIB_CCP_TEXT..FIB_CCP_TEXT + 4].copy_from_slice(&char_count.to_le_bytes());
    word.extend_from_slice(&encoded);

    let fc: u32 = if unicode {
        TEXT_OFFSET as u32
    } else {
        ((TEXT_OFFSET as u32) * 2) | 0x4000_0000
    };
    let mut plc = Vec::new();
    plc.extend_from_slice(&0u32.to_le_bytes());
    plc.extend_from_slice(&char_count.to_le_bytes());
    plc.extend_from_slice(&0u16.to_le_bytes());
    plc.extend_from_slice(&fc.to_le_bytes());
    plc.extend_from_slice(&0u16.to_le_bytes());

    let mut clx = vec![0x02];
    clx.extend_from_slice(&(plc.len() as u32).to_le_bytes());
    clx.extend_from_slice(&plc);

    word[FIB_FC_CLX..FIB_FC_CLX + 4].copy_from_slice(&0u32.to_le_bytes());
    word[FIB_LCB_CLX..FIB_LCB_CLX + 4].copy_from_slice(&(clx.len() as u32).to_le_bytes());

    let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    compound
        .create_stream("/WordDocument")
        .unwrap()
        .write_all(&word)
        .unwrap();
    compound
        .create_stream("/0Table")
        .unwrap()
        .write_all(&clx)
        .unwrap();
    compound.flush().unwrap();
    compound.into_inner().into_inner()
}
