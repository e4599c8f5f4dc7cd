//! DOCX post-processing.

use crate::error::ConversionError;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use std::sync::LazyLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";

static FIRST_PARAGRAPH_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<w:pStyle\s+w:val="FirstParagraph"\s*/>"#).unwrap());

fn post_process_error(e: impl std::fmt::Display) -> ConversionError {
    ConversionError::PostProcess(e.to_string())
}

/// The converter gives the paragraph after each heading its own
/// "First Paragraph" style (no first-line indent). Point those paragraphs back
/// at "Body Text" so they look like every other paragraph.
pub fn suppress_first_paragraph_indent(docx: &[u8]) -> Result<Vec<u8>, ConversionError> {
    let mut archive = ZipArchive::new(Cursor::new(docx)).map_err(post_process_error)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(docx.len())));

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(post_process_error)?;

        if entry.name() != DOCUMENT_PART {
            writer.raw_copy_file(entry).map_err(post_process_error)?;
            continue;
        }

        let mut xml = String::new();
        entry.read_to_string(&mut xml).map_err(post_process_error)?;
        let rewritten =
            FIRST_PARAGRAPH_STYLE.replace_all(&xml, r#"<w:pStyle w:val="BodyText"/>"#);

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(DOCUMENT_PART, options)
            .map_err(post_process_error)?;
        writer
            .write_all(rewritten.as_bytes())
            .map_err(post_process_error)?;
    }

    let cursor = writer.finish().map_err(post_process_error)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal archive shaped like a converter-produced document.
    pub(crate) fn sample_docx(document_xml: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn read_part(docx: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn first_paragraph_becomes_body_text() {
        let xml = r#"<w:p><w:pPr><w:pStyle w:val="Heading1" /></w:pPr></w:p><w:p><w:pPr><w:pStyle w:val="FirstParagraph" /></w:pPr></w:p>"#;
        let processed = suppress_first_paragraph_indent(&sample_docx(xml)).unwrap();

        let document = read_part(&processed, DOCUMENT_PART);
        assert!(document.contains(r#"<w:pStyle w:val="BodyText"/>"#));
        assert!(!document.contains("FirstParagraph"));
        assert!(document.contains("Heading1"));
        assert_eq!(read_part(&processed, "[Content_Types].xml"), "<Types/>");
    }

    #[test]
    fn garbage_is_a_conversion_error() {
        assert!(matches!(
            suppress_first_paragraph_indent(b"not a zip"),
            Err(ConversionError::PostProcess(_))
        ));
    }
}
