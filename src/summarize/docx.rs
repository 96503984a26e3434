/*!
 * Plain text from Word documents
 *
 * A .docx file is a zip package; the body lives in `word/document.xml`.
 * Each `<w:p>` paragraph becomes one line built from its `<w:t>` runs.
 */

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;
use zip::ZipArchive;

use super::DocumentReader;
use crate::error::{HarvestError, Result};

const BODY_PART: &str = "word/document.xml";

static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid text run pattern"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|lt|gt|amp|quot|apos);").expect("valid entity pattern")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxReader;

impl DocumentReader for DocxReader {
    fn read_text(&self, path: &Path) -> Result<String> {
        let unreadable = |message: String| HarvestError::Document {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file).map_err(|e| unreadable(e.to_string()))?;
        let mut body = archive
            .by_name(BODY_PART)
            .map_err(|e| unreadable(format!("{}: {}", BODY_PART, e)))?;

        let mut xml = String::new();
        body.read_to_string(&mut xml)?;
        let text = paragraph_text(&xml);
        debug!(path = %path.display(), chars = text.chars().count(), "document text extracted");
        Ok(text)
    }
}

/// One line per paragraph, trailing blank lines dropped
pub fn paragraph_text(xml: &str) -> String {
    let mut lines: Vec<String> = xml
        .split("</w:p>")
        .filter(|chunk| chunk.contains("<w:p>") || chunk.contains("<w:p "))
        .map(|chunk| {
            TEXT_RUN
                .captures_iter(chunk)
                .map(|caps| unescape(&caps[1]))
                .collect::<String>()
        })
        .collect();

    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn unescape(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ => entity[1..].parse().ok().and_then(char::from_u32),
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Source: Alpha &amp; Beta</w:t></w:r></w:p>
<w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve">Key </w:t></w:r><w:r><w:tab/><w:t>handling</w:t></w:r></w:p>
<w:p/>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>&lt;cell&gt; &#x2192; &#8364;</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p></w:p>
</w:body></w:document>"#;

    #[test]
    fn test_paragraph_text() {
        assert_eq!(
            paragraph_text(BODY),
            "Source: Alpha & Beta\nKey handling\n<cell> → €"
        );
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(unescape("a &nbsp; b &amp; c"), "a &nbsp; b & c");
    }

    #[test]
    fn test_read_docx_package() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1-001.docx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(BODY_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(BODY.as_bytes()).unwrap();
        writer.finish().unwrap();

        let text = DocxReader.read_text(&path).unwrap();
        assert!(text.starts_with("Source: Alpha & Beta"));
    }

    #[test]
    fn test_non_package_is_document_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1-002.docx");
        std::fs::write(&path, "plain text, not a package").unwrap();

        assert!(matches!(
            DocxReader.read_text(&path),
            Err(HarvestError::Document { .. })
        ));
    }

    #[test]
    fn test_package_without_body() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1-003.docx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        writer.finish().unwrap();

        match DocxReader.read_text(&path) {
            Err(HarvestError::Document { message, .. }) => assert!(message.contains(BODY_PART)),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
