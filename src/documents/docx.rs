//! `.docx` packages are zip archives; the document body and the headers,
//! footers and notes all live in `word/*.xml` parts.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::placeholders;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document package: {0}")]
    Package(#[from] zip::result::ZipError),
    #[error("failed to read document part: {0}")]
    Io(#[from] std::io::Error),
    #[error("document part {0} is not valid UTF-8")]
    Encoding(String),
}

/// Upper bound on the buffer reserved up front for one part; the size in
/// the zip header is untrusted.
const MAX_PART_RESERVE: u64 = 1 << 20;

fn reserve_for(declared: u64) -> usize {
    declared.min(MAX_PART_RESERVE) as usize
}

fn is_renderable(name: &str) -> bool {
    name.strip_prefix("word/")
        .is_some_and(|rest| rest.ends_with(".xml"))
}

/// Renders every `word/*.xml` part of the package and copies the other
/// entries unchanged, keeping each entry's compression method.
pub fn render_docx(
    template: &[u8],
    values: &HashMap<String, String>,
) -> Result<Vec<u8>, DocumentError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(template.len())));

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        if entry.is_dir() || !is_renderable(&name) {
            writer.raw_copy_file(entry)?;
            continue;
        }

        let options = SimpleFileOptions::default().compression_method(entry.compression());
        let mut raw = Vec::with_capacity(reserve_for(entry.size()));
        entry.read_to_end(&mut raw)?;
        let xml = String::from_utf8(raw).map_err(|_| DocumentError::Encoding(name.clone()))?;

        writer.start_file(name, options)?;
        writer.write_all(placeholders::render(&xml, values).as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Builds a package from `(name, content)` parts, deflating each one.
pub fn build_package(parts: &[(&str, &str)]) -> Result<Vec<u8>, DocumentError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, content) in parts {
        writer.start_file(*name, options)?;
        writer.write_all(content.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_part(package: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn renders_word_parts_and_copies_the_rest() {
        let template = build_package(&[
            ("[Content_Types].xml", "<Types>[[NOME]]</Types>"),
            ("word/document.xml", "<w:t>Contratante: [[NOME]]</w:t>"),
            ("word/footer1.xml", "<w:t>[[CIDADE]], [[ASSINATURA]]</w:t>"),
        ])
        .unwrap();

        let values = HashMap::from([
            ("NOME".to_string(), "Carlos".to_string()),
            ("CIDADE".to_string(), "Recife".to_string()),
        ]);
        let rendered = render_docx(&template, &values).unwrap();

        assert_eq!(
            read_part(&rendered, "word/document.xml"),
            "<w:t>Contratante: Carlos</w:t>"
        );
        assert_eq!(
            read_part(&rendered, "word/footer1.xml"),
            "<w:t>Recife, [[ASSINATURA]]</w:t>"
        );
        assert_eq!(
            read_part(&rendered, "[Content_Types].xml"),
            "<Types>[[NOME]]</Types>"
        );
    }

    #[test]
    fn declared_part_size_only_bounds_the_reservation() {
        assert_eq!(reserve_for(512), 512);
        assert_eq!(reserve_for(u64::MAX), MAX_PART_RESERVE as usize);
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(matches!(
            render_docx(b"not a zip", &HashMap::new()),
            Err(DocumentError::Package(_))
        ));
    }
}
