//! Plain-text extraction from uploaded resume files.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::AppError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
    Text,
    Markdown,
}

impl ResumeFormat {
    /// Picks the format from the file extension. Legacy `.doc` is refused outright.
    pub fn from_file_name(file_name: &str) -> Result<Self, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => Ok(ResumeFormat::Pdf),
            "docx" => Ok(ResumeFormat::Docx),
            "txt" => Ok(ResumeFormat::Text),
            "md" => Ok(ResumeFormat::Markdown),
            "doc" => Err(AppError::UnprocessableEntity(
                "Legacy .doc files are not supported. Upload PDF, DOCX, TXT or MD".to_string(),
            )),
            other => Err(AppError::UnprocessableEntity(format!(
                "Unsupported file type '{other}'. Upload PDF, DOCX, TXT or MD"
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::Docx => "docx",
            ResumeFormat::Text => "txt",
            ResumeFormat::Markdown => "md",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "application/pdf",
            ResumeFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ResumeFormat::Text => "text/plain",
            ResumeFormat::Markdown => "text/markdown",
        }
    }
}

/// Extracts text from the file bytes. CPU-bound for PDFs; call from `spawn_blocking`.
pub fn extract_text(format: ResumeFormat, data: &[u8]) -> Result<String, AppError> {
    let text = match format {
        ResumeFormat::Pdf => pdf_extract::extract_text_from_mem(data)
            .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?,
        ResumeFormat::Docx => extract_docx_text(data)
            .map_err(|e| AppError::UnprocessableEntity(format!("Could not read DOCX: {e}")))?,
        ResumeFormat::Text | ResumeFormat::Markdown => String::from_utf8_lossy(data).into_owned(),
    };
    Ok(normalise_whitespace(&text))
}

fn extract_docx_text(data: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current = String::new();
    let mut lines = Vec::new();
    let mut in_paragraph = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:p" => {
                in_paragraph = true;
                current.clear();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                if !current.trim().is_empty() {
                    lines.push(current.trim().to_string());
                }
                current.clear();
                in_paragraph = false;
            }
            Ok(Event::Text(e)) if in_paragraph => {
                current.push_str(&e.xml_content()?);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(lines.join("\n"))
}

/// Drops trailing spaces and `\r`, keeps line structure for the section parser.
fn normalise_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_docx(xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(ResumeFormat::from_file_name("cv.PDF").unwrap(), ResumeFormat::Pdf);
        assert_eq!(ResumeFormat::from_file_name("cv.md").unwrap(), ResumeFormat::Markdown);
        assert!(matches!(
            ResumeFormat::from_file_name("cv.doc"),
            Err(AppError::UnprocessableEntity(_))
        ));
        assert!(ResumeFormat::from_file_name("cv.exe").is_err());
        assert!(ResumeFormat::from_file_name("noextension").is_err());
    }

    #[test]
    fn test_extract_plain_text_trims_trailing_space() {
        let text = extract_text(ResumeFormat::Text, b"Jane Doe   \r\nSKILLS  \r\nRust\n\n").unwrap();
        assert_eq!(text, "Jane Doe\nSKILLS\nRust");
    }

    #[test]
    fn test_extract_docx_paragraphs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
<w:p><w:r><w:t>Rust and Go</w:t></w:r></w:p>
<w:p></w:p>
</w:body>
</w:document>"#;
        let text = extract_text(ResumeFormat::Docx, &make_docx(xml)).unwrap();
        assert_eq!(text, "Jane Doe\nRust and Go");
    }

    #[test]
    fn test_extract_docx_rejects_garbage() {
        let result = extract_text(ResumeFormat::Docx, b"not a zip file");
        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
    }
}
