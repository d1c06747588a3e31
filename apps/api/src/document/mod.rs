//! Resume text extraction.
//!
//! PDF parsing is delegated to `pdf-extract`. Extraction is CPU-bound and the
//! library may panic on malformed input, so it runs inside `spawn_blocking`.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";
const PAGE_BREAK: char = '\u{000C}';
const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("The uploaded file is empty.")]
    Empty,

    #[error("Could not parse the PDF file. It might be corrupted or in an unsupported format.")]
    Unparseable,

    #[error("No readable text was found in the resume.")]
    NoText,

    #[error("Unsupported resume format '{0}'. Upload a PDF or plain-text file.")]
    UnsupportedFormat(String),
}

/// The formats accepted for a resume upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    PlainText,
}

impl ResumeFormat {
    /// Resolves the format from the upload's content type, falling back to the file name.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, DocumentError> {
        match content_type.map(|c| c.split(';').next().unwrap_or(c).trim()) {
            Some("application/pdf") => return Ok(ResumeFormat::Pdf),
            Some("text/plain") => return Ok(ResumeFormat::PlainText),
            _ => {}
        }
        let lower = file_name.unwrap_or_default().to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Ok(ResumeFormat::Pdf)
        } else if lower.ends_with(".txt") {
            Ok(ResumeFormat::PlainText)
        } else {
            Err(DocumentError::UnsupportedFormat(
                content_type.unwrap_or("unknown").to_string(),
            ))
        }
    }
}

/// Extracts the text of an uploaded resume.
pub async fn extract_resume_text(bytes: Bytes, format: ResumeFormat) -> Result<String, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty);
    }

    let text = match format {
        ResumeFormat::PlainText => String::from_utf8_lossy(&bytes).into_owned(),
        ResumeFormat::Pdf => {
            let joined = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes)).await;
            match joined {
                Ok(result) => result?,
                Err(e) => {
                    warn!("PDF extraction task failed: {e}");
                    return Err(DocumentError::Unparseable);
                }
            }
        }
    };

    if text.trim().is_empty() {
        return Err(DocumentError::NoText);
    }
    debug!("Extracted {} characters of resume text", text.len());
    Ok(text)
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, DocumentError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(DocumentError::Unparseable);
    }
    let raw = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        warn!("Error parsing PDF: {e}");
        DocumentError::Unparseable
    })?;
    Ok(join_pages(&raw))
}

/// Normalizes extractor output: one block per page, pages separated by a blank line.
fn join_pages(raw: &str) -> String {
    let mut text = raw
        .split(PAGE_BREAK)
        .map(|page| page.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);
    if !text.is_empty() {
        text.push_str(PAGE_SEPARATOR);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARSE_FAILURE_MESSAGE: &str =
        "Could not parse the PDF file. It might be corrupted or in an unsupported format.";

    #[test]
    fn test_join_pages_separates_with_blank_line() {
        let raw = "Jane Doe\nRust   Engineer\u{000C}Projects:\n  Placement Analyzer\u{000C}";
        assert_eq!(
            join_pages(raw),
            "Jane Doe Rust Engineer\n\nProjects: Placement Analyzer\n\n"
        );
    }

    #[test]
    fn test_join_pages_blank_input() {
        assert_eq!(join_pages("  \n \u{000C} "), "");
    }

    #[test]
    fn test_detect_by_content_type() {
        assert_eq!(
            ResumeFormat::detect(Some("application/pdf"), None).unwrap(),
            ResumeFormat::Pdf
        );
        assert_eq!(
            ResumeFormat::detect(Some("text/plain; charset=utf-8"), Some("cv.bin")).unwrap(),
            ResumeFormat::PlainText
        );
    }

    #[test]
    fn test_detect_falls_back_to_extension() {
        assert_eq!(
            ResumeFormat::detect(Some("application/octet-stream"), Some("CV.PDF")).unwrap(),
            ResumeFormat::Pdf
        );
        assert!(matches!(
            ResumeFormat::detect(Some("image/png"), Some("photo.png")),
            Err(DocumentError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let err = extract_resume_text(Bytes::new(), ResumeFormat::Pdf).await.unwrap_err();
        assert!(matches!(err, DocumentError::Empty));
    }

    #[tokio::test]
    async fn test_non_pdf_bytes_are_unparseable() {
        let err = extract_resume_text(Bytes::from_static(b"PK\x03\x04 docx"), ResumeFormat::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Unparseable));
        assert_eq!(err.to_string(), PARSE_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_truncated_pdf_is_unparseable() {
        let err = extract_resume_text(Bytes::from_static(b"%PDF-1.7\n1 0 obj"), ResumeFormat::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Unparseable));
    }

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        let text = extract_resume_text(
            Bytes::from_static(b"Built a Placement Readiness Analyzer in Streamlit."),
            ResumeFormat::PlainText,
        )
        .await
        .unwrap();
        assert!(text.contains("Streamlit"));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_has_no_text() {
        let err = extract_resume_text(Bytes::from_static(b"   \n\t "), ResumeFormat::PlainText)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NoText));
    }
}
