//! Format reader: turns an uploaded byte buffer into a plain-text transcript.
//!
//! One strategy per supported format. Besides the transcript, readers surface
//! structural hyperlinks (PDF link annotations, DOCX relationships, Word field
//! instructions) because resumes often hide URLs behind anchor text like
//! "LinkedIn".
//!
//! PDF, DOCX and DOC decoding sit behind the `pdf`, `docx` and `doc` cargo
//! features. A build without one of them reports `MissingDependency` for that
//! format.

#[cfg(feature = "doc")]
pub mod doc;
#[cfg(feature = "docx")]
pub mod docx;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod txt;

use thiserror::Error;
use tracing::debug;

use crate::models::{DocumentType, FailureKind};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Unsupported file type: {0}. Please upload PDF, DOCX, DOC, or TXT files.")]
    UnsupportedFormat(String),

    #[error("The file could not be read as {format}: {reason}")]
    CorruptDocument {
        format: &'static str,
        reason: String,
    },

    #[error(
        "{format} support is not installed on this server. \
         Rebuild the extractor with the `{feature}` feature enabled."
    )]
    MissingDependency {
        format: &'static str,
        feature: &'static str,
    },
}

impl ReadError {
    #[cfg_attr(not(any(feature = "pdf", feature = "docx", feature = "doc")), allow(dead_code))]
    pub fn corrupt(doc_type: DocumentType, reason: impl Into<String>) -> Self {
        ReadError::CorruptDocument {
            format: doc_type.label(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ReadError::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            ReadError::CorruptDocument { .. } => FailureKind::CorruptDocument,
            ReadError::MissingDependency { .. } => FailureKind::MissingDependency,
        }
    }
}

/// Reader output: the transcript plus link targets found in document structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDocument {
    pub text: String,
    /// Structural hyperlink targets in the order the reader met them. May hold
    /// `mailto:`/`tel:` targets; the classifiers sort those out.
    pub hyperlinks: Vec<String>,
}

impl RawDocument {
    pub fn text_only(text: String) -> Self {
        Self {
            text,
            hyperlinks: Vec::new(),
        }
    }
}

/// Reads `bytes` according to the declared `content_type`.
///
/// The declared type is checked before any byte is inspected.
pub fn read(bytes: &[u8], content_type: &str) -> Result<RawDocument, ReadError> {
    let doc_type = DocumentType::from_mime(content_type).ok_or_else(|| {
        let shown = if content_type.trim().is_empty() {
            "(none)".to_string()
        } else {
            content_type.trim().to_string()
        };
        ReadError::UnsupportedFormat(shown)
    })?;

    debug!(
        format = doc_type.label(),
        size = bytes.len(),
        "Reading document"
    );

    let raw = match doc_type {
        DocumentType::Pdf => read_pdf(bytes)?,
        DocumentType::Docx => read_docx(bytes)?,
        DocumentType::Doc => read_doc(bytes)?,
        DocumentType::Txt => txt::read(bytes),
    };

    debug!(
        chars = raw.text.len(),
        hyperlinks = raw.hyperlinks.len(),
        "Document read"
    );
    Ok(raw)
}

#[cfg(feature = "pdf")]
fn read_pdf(bytes: &[u8]) -> Result<RawDocument, ReadError> {
    pdf::read(bytes)
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(_bytes: &[u8]) -> Result<RawDocument, ReadError> {
    Err(ReadError::MissingDependency {
        format: "PDF",
        feature: "pdf",
    })
}

#[cfg(feature = "docx")]
fn read_docx(bytes: &[u8]) -> Result<RawDocument, ReadError> {
    docx::read(bytes)
}

#[cfg(not(feature = "docx"))]
fn read_docx(_bytes: &[u8]) -> Result<RawDocument, ReadError> {
    Err(ReadError::MissingDependency {
        format: "DOCX",
        feature: "docx",
    })
}

#[cfg(feature = "doc")]
fn read_doc(bytes: &[u8]) -> Result<RawDocument, ReadError> {
    doc::read(bytes)
}

#[cfg(not(feature = "doc"))]
fn read_doc(_bytes: &[u8]) -> Result<RawDocument, ReadError> {
    Err(ReadError::MissingDependency {
        format: "DOC",
        feature: "doc",
    })
}

/// Pulls the target out of a Word `HYPERLINK` field instruction, e.g.
/// `HYPERLINK "https://github.com/alice" \o "tooltip"`.
///
/// Bookmark links (`\l`) point inside the document and yield `None`.
#[cfg_attr(not(any(feature = "doc", feature = "docx")), allow(dead_code))]
pub(crate) fn hyperlink_from_field(instruction: &str) -> Option<String> {
    let mut tokens = field_tokens(instruction).into_iter();
    let keyword = tokens.next()?;
    if !keyword.eq_ignore_ascii_case("HYPERLINK") {
        return None;
    }

    let mut target = None;
    while let Some(token) = tokens.next() {
        if let Some(switch) = token.strip_prefix('\\') {
            if matches!(switch, "l" | "o" | "t") {
                tokens.next();
            }
            continue;
        }
        if target.is_none() && !token.is_empty() {
            target = Some(token);
        }
    }
    target
}

/// Splits a field instruction on whitespace, keeping quoted runs together.
fn field_tokens(instruction: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = instruction.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                token.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_rejected_before_parsing() {
        let err = read(b"%PDF-1.4 garbage", "image/png").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedFormat);
        assert!(err.to_string().contains("image/png"));
    }

    #[test]
    fn test_empty_content_type_is_unsupported() {
        let err = read(b"hello", "").unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat(ref t) if t == "(none)"));
    }

    #[test]
    fn test_txt_dispatch() {
        let raw = read(b"hello world", "text/plain").unwrap();
        assert_eq!(raw.text, "hello world");
        assert!(raw.hyperlinks.is_empty());
    }

    #[test]
    fn test_error_messages_are_distinguishable() {
        let unsupported = ReadError::UnsupportedFormat("image/png".into()).to_string();
        let corrupt = ReadError::corrupt(DocumentType::Pdf, "bad xref").to_string();
        let missing = ReadError::MissingDependency {
            format: "PDF",
            feature: "pdf",
        }
        .to_string();
        assert!(unsupported.starts_with("Unsupported file type"));
        assert!(corrupt.contains("could not be read as PDF"));
        assert!(missing.contains("not installed"));
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn test_pdf_without_feature_is_missing_dependency() {
        let err = read(b"%PDF-1.4", "application/pdf").unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingDependency);
    }

    #[cfg(not(feature = "doc"))]
    #[test]
    fn test_doc_without_feature_is_missing_dependency() {
        let err = read(b"\xD0\xCF\x11\xE0", "application/msword").unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingDependency);
    }

    #[test]
    fn test_hyperlink_field_plain() {
        assert_eq!(
            hyperlink_from_field(r#" HYPERLINK "https://github.com/alice" "#),
            Some("https://github.com/alice".to_string())
        );
    }

    #[test]
    fn test_hyperlink_field_with_tooltip_switch() {
        assert_eq!(
            hyperlink_from_field(r#"HYPERLINK \o "My profile" "https://linkedin.com/in/a""#),
            Some("https://linkedin.com/in/a".to_string())
        );
    }

    #[test]
    fn test_hyperlink_field_bookmark_ignored() {
        assert_eq!(hyperlink_from_field(r#"HYPERLINK \l "_Toc1""#), None);
    }

    #[test]
    fn test_non_hyperlink_field_ignored() {
        assert_eq!(hyperlink_from_field(r#"PAGE \* MERGEFORMAT"#), None);
    }
}
