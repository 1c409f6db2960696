use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_TXT: &str = "text/plain";

/// The four document formats the reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Doc,
    Txt,
}

impl DocumentType {
    /// Maps a declared MIME type to a format. Parameters (`; charset=...`) and
    /// case are ignored.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Some(DocumentType::Pdf),
            MIME_DOCX => Some(DocumentType::Docx),
            MIME_DOC => Some(DocumentType::Doc),
            MIME_TXT => Some(DocumentType::Txt),
            _ => None,
        }
    }

    /// Short human label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "PDF",
            DocumentType::Docx => "DOCX",
            DocumentType::Doc => "DOC",
            DocumentType::Txt => "TXT",
        }
    }
}

/// One uploaded document, owned by a single extraction call.
///
/// `content_type` stays the raw declared string so an unsupported value is
/// rejected by the reader rather than lost at construction time.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: String,
}

impl DocumentInput {
    pub fn new(
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            file_name: file_name.into(),
        }
    }
}
