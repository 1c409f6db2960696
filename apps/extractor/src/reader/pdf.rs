//! PDF reader.
//!
//! Uses pdf-extract for page text and lopdf to walk link annotations, which is
//! where most PDF resumes keep their profile URLs.

use std::panic;

use lopdf::{Dictionary, Document, Object};
use tracing::{debug, warn};

use super::{RawDocument, ReadError};
use crate::models::DocumentType;

/// The header may be preceded by junk; readers accept it within the first 1 KiB.
const HEADER_WINDOW: usize = 1024;

pub fn read(bytes: &[u8]) -> Result<RawDocument, ReadError> {
    if !has_pdf_header(bytes) {
        return Err(ReadError::corrupt(
            DocumentType::Pdf,
            "missing %PDF- header",
        ));
    }

    let pages = extract_pages(bytes)?;
    debug!(pages = pages.len(), "Extracted PDF text");

    Ok(RawDocument {
        text: pages.join("\n"),
        hyperlinks: extract_link_annotations(bytes),
    })
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Page texts in page order. pdf-extract panics on some malformed files, so the
/// call is isolated and a panic becomes `CorruptDocument`.
fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ReadError> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ReadError::corrupt(DocumentType::Pdf, e.to_string())),
        Err(_) => Err(ReadError::corrupt(
            DocumentType::Pdf,
            "the PDF structure is malformed",
        )),
    }
}

/// URI targets of every `/Link` annotation, page by page.
///
/// Best-effort: a document whose text decoded fine but whose object graph
/// lopdf rejects simply contributes no structural links.
fn extract_link_annotations(bytes: &[u8]) -> Vec<String> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to load PDF for link annotations: {}", e);
            return vec![];
        }
    };

    let mut links = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|obj| resolve(&doc, obj))
            .and_then(|obj| obj.as_array().ok())
        else {
            continue;
        };

        for annot in annots {
            let Some(dict) = resolve(&doc, annot).and_then(|obj| obj.as_dict().ok()) else {
                continue;
            };
            if let Some(uri) = link_uri(&doc, dict) {
                debug!(page = page_num, %uri, "Found link annotation");
                links.push(uri);
            }
        }
    }
    links
}

fn link_uri(doc: &Document, annot: &Dictionary) -> Option<String> {
    if !is_name(annot.get(b"Subtype").ok()?, b"Link") {
        return None;
    }
    let action = resolve(doc, annot.get(b"A").ok()?)?.as_dict().ok()?;
    if !is_name(action.get(b"S").ok()?, b"URI") {
        return None;
    }
    match resolve(doc, action.get(b"URI").ok()?)? {
        Object::String(raw, _) => Some(decode_text_string(raw)).filter(|uri| !uri.is_empty()),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn is_name(obj: &Object, expected: &[u8]) -> bool {
    matches!(obj, Object::Name(name) if name.as_slice() == expected)
}

/// URIs are 7-bit ASCII in practice, but some producers write UTF-16BE text
/// strings with a byte-order mark.
fn decode_text_string(raw: &[u8]) -> String {
    if let Some(rest) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units).trim().to_string();
    }
    match std::str::from_utf8(raw) {
        Ok(text) => text.trim().to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect::<String>().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// Builds a one-page PDF with a line of Helvetica text and the given link
    /// annotations.
    fn build_pdf(line: &str, links: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let annot_ids: Vec<Object> = links
            .iter()
            .map(|uri| {
                doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Link",
                    "Rect" => vec![72.into(), 700.into(), 200.into(), 720.into()],
                    "A" => dictionary! {
                        "S" => "URI",
                        "URI" => Object::string_literal(*uri),
                    },
                })
                .into()
            })
            .collect();

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => annot_ids,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_link_annotations_harvested_in_order() {
        let bytes = build_pdf(
            "GitHub LinkedIn",
            &["https://github.com/alice", "https://linkedin.com/in/alice"],
        );
        assert_eq!(
            extract_link_annotations(&bytes),
            vec![
                "https://github.com/alice".to_string(),
                "https://linkedin.com/in/alice".to_string()
            ]
        );
    }

    #[test]
    fn test_read_returns_text_and_links() {
        let bytes = build_pdf("Jane Doe", &["mailto:jane@example.com"]);
        let raw = read(&bytes).unwrap();
        assert!(raw.text.contains("Jane"), "text was {:?}", raw.text);
        assert_eq!(raw.hyperlinks, vec!["mailto:jane@example.com".to_string()]);
    }

    #[test]
    fn test_missing_header_is_corrupt() {
        let err = read(b"PK\x03\x04 not a pdf").unwrap_err();
        assert!(matches!(err, ReadError::CorruptDocument { format: "PDF", .. }));
    }

    #[test]
    fn test_truncated_pdf_is_corrupt() {
        let bytes = build_pdf("Jane Doe", &[]);
        let err = read(&bytes[..40]).unwrap_err();
        assert!(matches!(err, ReadError::CorruptDocument { .. }));
    }

    #[test]
    fn test_utf16_uri_decoded() {
        let mut raw = vec![0xFE, 0xFF];
        for unit in "https://x.com/a".encode_utf16() {
            raw.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text_string(&raw), "https://x.com/a");
    }
}
