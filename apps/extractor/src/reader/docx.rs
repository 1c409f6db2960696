//! DOCX reader.
//!
//! Walks `word/document.xml` with quick-xml, emitting paragraph text in document
//! order, and resolves `w:hyperlink r:id` references through the document's
//! relationship part so hyperlinks hidden behind anchor text are not lost.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{hyperlink_from_field, RawDocument, ReadError};
use crate::models::DocumentType;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const HYPERLINK_REL_SUFFIX: &str = "/hyperlink";
/// Ceiling on one inflated XML part. Deflate can expand a small upload by
/// three orders of magnitude.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

pub fn read(bytes: &[u8]) -> Result<RawDocument, ReadError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| corrupt(format!("not a valid DOCX container: {e}")))?;

    let document_xml = read_part(&mut archive, DOCUMENT_PART, MAX_PART_BYTES)?
        .ok_or_else(|| corrupt(format!("{DOCUMENT_PART} is missing")))?;
    let relationships = match read_part(&mut archive, DOCUMENT_RELS_PART, MAX_PART_BYTES)? {
        Some(xml) => parse_relationships(&xml)?,
        None => Vec::new(),
    };

    let body = parse_body(&document_xml)?;
    let hyperlinks = resolve_hyperlinks(&body.links, &relationships);
    debug!(
        relationships = relationships.len(),
        hyperlinks = hyperlinks.len(),
        "Parsed DOCX body"
    );

    Ok(RawDocument {
        text: body.text,
        hyperlinks,
    })
}

fn corrupt(reason: impl Into<String>) -> ReadError {
    ReadError::corrupt(DocumentType::Docx, reason)
}

/// Reads one part, refusing to inflate more than `limit` bytes. Both the
/// declared size and the bytes actually inflated are checked.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, ReadError> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(corrupt(format!("failed to open {name}: {e}"))),
    };
    if file.size() > limit {
        return Err(too_large(name, limit));
    }
    let mut xml = String::new();
    let read = file
        .take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| corrupt(format!("failed to read {name}: {e}")))?;
    if read as u64 > limit {
        return Err(too_large(name, limit));
    }
    Ok(Some(xml))
}

fn too_large(name: &str, limit: u64) -> ReadError {
    corrupt(format!("{name} inflates past {limit} bytes"))
}

/// A hyperlink as it appears in the body, before relationship lookup.
#[derive(Debug, Clone, PartialEq)]
enum BodyLink {
    Relationship(String),
    Target(String),
}

#[derive(Debug, Default)]
struct Body {
    text: String,
    links: Vec<BodyLink>,
}

/// An open complex field (`w:fldChar begin` … `end`). Its instruction is
/// handled once, at `separate` or at `end`, whichever comes first.
#[derive(Debug, Default)]
struct OpenField {
    instruction: String,
    handled: bool,
}

fn parse_body(xml: &str) -> Result<Body, ReadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut body = Body::default();
    let mut in_text = false;
    let mut in_instr = false;
    let mut tabs_depth = 0usize;
    // mc:Fallback repeats the content of mc:Choice for older readers.
    let mut fallback_depth = 0usize;
    let mut fields: Vec<OpenField> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            corrupt(format!(
                "malformed {DOCUMENT_PART} at byte {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"Fallback" => fallback_depth += 1,
                _ if fallback_depth > 0 => {}
                b"t" => in_text = true,
                b"instrText" => in_instr = true,
                b"tabs" => tabs_depth += 1,
                b"hyperlink" => push_relationship(&mut body, e),
                b"fldSimple" => push_simple_field(&mut body, e),
                b"fldChar" => field_char(&mut body, &mut fields, e),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                _ if fallback_depth > 0 => {}
                b"tab" if tabs_depth == 0 => body.text.push('\t'),
                b"br" | b"cr" | b"p" => body.text.push('\n'),
                b"hyperlink" => push_relationship(&mut body, e),
                b"fldSimple" => push_simple_field(&mut body, e),
                b"fldChar" => field_char(&mut body, &mut fields, e),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
                _ if fallback_depth > 0 => {}
                b"t" => in_text = false,
                b"instrText" => in_instr = false,
                b"tabs" => tabs_depth = tabs_depth.saturating_sub(1),
                b"p" => body.text.push('\n'),
                _ => {}
            },
            Event::Text(ref t) if fallback_depth == 0 && (in_text || in_instr) => {
                let value = t
                    .unescape()
                    .map_err(|e| corrupt(format!("bad text in {DOCUMENT_PART}: {e}")))?;
                if in_text {
                    body.text.push_str(&value);
                } else if let Some(field) = fields.last_mut() {
                    field.instruction.push_str(&value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

fn push_relationship(body: &mut Body, element: &BytesStart) {
    if let Some(id) = attr_value(element, b"id") {
        body.links.push(BodyLink::Relationship(id));
    }
}

fn push_simple_field(body: &mut Body, element: &BytesStart) {
    if let Some(target) = attr_value(element, b"instr").and_then(|i| hyperlink_from_field(&i)) {
        body.links.push(BodyLink::Target(target));
    }
}

fn field_char(body: &mut Body, fields: &mut Vec<OpenField>, element: &BytesStart) {
    match attr_value(element, b"fldCharType").as_deref() {
        Some("begin") => fields.push(OpenField::default()),
        Some("separate") => {
            if let Some(field) = fields.last_mut() {
                handle_field(body, field);
            }
        }
        Some("end") => {
            if let Some(mut field) = fields.pop() {
                handle_field(body, &mut field);
            }
        }
        _ => {}
    }
}

fn handle_field(body: &mut Body, field: &mut OpenField) {
    if field.handled {
        return;
    }
    field.handled = true;
    if let Some(target) = hyperlink_from_field(&field.instruction) {
        body.links.push(BodyLink::Target(target));
    }
}

fn attr_value(element: &BytesStart, local: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Hyperlink relationships as `(id, target)` pairs, in part order.
fn parse_relationships(xml: &str) -> Result<Vec<(String, String)>, ReadError> {
    let mut reader = Reader::from_str(xml);
    let mut hyperlinks = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            corrupt(format!(
                "malformed {DOCUMENT_RELS_PART} at byte {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let is_hyperlink = attr_value(e, b"Type")
                    .is_some_and(|t| t.ends_with(HYPERLINK_REL_SUFFIX));
                if !is_hyperlink {
                    continue;
                }
                if let (Some(id), Some(target)) = (attr_value(e, b"Id"), attr_value(e, b"Target"))
                {
                    hyperlinks.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(hyperlinks)
}

/// Body links in document order, followed by hyperlink relationships that the
/// body never referenced.
fn resolve_hyperlinks(links: &[BodyLink], relationships: &[(String, String)]) -> Vec<String> {
    let mut resolved = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    for link in links {
        match link {
            BodyLink::Relationship(id) => {
                match relationships.iter().find(|(rel_id, _)| rel_id == id) {
                    Some((_, target)) => {
                        used.insert(id.as_str());
                        resolved.push(target.clone());
                    }
                    None => debug!(%id, "Hyperlink references unknown relationship"),
                }
            }
            BodyLink::Target(target) => resolved.push(target.clone()),
        }
    }

    for (id, target) in relationships {
        if !used.contains(id.as_str()) {
            resolved.push(target.clone());
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const HYPERLINK_TYPE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

    fn build_docx(parts: &[(&str, String)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn rels() -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId5" Type="{HYPERLINK_TYPE}" Target="https://www.linkedin.com/in/jane" TargetMode="External"/><Relationship Id="rId9" Type="{HYPERLINK_TYPE}" Target="https://jane.dev" TargetMode="External"/></Relationships>"#
        )
    }

    const RESUME_BODY: &str = concat!(
        r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>"#,
        r#"<w:r><w:t>Jane Doe</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve">Engineer</w:t></w:r></w:p>"#,
        r#"<w:p><w:hyperlink r:id="rId5"><w:r><w:t>LinkedIn</w:t></w:r></w:hyperlink>"#,
        r#"<w:r><w:t xml:space="preserve"> | </w:t></w:r>"#,
        r#"<w:fldSimple w:instr=" HYPERLINK &quot;https://github.com/jane&quot; "><w:r><w:t>GitHub</w:t></w:r></w:fldSimple></w:p>"#,
        r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r>"#,
        r#"<w:r><w:instrText xml:space="preserve"> HYPERLINK "mailto:jane@example.com" </w:instrText></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>Email me</w:t></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>A &amp; B</w:t><w:br/><w:t>line two</w:t></w:r></w:p>"#,
    );

    #[test]
    fn test_paragraph_text_in_document_order() {
        let bytes = build_docx(&[
            (DOCUMENT_PART, document(RESUME_BODY)),
            (DOCUMENT_RELS_PART, rels()),
        ]);
        let raw = read(&bytes).unwrap();
        assert_eq!(
            raw.text,
            "Jane Doe\tEngineer\nLinkedIn | GitHub\nEmail me\nA & B\nline two\n"
        );
    }

    #[test]
    fn test_hyperlinks_resolved_through_relationships() {
        let bytes = build_docx(&[
            (DOCUMENT_PART, document(RESUME_BODY)),
            (DOCUMENT_RELS_PART, rels()),
        ]);
        let raw = read(&bytes).unwrap();
        assert_eq!(
            raw.hyperlinks,
            vec![
                "https://www.linkedin.com/in/jane".to_string(),
                "https://github.com/jane".to_string(),
                "mailto:jane@example.com".to_string(),
                "https://jane.dev".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_rels_part_is_not_fatal() {
        let bytes = build_docx(&[(
            DOCUMENT_PART,
            document(r#"<w:p><w:hyperlink r:id="rId5"><w:r><w:t>Profile</w:t></w:r></w:hyperlink></w:p>"#),
        )]);
        let raw = read(&bytes).unwrap();
        assert_eq!(raw.text, "Profile\n");
        assert!(raw.hyperlinks.is_empty());
    }

    #[test]
    fn test_fallback_content_not_duplicated() {
        let body = concat!(
            r#"<w:p><w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:t>Box</w:t></mc:Choice>"#,
            r#"<mc:Fallback><w:t>Box</w:t></mc:Fallback></mc:AlternateContent></w:r></w:p>"#,
        );
        let bytes = build_docx(&[(DOCUMENT_PART, document(body))]);
        assert_eq!(read(&bytes).unwrap().text, "Box\n");
    }

    #[test]
    fn test_part_inflating_past_limit_is_corrupt() {
        let padding = " ".repeat(1 << 20);
        let bytes = build_docx(&[(DOCUMENT_PART, document(&padding))]);
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        let err = read_part(&mut archive, DOCUMENT_PART, 4096).unwrap_err();
        assert!(matches!(err, ReadError::CorruptDocument { format: "DOCX", .. }));
        assert!(err.to_string().contains("inflates past 4096 bytes"));

        let xml = read_part(&mut archive, DOCUMENT_PART, MAX_PART_BYTES).unwrap();
        assert!(xml.is_some_and(|xml| xml.len() > 1 << 20));
    }

    #[test]
    fn test_not_a_zip_is_corrupt() {
        let err = read(b"this is not a zip file").unwrap_err();
        assert!(matches!(err, ReadError::CorruptDocument { format: "DOCX", .. }));
    }

    #[test]
    fn test_truncated_zip_is_corrupt() {
        let bytes = build_docx(&[(DOCUMENT_PART, document(RESUME_BODY))]);
        let err = read(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ReadError::CorruptDocument { .. }));
    }

    #[test]
    fn test_zip_without_document_part_is_corrupt() {
        let bytes = build_docx(&[("hello.txt", "hi".to_string())]);
        let err = read(&bytes).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }
}
