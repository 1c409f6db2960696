//! Legacy Word 97–2003 (`.doc`) reader.
//!
//! A `.doc` file is an OLE compound file. The `WordDocument` stream starts with
//! the FIB, which points at the piece table (CLX) inside the `0Table` or
//! `1Table` stream. Each piece maps a run of character positions to either
//! 8-bit cp1252 bytes or UTF-16LE code units in `WordDocument`.
//!
//! Field instructions (`\x13 instruction \x14 result \x15`) are dropped from the
//! transcript; `HYPERLINK` instructions become structural links.

use std::io::{Cursor, Read, Seek};

use cfb::CompoundFile;
use tracing::debug;

use super::{hyperlink_from_field, RawDocument, ReadError};
use crate::models::DocumentType;

const WORD_IDENT: u16 = 0xA5EC;
/// nFib of Word 97; older files use an incompatible FIB layout.
const MIN_NFIB: u16 = 0x00C1;
const FIB_FLAG_ENCRYPTED: u16 = 0x0100;
const FIB_FLAG_TABLE_1: u16 = 0x0200;
const FIB_FC_CLX: usize = 0x01A2;
const FIB_LCB_CLX: usize = 0x01A6;
const PIECE_COMPRESSED: u32 = 0x4000_0000;

const FIELD_BEGIN: char = '\u{13}';
const FIELD_SEPARATOR: char = '\u{14}';
const FIELD_END: char = '\u{15}';

/// cp1252 code points for 0x80..=0x9F; the rest of the byte range is Latin-1.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

pub fn read(bytes: &[u8]) -> Result<RawDocument, ReadError> {
    let mut cfb = CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| corrupt(format!("not an OLE compound file: {e}")))?;

    let word = read_stream(&mut cfb, "WordDocument")?
        .ok_or_else(|| corrupt("no WordDocument stream, not a Word document"))?;

    let ident = u16_at(&word, 0x0000).ok_or_else(|| corrupt("truncated FIB"))?;
    let n_fib = u16_at(&word, 0x0002).ok_or_else(|| corrupt("truncated FIB"))?;
    let flags = u16_at(&word, 0x000A).ok_or_else(|| corrupt("truncated FIB"))?;
    if ident != WORD_IDENT {
        return Err(corrupt(format!("unrecognized Word identifier {ident:#06x}")));
    }
    if n_fib < MIN_NFIB {
        return Err(corrupt("Word 6/95 documents are not supported"));
    }
    if flags & FIB_FLAG_ENCRYPTED != 0 {
        return Err(corrupt("the document is password protected"));
    }

    let table_name = if flags & FIB_FLAG_TABLE_1 != 0 {
        "1Table"
    } else {
        "0Table"
    };
    let table = read_stream(&mut cfb, table_name)?
        .ok_or_else(|| corrupt(format!("{table_name} stream is missing")))?;

    let fc_clx = u32_at(&word, FIB_FC_CLX).ok_or_else(|| corrupt("truncated FIB"))? as usize;
    let lcb_clx = u32_at(&word, FIB_LCB_CLX).ok_or_else(|| corrupt("truncated FIB"))? as usize;
    let clx = fc_clx
        .checked_add(lcb_clx)
        .and_then(|end| table.get(fc_clx..end))
        .ok_or_else(|| corrupt("piece table lies outside the table stream"))?;

    let pieces = parse_pieces(clx).map_err(corrupt)?;
    let raw = decode_pieces(&word, &pieces).map_err(corrupt)?;
    debug!(pieces = pieces.len(), chars = raw.len(), "Decoded Word piece table");

    Ok(render(&raw))
}

fn corrupt(reason: impl Into<String>) -> ReadError {
    ReadError::corrupt(DocumentType::Doc, reason)
}

/// Contents of a root-level stream, or `None` if the file has no such stream.
fn read_stream<F: Read + Seek>(
    cfb: &mut CompoundFile<F>,
    name: &str,
) -> Result<Option<Vec<u8>>, ReadError> {
    let path = format!("/{name}");
    if !cfb.is_stream(&path) {
        return Ok(None);
    }
    let mut data = Vec::new();
    cfb.open_stream(&path)
        .and_then(|mut stream| stream.read_to_end(&mut data))
        .map_err(|e| corrupt(format!("failed to read {name} stream: {e}")))?;
    Ok(Some(data))
}

fn u16_at(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

// ────────────────────────────────────────────────────────────────────────────
// Piece table
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Piece {
    chars: usize,
    fc: u32,
}

fn parse_pieces(clx: &[u8]) -> Result<Vec<Piece>, String> {
    let mut pos = 0usize;
    loop {
        match clx.get(pos) {
            // Prc: property modifiers, skipped.
            Some(0x01) => {
                let cb = u16_at(clx, pos + 1).ok_or("truncated CLX")? as usize;
                pos += 3 + cb;
            }
            Some(0x02) => break,
            Some(other) => return Err(format!("unexpected CLX entry {other:#04x}")),
            None => return Err("CLX has no piece table".to_string()),
        }
    }

    let lcb = u32_at(clx, pos + 1).ok_or("truncated piece table")? as usize;
    let plc = clx
        .get(pos + 5..pos + 5 + lcb)
        .ok_or("piece table runs past the CLX")?;
    if lcb < 4 || (lcb - 4) % 12 != 0 {
        return Err(format!("piece table has invalid size {lcb}"));
    }

    let count = (lcb - 4) / 12;
    let descriptors = 4 * (count + 1);
    let mut pieces = Vec::with_capacity(count);
    for i in 0..count {
        let cp_start = u32_at(plc, i * 4).ok_or("truncated piece table")?;
        let cp_end = u32_at(plc, (i + 1) * 4).ok_or("truncated piece table")?;
        let fc = u32_at(plc, descriptors + i * 8 + 2).ok_or("truncated piece table")?;
        if cp_end < cp_start {
            return Err("piece table positions are not ascending".to_string());
        }
        pieces.push(Piece {
            chars: (cp_end - cp_start) as usize,
            fc,
        });
    }
    Ok(pieces)
}

fn decode_pieces(word: &[u8], pieces: &[Piece]) -> Result<String, String> {
    let mut text = String::new();
    for piece in pieces {
        if piece.fc & PIECE_COMPRESSED != 0 {
            let offset = ((piece.fc & !PIECE_COMPRESSED) / 2) as usize;
            let bytes = word
                .get(offset..offset + piece.chars)
                .ok_or("text piece lies outside the WordDocument stream")?;
            text.extend(bytes.iter().map(|&b| cp1252_char(b)));
        } else {
            let offset = piece.fc as usize;
            let bytes = word
                .get(offset..offset + piece.chars * 2)
                .ok_or("text piece lies outside the WordDocument stream")?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();
            text.push_str(&String::from_utf16_lossy(&units));
        }
    }
    Ok(text)
}

fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => char::from(byte),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Special characters and fields
// ────────────────────────────────────────────────────────────────────────────

struct OpenField {
    instruction: String,
    in_instruction: bool,
}

/// Turns Word's internal character stream into a plain transcript.
fn render(raw: &str) -> RawDocument {
    let mut text = String::with_capacity(raw.len());
    let mut hyperlinks = Vec::new();
    let mut fields: Vec<OpenField> = Vec::new();

    for c in raw.chars() {
        match c {
            FIELD_BEGIN => fields.push(OpenField {
                instruction: String::new(),
                in_instruction: true,
            }),
            FIELD_SEPARATOR => {
                if let Some(field) = fields.last_mut() {
                    finish_instruction(field, &mut hyperlinks);
                }
            }
            FIELD_END => {
                if let Some(mut field) = fields.pop() {
                    finish_instruction(&mut field, &mut hyperlinks);
                }
            }
            _ if fields.last().is_some_and(|f| f.in_instruction) => {
                if let Some(field) = fields.last_mut() {
                    field.instruction.push(c);
                }
            }
            // paragraph end, line break, page/section break
            '\r' | '\u{0B}' | '\u{0C}' => text.push('\n'),
            // table cell / row end
            '\u{07}' => text.push('\t'),
            // non-breaking hyphen
            '\u{1E}' => text.push('-'),
            '\u{A0}' => text.push(' '),
            '\t' | '\n' => text.push(c),
            c if c.is_control() => {}
            c => text.push(c),
        }
    }

    RawDocument { text, hyperlinks }
}

fn finish_instruction(field: &mut OpenField, hyperlinks: &mut Vec<String>) {
    if field.in_instruction {
        field.in_instruction = false;
        hyperlinks.extend(hyperlink_from_field(&field.instruction));
    }
}
