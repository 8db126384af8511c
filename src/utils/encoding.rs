use std::io::{self, Read, Write};

use crate::index::types::{DocId, Posting, TermCount, TermId};

/// Encode a u64 as a LEB128 variable-length integer
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 64 {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Reads varints one after another, failing on truncation or overflow
struct VarintCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> VarintCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn next_u32(&mut self) -> Option<u32> {
        let (value, consumed) = decode_varint(&self.buf[self.pos..])?;
        self.pos += consumed;
        u32::try_from(value).ok()
    }
}

/// Encode a postings list as (doc id delta, count) varint pairs.
/// The list must already be ascending by doc id.
pub fn encode_postings(postings: &[Posting], buf: &mut Vec<u8>) {
    let mut prev: DocId = 0;
    for p in postings {
        encode_varint((p.doc_id - prev) as u64, buf);
        encode_varint(p.count as u64, buf);
        prev = p.doc_id;
    }
}

/// Decode a postings list produced by [`encode_postings`].
/// Returns `None` if the bytes are truncated, a doc id overflows or repeats.
pub fn decode_postings(buf: &[u8]) -> Option<Vec<Posting>> {
    let mut cursor = VarintCursor::new(buf);
    let mut postings = Vec::new();
    let mut prev: DocId = 0;

    while !cursor.at_end() {
        let delta = cursor.next_u32()?;
        let count = cursor.next_u32()?;
        // Doc ids are strictly ascending
        if delta == 0 && !postings.is_empty() {
            return None;
        }
        prev = prev.checked_add(delta)?;
        postings.push(Posting { doc_id: prev, count });
    }

    Some(postings)
}

/// Encode a forward vector as (term id, count) varint pairs in the given order
pub fn encode_vector(terms: &[TermCount], buf: &mut Vec<u8>) {
    for t in terms {
        encode_varint(t.term_id as u64, buf);
        encode_varint(t.count as u64, buf);
    }
}

/// Decode a forward vector produced by [`encode_vector`]
pub fn decode_vector(buf: &[u8]) -> Option<Vec<TermCount>> {
    let mut cursor = VarintCursor::new(buf);
    let mut terms = Vec::new();

    while !cursor.at_end() {
        let term_id: TermId = cursor.next_u32()?;
        let count = cursor.next_u32()?;
        terms.push(TermCount { term_id, count });
    }

    Some(terms)
}

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u32 in little-endian format
pub fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u64 in little-endian format
pub fn read_u64_le<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write a u16 in little-endian format
pub fn write_u16_le<W: Write>(writer: &mut W, value: u16) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u16 in little-endian format
pub fn read_u16_le<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}
