//! DBC binary decode/encode.
//!
//! A DBC file is a 20-byte header, `record_count` rows of exactly
//! `record_size` bytes, and a string block. Rows hold little-endian
//! 4-byte slots; string-typed slots store byte offsets into the block,
//! where offset 0 is always the empty string. The schema's field list
//! fixes how each row's slots are interpreted.
//!
//! Encoding deduplicates strings: within one encode call, every
//! distinct string is appended to the block once and all rows
//! referencing it share the offset. The dedup table lives only for the
//! duration of the call.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::meta::{FieldKind, TableMeta};
use crate::model::{LocValue, Record, Value};

/// Magic literal at the start of every DBC file.
pub const DBC_MAGIC: &[u8; 4] = b"WDBC";

/// Header size in bytes: magic + four u32 fields.
pub const HEADER_SIZE: usize = 20;

/// DBC file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbcHeader {
    /// Number of rows in the record section.
    pub record_count: u32,
    /// Binary slots per row.
    pub field_count: u32,
    /// Row stride in bytes; always a multiple of 4.
    pub record_size: u32,
    /// String block length in bytes.
    pub string_block_size: u32,
}

impl DbcHeader {
    /// Parse a header from the start of a buffer.
    ///
    /// `origin` names the file in error messages.
    ///
    /// # Errors
    ///
    /// Returns a format error if the buffer is shorter than a header or
    /// the magic does not match.
    pub fn from_bytes(bytes: &[u8], origin: &str) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::format(
                origin,
                format!(
                    "file is {} bytes, smaller than the {HEADER_SIZE}-byte header",
                    bytes.len()
                ),
            ));
        }
        if &bytes[0..4] != DBC_MAGIC {
            return Err(Error::format(
                origin,
                format!("bad magic {:?}, expected \"WDBC\"", &bytes[0..4]),
            ));
        }

        Ok(Self {
            record_count: read_u32(bytes, 4),
            field_count: read_u32(bytes, 8),
            record_size: read_u32(bytes, 12),
            string_block_size: read_u32(bytes, 16),
        })
    }

    /// Serialize the header, magic included.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(DBC_MAGIC);
        out[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        out[8..12].copy_from_slice(&self.field_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.record_size.to_le_bytes());
        out[16..20].copy_from_slice(&self.string_block_size.to_le_bytes());
        out
    }
}

/// Read a u32 slot; the caller has already validated bounds.
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

/// Parse only the header of a DBC buffer.
///
/// # Errors
///
/// Returns a format error on a short buffer or bad magic.
pub fn read_header(bytes: &[u8], origin: &str) -> Result<DbcHeader> {
    DbcHeader::from_bytes(bytes, origin)
}

// ── Decode ────────────────────────────────────────────────────

/// Decode a DBC buffer into records, preserving on-disk row order.
///
/// # Errors
///
/// Returns a format error on bad magic, a buffer length inconsistent
/// with the header, a stride that does not match the schema, or a
/// string reference without a terminator inside the block.
pub fn decode(bytes: &[u8], meta: &TableMeta) -> Result<Vec<Record>> {
    let origin = meta.file.as_str();
    let header = DbcHeader::from_bytes(bytes, origin)?;

    let record_count = header.record_count as usize;
    let record_size = header.record_size as usize;
    let block_size = header.string_block_size as usize;

    let expected = record_count
        .checked_mul(record_size)
        .and_then(|body| body.checked_add(HEADER_SIZE))
        .and_then(|n| n.checked_add(block_size))
        .ok_or_else(|| Error::format(origin, "header sizes overflow"))?;
    if bytes.len() != expected {
        return Err(Error::format(
            origin,
            format!(
                "file is {} bytes but header implies {expected} ({record_count} records x {record_size} bytes + {block_size} string bytes)",
                bytes.len()
            ),
        ));
    }
    if header.record_size != meta.record_size() {
        return Err(Error::format(
            origin,
            format!(
                "record size {} does not match schema stride {}",
                header.record_size,
                meta.record_size()
            ),
        ));
    }

    let rows = &bytes[HEADER_SIZE..HEADER_SIZE + record_count * record_size];
    let block = &bytes[HEADER_SIZE + record_count * record_size..];

    let logical = meta.logical_fields();
    let mut records = Vec::with_capacity(record_count);

    for row in rows.chunks_exact(record_size) {
        let mut cur = 0usize;
        let mut values = Vec::with_capacity(logical.len());
        for lf in &logical {
            match lf.kind {
                FieldKind::Int32 => {
                    values.push(Value::Int32(read_u32(row, cur) as i32));
                    cur += 4;
                }
                FieldKind::Uint32 => {
                    values.push(Value::Uint32(read_u32(row, cur)));
                    cur += 4;
                }
                FieldKind::Float => {
                    values.push(Value::Float(f32::from_le_bytes(
                        row[cur..cur + 4].try_into().unwrap(),
                    )));
                    cur += 4;
                }
                FieldKind::Text => {
                    let offset = read_u32(row, cur);
                    values.push(Value::Text(read_block_string(block, offset, origin)?));
                    cur += 4;
                }
                FieldKind::Loc => {
                    let mut loc = LocValue::default();
                    for s in &mut loc.strings {
                        *s = read_block_string(block, read_u32(row, cur), origin)?;
                        cur += 4;
                    }
                    loc.flags = read_u32(row, cur);
                    cur += 4;
                    values.push(Value::Loc(loc));
                }
            }
        }
        records.push(Record::new(values));
    }

    Ok(records)
}

/// Dereference a string-block offset into an owned string.
fn read_block_string(block: &[u8], offset: u32, origin: &str) -> Result<String> {
    let start = offset as usize;
    if start >= block.len() {
        return Err(Error::format(
            origin,
            format!(
                "string offset {offset} is past the {}-byte string block",
                block.len()
            ),
        ));
    }
    let len = block[start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| {
            Error::format(
                origin,
                format!("unterminated string at offset {offset} in string block"),
            )
        })?;
    String::from_utf8(block[start..start + len].to_vec())
        .map_err(|_| Error::format(origin, format!("invalid UTF-8 in string at offset {offset}")))
}

// ── Encode ────────────────────────────────────────────────────

/// String block under construction: offset 0 is reserved for the empty
/// string, and every distinct string is appended exactly once.
struct StringBlock {
    bytes: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringBlock {
    fn new() -> Self {
        let mut offsets = HashMap::new();
        offsets.insert(String::new(), 0);
        Self {
            bytes: vec![0],
            offsets,
        }
    }

    /// Offset of `s` in the block, appending it on first sight.
    fn intern(&mut self, s: &str) -> Result<u32> {
        if let Some(&off) = self.offsets.get(s) {
            return Ok(off);
        }
        let off = u32::try_from(self.bytes.len())
            .map_err(|_| Error::Internal("string block exceeds 4 GiB".to_string()))?;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(s.to_string(), off);
        Ok(off)
    }
}

/// Encode records into a complete DBC buffer.
///
/// Rows are emitted in input order; callers that need sorted output
/// must pre-sort. The header is recomputed from the schema and the
/// emitted data.
///
/// # Errors
///
/// Returns an internal error if a record's values do not line up with
/// the schema; that indicates a bug upstream, not bad user input.
pub fn encode(records: &[Record], meta: &TableMeta) -> Result<Vec<u8>> {
    let logical = meta.logical_fields();
    let record_size = meta.record_size();
    if record_size % 4 != 0 {
        return Err(Error::Internal(format!(
            "record stride {record_size} is not a multiple of 4"
        )));
    }

    let mut block = StringBlock::new();
    let mut rows: Vec<u8> = Vec::with_capacity(records.len() * record_size as usize);

    for (idx, rec) in records.iter().enumerate() {
        if rec.len() != logical.len() {
            return Err(Error::Internal(format!(
                "record {idx} has {} values, schema expects {}",
                rec.len(),
                logical.len()
            )));
        }
        for (lf, value) in logical.iter().zip(&rec.values) {
            match (lf.kind, value) {
                (FieldKind::Int32, Value::Int32(v)) => rows.extend_from_slice(&v.to_le_bytes()),
                (FieldKind::Uint32, Value::Uint32(v)) => rows.extend_from_slice(&v.to_le_bytes()),
                (FieldKind::Float, Value::Float(v)) => rows.extend_from_slice(&v.to_le_bytes()),
                (FieldKind::Text, Value::Text(s)) => {
                    rows.extend_from_slice(&block.intern(s)?.to_le_bytes());
                }
                (FieldKind::Loc, Value::Loc(loc)) => {
                    for s in &loc.strings {
                        rows.extend_from_slice(&block.intern(s)?.to_le_bytes());
                    }
                    rows.extend_from_slice(&loc.flags.to_le_bytes());
                }
                (kind, value) => {
                    return Err(Error::Internal(format!(
                        "record {idx}: {} value in field `{}` declared {}",
                        value.kind().wire_name(),
                        lf.name,
                        kind.wire_name()
                    )));
                }
            }
        }
    }

    let header = DbcHeader {
        record_count: u32::try_from(records.len())
            .map_err(|_| Error::Internal("record count exceeds u32".to_string()))?,
        field_count: meta.field_count(),
        record_size,
        string_block_size: u32::try_from(block.bytes.len())
            .map_err(|_| Error::Internal("string block exceeds 4 GiB".to_string()))?,
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + rows.len() + block.bytes.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&rows);
    out.extend_from_slice(&block.bytes);
    Ok(out)
}
