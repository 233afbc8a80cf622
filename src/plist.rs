//! Apple binary property lists (`bplist00`).
//!
//! Layout: an 8-byte magic, the objects, an offset table, and a 32-byte
//! trailer at the very end:
//!
//! ```text
//! [6]  unused
//! [1]  offset table entry width
//! [1]  object reference width
//! [8]  object count
//! [8]  root object index
//! [8]  offset table offset
//! ```
//!
//! Nothing in the format prevents an array or dict from referencing one of
//! its ancestors. Such references decode to [`PlistValue::Cycle`] instead
//! of being followed. Shared references are expanded at each use, up to
//! [`MAX_OBJECTS`] decoded objects in total.

use crate::cursor::{ByteCursor, Endian, TextEncoding};
use crate::error::{DecodeError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use std::fmt::Write;
use std::io::Cursor;

pub const MAGIC: &[u8; 6] = b"bplist";
const TRAILER_LEN: u64 = 32;
/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
const APPLE_EPOCH_OFFSET: f64 = 978_307_200.0;
/// Deepest array/dict nesting followed before giving up.
pub const MAX_DEPTH: usize = 512;
/// Most objects one parse may produce. Shared references are expanded
/// per use, so a chain of arrays that each reference the next twice grows
/// exponentially without this cap.
pub const MAX_OBJECTS: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlistValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Seconds since 2001-01-01T00:00:00Z.
    Date(f64),
    Data(Vec<u8>),
    String(String),
    Uid(u64),
    Array(Vec<PlistValue>),
    Set(Vec<PlistValue>),
    Dict(Vec<(String, PlistValue)>),
    /// Reference to an ancestor object; carries the object index.
    Cycle(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyList {
    root: PlistValue,
}

struct Trailer {
    offset_size: u8,
    ref_size: u8,
    object_count: u64,
    root_object: u64,
    offset_table: u64,
}

pub fn is_bplist(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

pub fn parse(bytes: &[u8]) -> Result<PropertyList> {
    if !is_bplist(bytes) {
        return Err(DecodeError::InvalidFormat("missing bplist magic".into()));
    }
    let mut r = ByteCursor::from_buffer(bytes, Endian::Big);
    let len = bytes.len() as u64;
    if len < 8 + TRAILER_LEN {
        return Err(DecodeError::InvalidFormat(format!("{} bytes is too short for a bplist", len)));
    }

    let trailer_start = len - TRAILER_LEN;
    let trailer = r.read_at(trailer_start + 6, |c| {
        Ok(Trailer {
            offset_size: c.read_u8()?,
            ref_size: c.read_u8()?,
            object_count: c.read_u64()?,
            root_object: c.read_u64()?,
            offset_table: c.read_u64()?,
        })
    })?;

    if !(1..=8).contains(&trailer.offset_size) || !(1..=8).contains(&trailer.ref_size) {
        return Err(DecodeError::InvalidFormat(format!(
            "unsupported integer widths: offsets {} refs {}",
            trailer.offset_size, trailer.ref_size
        )));
    }
    let table_len = trailer
        .object_count
        .checked_mul(trailer.offset_size as u64)
        .ok_or_else(|| DecodeError::InvalidFormat("object count overflows".into()))?;
    if trailer.offset_table < 8 || trailer.offset_table.saturating_add(table_len) > trailer_start {
        return Err(DecodeError::InvalidFormat("offset table lies outside the object area".into()));
    }
    if trailer.root_object >= trailer.object_count {
        return Err(DecodeError::InvalidFormat(format!(
            "root object {} not among {} objects",
            trailer.root_object, trailer.object_count
        )));
    }

    r.seek(trailer.offset_table)?;
    let mut offsets = Vec::new();
    for _ in 0..trailer.object_count {
        offsets.push(read_sized_uint(&mut r, trailer.offset_size)?);
    }

    let mut reader = ObjectReader {
        r,
        offsets,
        ref_size: trailer.ref_size,
        limit: trailer.offset_table,
        ancestors: Vec::new(),
        decoded: 0,
    };
    let root = reader.object(trailer.root_object)?;
    Ok(PropertyList { root })
}

struct ObjectReader<'a> {
    r: ByteCursor<Cursor<&'a [u8]>>,
    offsets: Vec<u64>,
    ref_size: u8,
    /// Objects must start before the offset table.
    limit: u64,
    /// Indices of the arrays/dicts currently being decoded.
    ancestors: Vec<u64>,
    decoded: usize,
}

impl ObjectReader<'_> {
    fn object(&mut self, index: u64) -> Result<PlistValue> {
        if self.ancestors.contains(&index) {
            log::debug!("bplist object {} refers to an ancestor", index);
            return Ok(PlistValue::Cycle(index));
        }
        if self.ancestors.len() >= MAX_DEPTH {
            return Err(DecodeError::InvalidFormat(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }
        self.decoded += 1;
        if self.decoded > MAX_OBJECTS {
            return Err(DecodeError::InvalidFormat(format!("expands to more than {} objects", MAX_OBJECTS)));
        }
        let offset = *self
            .offsets
            .get(index as usize)
            .ok_or_else(|| DecodeError::InvalidFormat(format!("object reference {} out of range", index)))?;
        if offset < 8 || offset >= self.limit {
            return Err(DecodeError::InvalidFormat(format!("object {} at bad offset {}", index, offset)));
        }
        self.r.seek(offset)?;

        let marker = self.r.read_u8()?;
        let low = marker & 0x0F;
        match marker >> 4 {
            0x0 => match marker {
                0x00 | 0x0F => Ok(PlistValue::Null),
                0x08 => Ok(PlistValue::Bool(false)),
                0x09 => Ok(PlistValue::Bool(true)),
                _ => Err(unknown_marker(marker, offset)),
            },
            0x1 => Ok(PlistValue::Int(self.int_body(low)?)),
            0x2 => match low {
                2 => Ok(PlistValue::Real(self.r.read_f32()? as f64)),
                3 => Ok(PlistValue::Real(self.r.read_f64()?)),
                _ => Err(unknown_marker(marker, offset)),
            },
            0x3 if marker == 0x33 => Ok(PlistValue::Date(self.r.read_f64()?)),
            0x4 => {
                let n = self.count(low)?;
                Ok(PlistValue::Data(self.r.read_bytes(n)?))
            }
            0x5 => {
                let n = self.count(low)?;
                Ok(PlistValue::String(self.r.read_string(n, TextEncoding::Ascii)?))
            }
            0x6 => {
                let n = self.count(low)?;
                let bytes = self.r.read_bytes(n.saturating_mul(2))?;
                Ok(PlistValue::String(TextEncoding::Utf16Be.decode(&bytes)))
            }
            0x8 => Ok(PlistValue::Uid(read_sized_uint(&mut self.r, low + 1)?)),
            0xA | 0xC => {
                let n = self.count(low)?;
                let refs = self.refs(n)?;
                let items = self.children(index, &refs)?;
                Ok(if marker >> 4 == 0xA { PlistValue::Array(items) } else { PlistValue::Set(items) })
            }
            0xD => {
                let n = self.count(low)?;
                let key_refs = self.refs(n)?;
                let value_refs = self.refs(n)?;
                let keys = self.children(index, &key_refs)?;
                let values = self.children(index, &value_refs)?;
                Ok(PlistValue::Dict(keys.into_iter().map(key_string).zip(values).collect()))
            }
            _ => Err(unknown_marker(marker, offset)),
        }
    }

    fn children(&mut self, parent: u64, refs: &[u64]) -> Result<Vec<PlistValue>> {
        self.ancestors.push(parent);
        let out = refs.iter().map(|&i| self.object(i)).collect();
        self.ancestors.pop();
        out
    }

    /// Integer body after a `0x1n` marker: 2^n big-endian bytes.
    fn int_body(&mut self, low: u8) -> Result<i64> {
        match low {
            0 => Ok(self.r.read_u8()? as i64),
            1 => Ok(self.r.read_u16()? as i64),
            2 => Ok(self.r.read_u32()? as i64),
            3 => self.r.read_i64(),
            // 128-bit: keep the low 64 bits
            4 => {
                self.r.skip(8)?;
                self.r.read_i64()
            }
            _ => Err(DecodeError::InvalidFormat(format!("integer width 2^{} not supported", low))),
        }
    }

    /// Element count from the marker's low nibble, or from a following
    /// integer object when the nibble is 0xF.
    fn count(&mut self, low: u8) -> Result<usize> {
        if low != 0x0F {
            return Ok(low as usize);
        }
        let marker = self.r.read_u8()?;
        if marker >> 4 != 0x1 {
            return Err(DecodeError::InvalidFormat(format!("expected integer count, found marker {:#04x}", marker)));
        }
        let n = self.int_body(marker & 0x0F)?;
        usize::try_from(n).map_err(|_| DecodeError::InvalidFormat(format!("negative count {}", n)))
    }

    fn refs(&mut self, n: usize) -> Result<Vec<u64>> {
        let needed = (n as u64).saturating_mul(self.ref_size as u64);
        if self.r.position().saturating_add(needed) > self.limit {
            return Err(DecodeError::OutOfBounds {
                offset: self.r.position(),
                requested: needed,
                available: self.limit.saturating_sub(self.r.position()),
            });
        }
        (0..n).map(|_| read_sized_uint(&mut self.r, self.ref_size)).collect()
    }
}

fn read_sized_uint(r: &mut ByteCursor<Cursor<&[u8]>>, width: u8) -> Result<u64> {
    let bytes = r.read_bytes(width as usize)?;
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

fn unknown_marker(marker: u8, offset: u64) -> DecodeError {
    DecodeError::InvalidFormat(format!("unknown object marker {:#04x} at offset {}", marker, offset))
}

fn key_string(v: PlistValue) -> String {
    match v {
        PlistValue::String(s) => s,
        other => {
            let mut s = String::new();
            write_xml(&other, &mut s);
            s
        }
    }
}

impl PropertyList {
    pub fn root(&self) -> &PlistValue {
        &self.root
    }

    /// Looks up a key of the root dict.
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        match &self.root {
            PlistValue::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Compact XML form: `<plist version="1.0">` followed by one element per
    /// value, no whitespace between elements. Sets are written as arrays.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<plist version=\"1.0\">");
        write_xml(&self.root, &mut out);
        out.push_str("</plist>");
        out
    }
}

fn write_xml(v: &PlistValue, out: &mut String) {
    match v {
        PlistValue::Null => out.push_str("<null/>"),
        PlistValue::Bool(true) => out.push_str("<true/>"),
        PlistValue::Bool(false) => out.push_str("<false/>"),
        PlistValue::Int(i) => {
            let _ = write!(out, "<integer>{}</integer>", i);
        }
        PlistValue::Real(f) => {
            let _ = write!(out, "<real>{}</real>", f);
        }
        PlistValue::Date(secs) => {
            let _ = write!(out, "<date>{}</date>", format_date(*secs));
        }
        PlistValue::Data(bytes) => {
            let _ = write!(out, "<data>{}</data>", BASE64.encode(bytes));
        }
        PlistValue::String(s) => {
            out.push_str("<string>");
            escape_into(s, out);
            out.push_str("</string>");
        }
        PlistValue::Uid(u) => {
            let _ = write!(out, "<dict><key>CF$UID</key><integer>{}</integer></dict>", u);
        }
        PlistValue::Array(items) | PlistValue::Set(items) => {
            out.push_str("<array>");
            items.iter().for_each(|i| write_xml(i, out));
            out.push_str("</array>");
        }
        PlistValue::Dict(entries) => {
            out.push_str("<dict>");
            for (k, v) in entries {
                out.push_str("<key>");
                escape_into(k, out);
                out.push_str("</key>");
                write_xml(v, out);
            }
            out.push_str("</dict>");
        }
        PlistValue::Cycle(_) => out.push_str("<cycle/>"),
    }
}

fn format_date(secs: f64) -> String {
    let unix = secs + APPLE_EPOCH_OFFSET;
    let whole = unix.floor();
    let nanos = ((unix - whole) * 1e9) as u32;
    if !whole.is_finite() || whole.abs() > i64::MAX as f64 {
        return secs.to_string();
    }
    match chrono::DateTime::from_timestamp(whole as i64, nanos) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => secs.to_string(),
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}
