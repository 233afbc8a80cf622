//! Turning raw tag values into human-readable text.
//!
//! Every directory is bound to a static [`Vocabulary`]: its display name and
//! one [`TagDef`] per known tag. Each definition picks a [`Rule`]; format
//! modules add new vocabularies without touching this file, and anything a
//! table cannot express goes through [`Rule::Custom`].

use crate::directory::Directory;

/// Describes one tag of a vocabulary.
#[derive(Debug)]
pub struct TagDef {
    pub id: i32,
    pub name: &'static str,
    pub rule: Rule,
}

#[derive(Debug)]
pub enum Rule {
    /// Render the stored value as-is.
    Raw,
    /// Small integer to label. Unknown values render as `Illegal value 0x..`.
    Enum(&'static [(i64, &'static str)]),
    /// Zero-padded upper-case hex with the given digit count.
    BitMask { digits: usize },
    /// `labels[value - base]`, absent when out of range.
    Indexed {
        base: i64,
        labels: &'static [&'static str],
    },
    /// Unsigned 16.16 fixed point.
    Fixed1616,
    /// Value followed by a unit, e.g. `"640 pixels"`.
    Suffix(&'static str),
    /// Length of a byte array, e.g. `"2048 bytes"`.
    ByteLength,
    Custom(fn(&Directory, i32) -> Option<String>),
}

/// The tag names and description rules of one directory type.
///
/// Vocabularies are declared as `static` items; directory type checks
/// compare their addresses.
#[derive(Debug)]
pub struct Vocabulary {
    pub name: &'static str,
    pub tags: &'static [TagDef],
}

impl Vocabulary {
    pub fn tag_def(&self, id: i32) -> Option<&'static TagDef> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn tag_name(&self, id: i32) -> Option<&'static str> {
        self.tag_def(id).map(|t| t.name)
    }

    /// Description of `id` in `dir`. Tags without a rule fall back to the
    /// value's generic rendering.
    pub fn describe(&self, dir: &Directory, id: i32) -> Option<String> {
        match self.tag_def(id) {
            Some(def) => def.rule.describe(dir, id),
            None => dir.get(id).map(|v| v.to_string()),
        }
    }
}

impl Rule {
    pub fn describe(&self, dir: &Directory, id: i32) -> Option<String> {
        match self {
            Rule::Raw => dir.get(id).map(|v| v.to_string()),
            Rule::Enum(table) => dir.get_i64(id).map(|v| enum_description(v, table)),
            Rule::BitMask { digits } => dir.get_i64(id).map(|v| format_hex(v, *digits)),
            Rule::Indexed { base, labels } => {
                indexed_description(dir.get_i64(id)?, *base, labels).map(str::to_string)
            }
            Rule::Fixed1616 => dir.get_i64(id).map(|v| format_fixed_16_16(v as u32)),
            Rule::Suffix(unit) => dir.get_string(id).map(|s| format!("{} {}", s, unit)),
            Rule::ByteLength => dir.get_bytes(id).map(|b| format!("{} bytes", b.len())),
            Rule::Custom(f) => f(dir, id),
        }
    }
}

/// Hex digits of a value the way a 32-bit field would print it: negative
/// values that fit in `i32` are shown as their two's complement.
fn unsigned_width(value: i64) -> u64 {
    if value < 0 && value >= i32::MIN as i64 {
        value as i32 as u32 as u64
    } else {
        value as u64
    }
}

pub fn illegal_value(value: i64) -> String {
    format!("Illegal value 0x{:x}", unsigned_width(value))
}

pub fn enum_description(value: i64, table: &[(i64, &str)]) -> String {
    table
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| illegal_value(value))
}

/// `format_hex(255, 8)` is `"0x000000FF"`.
pub fn format_hex(value: i64, digits: usize) -> String {
    format!("0x{:0width$X}", unsigned_width(value), width = digits)
}

pub fn indexed_description<'a>(value: i64, base: i64, labels: &[&'a str]) -> Option<&'a str> {
    let index = value.checked_sub(base)?;
    usize::try_from(index).ok().and_then(|i| labels.get(i).copied())
}

/// `value / 65536` with at most three decimals and no trailing zeros.
pub fn format_fixed_16_16(value: u32) -> String {
    format_decimal(value as f64 / 65536.0, 3)
}

pub(crate) fn format_decimal(value: f64, max_decimals: usize) -> String {
    let s = format!("{:.*}", max_decimals, value);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        &s
    };
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
