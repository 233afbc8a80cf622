//! JPEG Huffman table (DHT) decoding and the typical/optimized classifier.
//!
//! An encoder that reuses the example tables from ITU-T T.81 Annex K.3
//! writes "typical" tables; one that builds tables from the image's own
//! symbol statistics writes "optimized" ones.

use crate::cursor::ByteCursor;
use crate::descriptor::{Rule, TagDef, Vocabulary};
use crate::directory::{Directory, StructuredValue};
use crate::error::Result;
use serde::Serialize;
use std::io::Read;

pub const TAG_NUMBER_OF_TABLES: i32 = 1;
pub const TAG_TABLES: i32 = 2;

pub static HUFFMAN_TABLES: Vocabulary = Vocabulary {
    name: "Huffman",
    tags: &[
        TagDef { id: TAG_NUMBER_OF_TABLES, name: "Number of Tables", rule: Rule::Custom(describe_table_count) },
        TagDef { id: TAG_TABLES, name: "Tables", rule: Rule::Custom(describe_tables) },
    ],
};

/// Reference tables from ITU-T T.81 (09/92) Annex K.3, tables K.3 to K.6.
pub mod reference {
    pub const LUMINANCE_DC_LENGTHS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
    pub const LUMINANCE_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

    pub const CHROMINANCE_DC_LENGTHS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
    pub const CHROMINANCE_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

    pub const LUMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7d];
    pub const LUMINANCE_AC_VALUES: &[u8] = &[
        0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
        0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08, 0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
        0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
        0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
        0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
        0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
        0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
        0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
        0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
        0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
        0xf9, 0xfa,
    ];

    pub const CHROMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
    pub const CHROMINANCE_AC_VALUES: &[u8] = &[
        0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
        0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
        0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34, 0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
        0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
        0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
        0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
        0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
        0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
        0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
        0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
        0xf9, 0xfa,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableClass {
    Dc,
    Ac,
    Unknown,
}

impl TableClass {
    fn from_nibble(v: u8) -> Self {
        match v {
            0 => TableClass::Dc,
            1 => TableClass::Ac,
            _ => TableClass::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuffmanTable {
    pub class: TableClass,
    pub destination_id: u8,
    /// Number of codes of each length 1..=16.
    pub lengths: [u8; 16],
    pub values: Vec<u8>,
}

impl HuffmanTable {
    pub fn is_typical(&self) -> bool {
        use reference::*;
        let matches = |lengths: &[u8; 16], values: &[u8]| &self.lengths == lengths && self.values == values;
        match self.class {
            TableClass::Dc => {
                matches(&LUMINANCE_DC_LENGTHS, &LUMINANCE_DC_VALUES)
                    || matches(&CHROMINANCE_DC_LENGTHS, &CHROMINANCE_DC_VALUES)
            }
            TableClass::Ac => {
                matches(&LUMINANCE_AC_LENGTHS, LUMINANCE_AC_VALUES)
                    || matches(&CHROMINANCE_AC_LENGTHS, CHROMINANCE_AC_VALUES)
            }
            TableClass::Unknown => false,
        }
    }

    pub fn is_optimized(&self) -> bool {
        !self.is_typical()
    }
}

/// Reads every table of one DHT segment payload.
///
/// Tables read before a truncation are kept in `tables`; the error is
/// returned for the caller to record.
pub fn read_tables<R: Read>(r: &mut ByteCursor<R>, tables: &mut Vec<HuffmanTable>) -> Result<()> {
    while r.remaining().unwrap_or(0) > 0 {
        let header = r.read_u8()?;
        let lengths = r.read_array::<16>()?;
        let count: usize = lengths.iter().map(|&n| n as usize).sum();
        let values = r.read_bytes(count)?;
        tables.push(HuffmanTable {
            class: TableClass::from_nibble(header >> 4),
            destination_id: header & 0x0F,
            lengths,
            values,
        });
    }
    Ok(())
}

pub fn tables(dir: &Directory) -> &[HuffmanTable] {
    match dir.get_structured(TAG_TABLES) {
        Some(StructuredValue::HuffmanTables(t)) => t,
        _ => &[],
    }
}

/// True when there is at least one table and every table is typical.
pub fn is_typical(dir: &Directory) -> bool {
    let t = tables(dir);
    !t.is_empty() && t.iter().all(HuffmanTable::is_typical)
}

pub fn is_optimized(dir: &Directory) -> bool {
    !is_typical(dir)
}

fn describe_table_count(dir: &Directory, tag: i32) -> Option<String> {
    let n = dir.get_i64(tag)?;
    Some(format!("{} Huffman table{}", n, if n == 1 { "" } else { "s" }))
}

fn describe_tables(dir: &Directory, _tag: i32) -> Option<String> {
    if tables(dir).is_empty() {
        return None;
    }
    Some(if is_typical(dir) { "Typical" } else { "Optimized" }.to_string())
}
