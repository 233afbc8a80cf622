//! JPEG marker segments up to the first scan: frame headers (SOFn) and
//! Huffman tables (DHT).

use super::open_source;
use crate::cursor::{ByteCursor, Endian};
use crate::descriptor::{Rule, TagDef, Vocabulary};
use crate::directory::{Directory, DirectoryId, StructuredValue, TagValue};
use crate::error::{DecodeError, Result};
use crate::huffman::{self, HUFFMAN_TABLES, HuffmanTable};
use crate::metadata::Metadata;
use std::io::{Read, Seek};

pub const TAG_COMPRESSION_TYPE: i32 = -3;
pub const TAG_DATA_PRECISION: i32 = 0;
pub const TAG_IMAGE_HEIGHT: i32 = 1;
pub const TAG_IMAGE_WIDTH: i32 = 3;
pub const TAG_NUMBER_OF_COMPONENTS: i32 = 5;
/// Components are stored at `TAG_COMPONENT_DATA_1 + index`, up to four.
pub const TAG_COMPONENT_DATA_1: i32 = 6;
pub const TAG_COMPONENT_DATA_2: i32 = 7;
pub const TAG_COMPONENT_DATA_3: i32 = 8;
pub const TAG_COMPONENT_DATA_4: i32 = 9;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const DHT: u8 = 0xC4;

pub static JPEG: Vocabulary = Vocabulary {
    name: "JPEG",
    tags: &[
        TagDef {
            id: TAG_COMPRESSION_TYPE,
            name: "Compression Type",
            rule: Rule::Enum(&[
                (0, "Baseline"),
                (1, "Extended sequential, Huffman"),
                (2, "Progressive, Huffman"),
                (3, "Lossless, Huffman"),
                (5, "Differential sequential, Huffman"),
                (6, "Differential progressive, Huffman"),
                (7, "Differential lossless, Huffman"),
                (9, "Extended sequential, arithmetic"),
                (10, "Progressive, arithmetic"),
                (11, "Lossless, arithmetic"),
                (13, "Differential sequential, arithmetic"),
                (14, "Differential progressive, arithmetic"),
                (15, "Differential lossless, arithmetic"),
            ]),
        },
        TagDef { id: TAG_DATA_PRECISION, name: "Data Precision", rule: Rule::Suffix("bits") },
        TagDef { id: TAG_IMAGE_HEIGHT, name: "Image Height", rule: Rule::Suffix("pixels") },
        TagDef { id: TAG_IMAGE_WIDTH, name: "Image Width", rule: Rule::Suffix("pixels") },
        TagDef { id: TAG_NUMBER_OF_COMPONENTS, name: "Number of Components", rule: Rule::Raw },
        TagDef { id: TAG_COMPONENT_DATA_1, name: "Component 1", rule: Rule::Custom(describe_component) },
        TagDef { id: TAG_COMPONENT_DATA_2, name: "Component 2", rule: Rule::Custom(describe_component) },
        TagDef { id: TAG_COMPONENT_DATA_3, name: "Component 3", rule: Rule::Custom(describe_component) },
        TagDef { id: TAG_COMPONENT_DATA_4, name: "Component 4", rule: Rule::Custom(describe_component) },
    ],
};

/// Components are stored as `[id, sampling factors byte, quantization table]`.
fn describe_component(dir: &Directory, tag: i32) -> Option<String> {
    let TagValue::Ints(parts) = dir.get(tag)? else {
        return None;
    };
    let &[id, sampling, table] = parts.as_slice() else {
        return None;
    };
    let name = match id {
        1 => "Y".to_string(),
        2 => "Cb".to_string(),
        3 => "Cr".to_string(),
        4 => "I".to_string(),
        5 => "Q".to_string(),
        other => format!("Unknown ({})", other),
    };
    Some(format!(
        "{} component: Quantization table {}, Sampling factors {} horiz/{} vert",
        name,
        table,
        sampling >> 4,
        sampling & 0x0F
    ))
}

fn is_sof(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, DHT | 0xC8 | 0xCC)
}

/// Markers that stand alone, without a length field.
fn is_standalone(marker: u8) -> bool {
    matches!(marker, 0x01 | 0xD0..=0xD7 | SOI)
}

pub fn read_metadata<R: Read + Seek>(r: &mut R) -> Result<Metadata> {
    let mut cur = open_source(r, Endian::Big)?;
    let mut reader = SegmentReader {
        metadata: Metadata::new(),
        jpeg: None,
        tables: Vec::new(),
        table_errors: Vec::new(),
    };
    if let Err(e) = reader.read_segments(&mut cur) {
        let dir = reader.jpeg_dir();
        reader.error(dir, e);
    }
    Ok(reader.finish())
}

struct SegmentReader {
    metadata: Metadata,
    jpeg: Option<DirectoryId>,
    tables: Vec<HuffmanTable>,
    table_errors: Vec<String>,
}

impl SegmentReader {
    fn jpeg_dir(&mut self) -> DirectoryId {
        match self.jpeg {
            Some(id) => id,
            None => {
                let id = self.metadata.add_directory(&JPEG, None);
                self.jpeg = Some(id);
                id
            }
        }
    }

    fn error(&mut self, dir: DirectoryId, e: impl std::fmt::Display) {
        if let Some(d) = self.metadata.directory_mut(dir) {
            d.add_error(e.to_string());
        }
    }

    fn read_segments<R: Read + Seek>(&mut self, r: &mut ByteCursor<R>) -> Result<()> {
        let soi = r.read_u16()?;
        if soi != 0xFF00 | SOI as u16 {
            return Err(DecodeError::InvalidFormat(format!("not a JPEG file (starts with {:#06x})", soi)));
        }

        loop {
            if r.remaining() == Some(0) {
                return Ok(());
            }
            let lead = r.read_u8()?;
            if lead != 0xFF {
                return Err(DecodeError::InvalidFormat(format!(
                    "expected marker at offset {}, found {:#04x}",
                    r.position() - 1,
                    lead
                )));
            }
            // Any number of 0xFF fill bytes may precede a marker.
            let mut marker = r.read_u8()?;
            while marker == 0xFF {
                marker = r.read_u8()?;
            }
            if is_standalone(marker) {
                continue;
            }
            if marker == EOI || marker == SOS {
                log::debug!("stopping at marker {:#04x}", marker);
                return Ok(());
            }

            let offset = r.position() - 2;
            let length = r.read_u16()?;
            if length < 2 {
                return Err(DecodeError::InvalidFormat(format!(
                    "segment {:#04x} at offset {} has invalid length {}",
                    marker, offset, length
                )));
            }
            let mut payload = r.bounded(length as u64 - 2)?;
            log::debug!("segment {:#04x} at offset {}, {} bytes", marker, offset, length);

            if marker == DHT {
                if let Err(e) = huffman::read_tables(&mut payload, &mut self.tables) {
                    self.table_errors.push(format!("DHT segment at offset {}: {}", offset, e));
                }
            } else if is_sof(marker) {
                let dir = self.jpeg_dir();
                if let Some(d) = self.metadata.directory_mut(dir) {
                    d.set(TAG_COMPRESSION_TYPE, marker - 0xC0);
                    if let Err(e) = read_frame_header(&mut payload, d) {
                        d.add_error(format!("SOF segment at offset {}: {}", offset, e));
                    }
                }
            }
        }
    }

    fn finish(mut self) -> Metadata {
        if !self.tables.is_empty() || !self.table_errors.is_empty() {
            let id = self.metadata.add_directory(&HUFFMAN_TABLES, None);
            if let Some(dir) = self.metadata.directory_mut(id) {
                if !self.tables.is_empty() {
                    dir.set(huffman::TAG_NUMBER_OF_TABLES, self.tables.len() as i64);
                    dir.set(huffman::TAG_TABLES, StructuredValue::HuffmanTables(self.tables));
                }
                for e in self.table_errors {
                    dir.add_error(e);
                }
            }
        }
        self.metadata
    }
}

fn read_frame_header<R: Read>(r: &mut ByteCursor<R>, dir: &mut Directory) -> Result<()> {
    dir.set(TAG_DATA_PRECISION, r.read_u8()?);
    dir.set(TAG_IMAGE_HEIGHT, r.read_u16()?);
    dir.set(TAG_IMAGE_WIDTH, r.read_u16()?);
    let components = r.read_u8()?;
    dir.set(TAG_NUMBER_OF_COMPONENTS, components);
    for i in 0..components.min(4) {
        let [id, sampling, table] = r.read_array::<3>()?;
        dir.set(
            TAG_COMPONENT_DATA_1 + i as i32,
            TagValue::Ints(vec![id as i64, sampling as i64, table as i64]),
        );
    }
    Ok(())
}
