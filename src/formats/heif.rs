//! HEIF / AVIF still images (ISO/IEC 23008-12 on top of ISO-BMFF).

use super::open_source;
use crate::boxes::{BoxHeader, BoxKey, FourCC, FullBoxHeader};
use crate::cursor::Endian;
use crate::descriptor::{Rule, TagDef, Vocabulary};
use crate::directory::{Directory, TagValue};
use crate::error::Result;
use crate::metadata::Metadata;
use crate::parser::{ParseOptions, walk};
use crate::registry::{BoxPayload, ChildLayout, FtypDecoder, LeafDecoder, Registry};
use std::io::{Read, Seek};

pub const TAG_MAJOR_BRAND: i32 = 1;
pub const TAG_MINOR_VERSION: i32 = 2;
pub const TAG_COMPATIBLE_BRANDS: i32 = 3;
pub const TAG_IMAGE_WIDTH: i32 = 4;
pub const TAG_IMAGE_HEIGHT: i32 = 5;
pub const TAG_IMAGE_ROTATION: i32 = 6;
pub const TAG_BITS_PER_CHANNEL: i32 = 7;

pub static HEIF: Vocabulary = Vocabulary {
    name: "HEIF",
    tags: &[
        TagDef { id: TAG_MAJOR_BRAND, name: "Major Brand", rule: Rule::Raw },
        TagDef { id: TAG_MINOR_VERSION, name: "Minor Version", rule: Rule::Raw },
        TagDef { id: TAG_COMPATIBLE_BRANDS, name: "Compatible Brands", rule: Rule::Raw },
        TagDef { id: TAG_IMAGE_WIDTH, name: "Width", rule: Rule::Suffix("pixels") },
        TagDef { id: TAG_IMAGE_HEIGHT, name: "Height", rule: Rule::Suffix("pixels") },
        TagDef { id: TAG_IMAGE_ROTATION, name: "Rotation", rule: Rule::Custom(describe_rotation) },
        TagDef { id: TAG_BITS_PER_CHANNEL, name: "Bits Per Channel", rule: Rule::Raw },
    ],
};

fn describe_rotation(dir: &Directory, tag: i32) -> Option<String> {
    dir.get_i64(tag).map(|angle| format!("{} degrees", angle * 90))
}

/// Boxes the HEIF decoder understands. Item properties live in
/// `meta/iprp/ipco`; everything else is skipped.
pub fn registry() -> Registry {
    Registry::new()
        .with_container(FourCC(*b"meta"), ChildLayout::Full, None)
        .with_container(FourCC(*b"iprp"), ChildLayout::Plain, None)
        .with_container(FourCC(*b"ipco"), ChildLayout::Plain, None)
        .with_decoder(
            BoxKey::FourCC(FourCC(*b"ftyp")),
            "ftyp",
            Box::new(FtypDecoder {
                major_brand: TAG_MAJOR_BRAND,
                minor_version: TAG_MINOR_VERSION,
                compatible_brands: TAG_COMPATIBLE_BRANDS,
            }),
        )
        .with_decoder(BoxKey::FourCC(FourCC(*b"ispe")), "ispe", Box::new(IspeDecoder))
        .with_decoder(BoxKey::FourCC(FourCC(*b"irot")), "irot", Box::new(IrotDecoder))
        .with_decoder(BoxKey::FourCC(FourCC(*b"pixi")), "pixi", Box::new(PixiDecoder))
}

pub fn read_metadata<R: Read + Seek>(r: &mut R) -> Result<Metadata> {
    read_metadata_with(r, ParseOptions::default())
}

pub fn read_metadata_with<R: Read + Seek>(r: &mut R, options: ParseOptions) -> Result<Metadata> {
    let mut cur = open_source(r, Endian::Big)?;
    let end = cur.len().unwrap_or(u64::MAX);
    let mut metadata = Metadata::new();
    let root = metadata.add_directory(&HEIF, None);
    walk(&mut cur, end, &registry(), &mut metadata, root, options);
    Ok(metadata)
}

/// ispe: image spatial extents. Only the first one is kept.
struct IspeDecoder;

impl LeafDecoder for IspeDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let width = payload.read_u32()?;
        let height = payload.read_u32()?;
        if !dir.contains(TAG_IMAGE_WIDTH) {
            dir.set(TAG_IMAGE_WIDTH, width);
            dir.set(TAG_IMAGE_HEIGHT, height);
        }
        Ok(())
    }
}

/// irot: six reserved bits, then the anti-clockwise angle in units of 90°.
struct IrotDecoder;

impl LeafDecoder for IrotDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let angle = payload.read_u8()? & 0x03;
        if !dir.contains(TAG_IMAGE_ROTATION) {
            dir.set(TAG_IMAGE_ROTATION, angle);
        }
        Ok(())
    }
}

struct PixiDecoder;

impl LeafDecoder for PixiDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let channels = payload.read_u8()? as usize;
        let bits = payload.read_bytes(channels)?;
        if !dir.contains(TAG_BITS_PER_CHANNEL) {
            dir.set(TAG_BITS_PER_CHANNEL, TagValue::Ints(bits.into_iter().map(i64::from).collect()));
        }
        Ok(())
    }
}
