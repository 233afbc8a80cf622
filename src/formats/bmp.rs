//! Windows / OS/2 bitmap headers.
//!
//! The DIB header announces its own size, and that size is the only thing
//! telling the variants apart: 12 (OS/2 1.x core header), 16 or 64 (OS/2
//! 2.x), 40 (Windows 3 info header), 52 and 56 (Adobe extensions), 108
//! (V4) and 124 (V5). OS/2 bitmap arrays (`BA`) chain several complete
//! bitmap files, and each one gets its own directory.

use super::open_source;
use crate::cursor::{ByteCursor, Endian, TextEncoding};
use crate::descriptor::{Rule, TagDef, Vocabulary, illegal_value};
use crate::directory::{Directory, DirectoryId};
use crate::error::{DecodeError, Result};
use crate::metadata::Metadata;
use std::io::{Read, Seek};

pub const TAG_BITMAP_TYPE: i32 = -2;
pub const TAG_HEADER_SIZE: i32 = -1;
pub const TAG_IMAGE_HEIGHT: i32 = 1;
pub const TAG_IMAGE_WIDTH: i32 = 2;
pub const TAG_COLOUR_PLANES: i32 = 3;
pub const TAG_BITS_PER_PIXEL: i32 = 4;
pub const TAG_COMPRESSION: i32 = 5;
pub const TAG_X_PIXELS_PER_METER: i32 = 6;
pub const TAG_Y_PIXELS_PER_METER: i32 = 7;
pub const TAG_PALETTE_COLOUR_COUNT: i32 = 8;
pub const TAG_IMPORTANT_COLOUR_COUNT: i32 = 9;
pub const TAG_RENDERING: i32 = 10;
pub const TAG_COLOR_ENCODING: i32 = 11;
pub const TAG_RED_MASK: i32 = 12;
pub const TAG_GREEN_MASK: i32 = 13;
pub const TAG_BLUE_MASK: i32 = 14;
pub const TAG_ALPHA_MASK: i32 = 15;
pub const TAG_COLOR_SPACE_TYPE: i32 = 16;
pub const TAG_GAMMA_RED: i32 = 17;
pub const TAG_GAMMA_GREEN: i32 = 18;
pub const TAG_GAMMA_BLUE: i32 = 19;
pub const TAG_INTENT: i32 = 20;
pub const TAG_LINKED_PROFILE: i32 = 21;

// Magic numbers as little-endian u16.
pub const BITMAP: u16 = 0x4D42;
pub const OS2_BITMAP_ARRAY: u16 = 0x4142;
pub const OS2_COLOR_ICON: u16 = 0x4943;
pub const OS2_COLOR_POINTER: u16 = 0x5043;
pub const OS2_ICON: u16 = 0x4349;
pub const OS2_POINTER: u16 = 0x5450;

const FILE_HEADER_LEN: u64 = 14;
const PROFILE_LINKED: u32 = 0x4C49_4E4B;
const OS2_V2_HEADER_LEN: u32 = 64;

pub static BMP_HEADER: Vocabulary = Vocabulary {
    name: "BMP Header",
    tags: &[
        TagDef {
            id: TAG_BITMAP_TYPE,
            name: "Bitmap type",
            rule: Rule::Enum(&[
                (BITMAP as i64, "Standard"),
                (OS2_BITMAP_ARRAY as i64, "Bitmap Array"),
                (OS2_COLOR_ICON as i64, "Color Icon"),
                (OS2_COLOR_POINTER as i64, "Color Pointer"),
                (OS2_ICON as i64, "Monochrome Icon"),
                (OS2_POINTER as i64, "Monochrome Pointer"),
            ]),
        },
        TagDef { id: TAG_HEADER_SIZE, name: "Header Size", rule: Rule::Suffix("bytes") },
        TagDef { id: TAG_IMAGE_HEIGHT, name: "Image Height", rule: Rule::Raw },
        TagDef { id: TAG_IMAGE_WIDTH, name: "Image Width", rule: Rule::Raw },
        TagDef { id: TAG_COLOUR_PLANES, name: "Planes", rule: Rule::Raw },
        TagDef { id: TAG_BITS_PER_PIXEL, name: "Bits Per Pixel", rule: Rule::Raw },
        TagDef { id: TAG_COMPRESSION, name: "Compression", rule: Rule::Custom(describe_compression) },
        TagDef { id: TAG_X_PIXELS_PER_METER, name: "X Pixels per Meter", rule: Rule::Raw },
        TagDef { id: TAG_Y_PIXELS_PER_METER, name: "Y Pixels per Meter", rule: Rule::Raw },
        TagDef { id: TAG_PALETTE_COLOUR_COUNT, name: "Palette Colour Count", rule: Rule::Raw },
        TagDef { id: TAG_IMPORTANT_COLOUR_COUNT, name: "Important Colour Count", rule: Rule::Raw },
        TagDef {
            id: TAG_RENDERING,
            name: "Rendering",
            rule: Rule::Enum(&[
                (0, "No Halftoning Algorithm"),
                (1, "Error Diffusion Halftoning"),
                (2, "Processing Algorithm for Noncoded Document Acquisition"),
                (3, "Super-circle Halftoning"),
            ]),
        },
        TagDef { id: TAG_COLOR_ENCODING, name: "Color Encoding", rule: Rule::Enum(&[(0, "RGB")]) },
        TagDef { id: TAG_RED_MASK, name: "Red Mask", rule: Rule::BitMask { digits: 8 } },
        TagDef { id: TAG_GREEN_MASK, name: "Green Mask", rule: Rule::BitMask { digits: 8 } },
        TagDef { id: TAG_BLUE_MASK, name: "Blue Mask", rule: Rule::BitMask { digits: 8 } },
        TagDef { id: TAG_ALPHA_MASK, name: "Alpha Mask", rule: Rule::BitMask { digits: 8 } },
        TagDef {
            id: TAG_COLOR_SPACE_TYPE,
            name: "Color Space Type",
            rule: Rule::Enum(&[
                (0, "Calibrated RGB"),
                (0x7352_4742, "sRGB Color Space"),
                (0x5769_6E20, "System Default Color Space, sRGB"),
                (PROFILE_LINKED as i64, "Linked Profile"),
                (0x4D42_4544, "Embedded Profile"),
            ]),
        },
        TagDef { id: TAG_GAMMA_RED, name: "Red Gamma Curve", rule: Rule::Fixed1616 },
        TagDef { id: TAG_GAMMA_GREEN, name: "Green Gamma Curve", rule: Rule::Fixed1616 },
        TagDef { id: TAG_GAMMA_BLUE, name: "Blue Gamma Curve", rule: Rule::Fixed1616 },
        TagDef {
            id: TAG_INTENT,
            name: "Rendering Intent",
            rule: Rule::Enum(&[
                (1, "Graphic, Saturation"),
                (2, "Proof, Relative Colorimetric"),
                (4, "Picture, Perceptual"),
                (8, "Match, Absolute Colorimetric"),
            ]),
        },
        TagDef { id: TAG_LINKED_PROFILE, name: "Linked Profile File Name", rule: Rule::Raw },
    ],
};

/// Codes 3 and 4 mean something else under the 64-byte OS/2 2.x header.
fn describe_compression(dir: &Directory, tag: i32) -> Option<String> {
    let value = dir.get_i64(tag)?;
    let os2_v2 = dir.get_i64(TAG_HEADER_SIZE) == Some(OS2_V2_HEADER_LEN as i64);
    let label = match value {
        0 => "None",
        1 => "RLE 8-bit/pixel",
        2 => "RLE 4-bit/pixel",
        3 if os2_v2 => "Huffman 1D",
        3 => "Bit Fields",
        4 if os2_v2 => "RLE 24-bit/pixel",
        4 => "JPEG",
        5 => "PNG",
        6 => "Bit Fields",
        11 => "CMYK",
        12 => "CMYK RLE-8",
        13 => "CMYK RLE-4",
        _ => return Some(illegal_value(value)),
    };
    Some(label.to_string())
}

pub fn read_metadata<R: Read + Seek>(r: &mut R) -> Result<Metadata> {
    let mut cur = open_source(r, Endian::Little)?;
    let mut metadata = Metadata::new();
    read_bitmaps(&mut cur, &mut metadata);
    Ok(metadata)
}

fn read_bitmaps<R: Read + Seek>(r: &mut ByteCursor<R>, metadata: &mut Metadata) {
    let mut entry_start = r.position();
    loop {
        let magic = match r.peek(|c| c.read_u16()) {
            Ok(m) => m,
            Err(e) => {
                let dir = metadata.add_directory(&BMP_HEADER, None);
                record(metadata, dir, e);
                return;
            }
        };
        if magic != OS2_BITMAP_ARRAY {
            read_bitmap(r, metadata);
            return;
        }

        let next = match read_array_entry(r) {
            Ok(n) => n,
            Err(e) => {
                let dir = metadata.add_directory(&BMP_HEADER, None);
                record(metadata, dir, e);
                return;
            }
        };
        let dir = read_bitmap(r, metadata);
        if next == 0 {
            return;
        }
        if next <= entry_start {
            record(metadata, dir, DecodeError::InvalidFormat(format!("invalid next header offset {}", next)));
            return;
        }
        if let Err(e) = r.seek(next) {
            record(metadata, dir, e);
            return;
        }
        entry_start = next;
    }
}

/// Array entry: magic, entry size, offset of the next entry, screen size,
/// then a complete bitmap file. Returns the next entry's offset.
fn read_array_entry<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<u64> {
    r.skip(6)?;
    let next = r.read_u32()? as u64;
    r.skip(4)?;
    Ok(next)
}

fn record(metadata: &mut Metadata, dir: DirectoryId, e: DecodeError) {
    if let Some(d) = metadata.directory_mut(dir) {
        d.add_error(e.to_string());
    }
}

/// One bitmap file header plus DIB header, into a new directory.
fn read_bitmap<R: Read + Seek>(r: &mut ByteCursor<R>, metadata: &mut Metadata) -> DirectoryId {
    let id = metadata.add_directory(&BMP_HEADER, None);
    if let Some(dir) = metadata.directory_mut(id) {
        let file_start = r.position();
        if let Err(e) = read_bitmap_header(r, dir, file_start) {
            dir.add_error(e.to_string());
        }
    }
    id
}

fn read_bitmap_header<R: Read + Seek>(r: &mut ByteCursor<R>, dir: &mut Directory, file_start: u64) -> Result<()> {
    let magic = r.read_u16()?;
    dir.set(TAG_BITMAP_TYPE, magic);
    match magic {
        BITMAP | OS2_COLOR_ICON | OS2_COLOR_POINTER | OS2_ICON | OS2_POINTER => {}
        OS2_BITMAP_ARRAY => {
            return Err(DecodeError::InvalidFormat("nested bitmap arrays are not allowed".into()));
        }
        _ => {
            return Err(DecodeError::InvalidFormat(format!("invalid BMP magic number {:#06x}", magic)));
        }
    }

    // file size, reserved, pixel data offset
    r.skip(12)?;

    let header_size = r.read_u32()?;
    dir.set(TAG_HEADER_SIZE, header_size);

    if header_size == 12 {
        dir.set(TAG_IMAGE_WIDTH, r.read_u16()?);
        dir.set(TAG_IMAGE_HEIGHT, r.read_u16()?);
        dir.set(TAG_COLOUR_PLANES, r.read_u16()?);
        dir.set(TAG_BITS_PER_PIXEL, r.read_u16()?);
        return Ok(());
    }
    if !matches!(header_size, 16 | 40 | 52 | 56 | 64 | 108 | 124) {
        return Err(DecodeError::InvalidFormat(format!("unexpected DIB header size: {}", header_size)));
    }

    dir.set(TAG_IMAGE_WIDTH, r.read_i32()?);
    dir.set(TAG_IMAGE_HEIGHT, r.read_i32()?);
    dir.set(TAG_COLOUR_PLANES, r.read_u16()?);
    dir.set(TAG_BITS_PER_PIXEL, r.read_u16()?);
    if header_size == 16 {
        return Ok(());
    }

    let compression = r.read_u32()?;
    dir.set(TAG_COMPRESSION, compression);
    r.skip(4)?; // image data size
    dir.set(TAG_X_PIXELS_PER_METER, r.read_i32()?);
    dir.set(TAG_Y_PIXELS_PER_METER, r.read_i32()?);
    dir.set(TAG_PALETTE_COLOUR_COUNT, r.read_u32()?);
    dir.set(TAG_IMPORTANT_COLOUR_COUNT, r.read_u32()?);

    if header_size == 40 {
        // BI_BITFIELDS / BI_ALPHABITFIELDS put the masks right after the header.
        if compression == 3 || compression == 6 {
            dir.set(TAG_RED_MASK, r.read_u32()?);
            dir.set(TAG_GREEN_MASK, r.read_u32()?);
            dir.set(TAG_BLUE_MASK, r.read_u32()?);
            if compression == 6 {
                dir.set(TAG_ALPHA_MASK, r.read_u32()?);
            }
        }
        return Ok(());
    }

    if header_size == OS2_V2_HEADER_LEN {
        r.skip(6)?; // units, reserved, recording algorithm
        dir.set(TAG_RENDERING, r.read_u16()?);
        r.skip(8)?; // halftoning size parameters
        dir.set(TAG_COLOR_ENCODING, r.read_u32()?);
        r.skip(4)?; // application identifier
        return Ok(());
    }

    dir.set(TAG_RED_MASK, r.read_u32()?);
    dir.set(TAG_GREEN_MASK, r.read_u32()?);
    dir.set(TAG_BLUE_MASK, r.read_u32()?);
    if header_size >= 56 {
        dir.set(TAG_ALPHA_MASK, r.read_u32()?);
    }
    if header_size < 108 {
        return Ok(());
    }

    let color_space = r.read_u32()?;
    dir.set(TAG_COLOR_SPACE_TYPE, color_space);
    r.skip(36)?; // CIEXYZTRIPLE endpoints
    dir.set(TAG_GAMMA_RED, r.read_u32()?);
    dir.set(TAG_GAMMA_GREEN, r.read_u32()?);
    dir.set(TAG_GAMMA_BLUE, r.read_u32()?);
    if header_size < 124 {
        return Ok(());
    }

    dir.set(TAG_INTENT, r.read_u32()?);
    let profile_offset = r.read_u32()? as u64;
    let profile_size = r.read_u32()? as usize;
    r.skip(4)?; // reserved

    if color_space == PROFILE_LINKED && profile_size > 0 {
        // Offset counts from the start of the DIB header.
        let at = file_start + FILE_HEADER_LEN + profile_offset;
        let name = r.read_at(at, |c| c.read_null_terminated_string(profile_size, TextEncoding::Windows1252))?;
        dir.set(TAG_LINKED_PROFILE, name);
    }
    Ok(())
}
