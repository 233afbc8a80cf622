//! Encapsulated PostScript: the optional DOS binary header and the DSC
//! header comments of the PostScript section.

use super::open_source;
use crate::cursor::{ByteCursor, Endian, TextEncoding};
use crate::descriptor::{Rule, TagDef, Vocabulary};
use crate::directory::Directory;
use crate::error::{DecodeError, Result};
use crate::metadata::Metadata;
use std::io::{Read, Seek};

pub const TAG_DSC_VERSION: i32 = 1;
pub const TAG_AUTHOR: i32 = 2;
pub const TAG_BOUNDING_BOX: i32 = 3;
pub const TAG_COPYRIGHT: i32 = 4;
pub const TAG_CREATION_DATE: i32 = 5;
pub const TAG_CREATOR: i32 = 6;
pub const TAG_FOR: i32 = 7;
pub const TAG_IMAGE_DATA: i32 = 8;
pub const TAG_KEYWORDS: i32 = 9;
pub const TAG_MODIFY_DATE: i32 = 10;
pub const TAG_PAGES: i32 = 11;
pub const TAG_ROUTING: i32 = 12;
pub const TAG_SUBJECT: i32 = 13;
pub const TAG_TITLE: i32 = 14;
pub const TAG_VERSION: i32 = 15;
pub const TAG_DOCUMENT_DATA: i32 = 16;
pub const TAG_EMULATION: i32 = 17;
pub const TAG_EXTENSIONS: i32 = 18;
pub const TAG_LANGUAGE_LEVEL: i32 = 19;
pub const TAG_ORIENTATION: i32 = 20;
pub const TAG_PAGE_ORDER: i32 = 21;
pub const TAG_OPERATING_SYSTEM: i32 = 22;
pub const TAG_PROCESS_COLORS: i32 = 23;
pub const TAG_REQUIREMENTS: i32 = 24;
pub const TAG_TARGET_DEVICE: i32 = 25;
pub const TAG_TEST: i32 = 26;
pub const TAG_IMAGE_WIDTH: i32 = 28;
pub const TAG_IMAGE_HEIGHT: i32 = 29;
pub const TAG_COLOR_TYPE: i32 = 30;
pub const TAG_RAM_SIZE: i32 = 31;
pub const TAG_TIFF_PREVIEW_SIZE: i32 = 32;
pub const TAG_TIFF_PREVIEW_OFFSET: i32 = 33;
pub const TAG_WMF_PREVIEW_SIZE: i32 = 34;
pub const TAG_WMF_PREVIEW_OFFSET: i32 = 35;

/// First four bytes of a DOS EPS binary file, read big-endian.
pub const BINARY_MAGIC: u32 = 0xC5D0_D3C6;
const PS_MAGIC: &[u8] = b"%!PS";
/// Header comment lines longer than this are cut.
const MAX_LINE: usize = 4096;

pub static EPS: Vocabulary = Vocabulary {
    name: "EPS",
    tags: &[
        TagDef { id: TAG_DSC_VERSION, name: "DSC Version", rule: Rule::Raw },
        TagDef { id: TAG_AUTHOR, name: "Author", rule: Rule::Raw },
        TagDef { id: TAG_BOUNDING_BOX, name: "Bounding Box", rule: Rule::Raw },
        TagDef { id: TAG_COPYRIGHT, name: "Copyright", rule: Rule::Raw },
        TagDef { id: TAG_CREATION_DATE, name: "Creation Date", rule: Rule::Raw },
        TagDef { id: TAG_CREATOR, name: "Creator", rule: Rule::Raw },
        TagDef { id: TAG_FOR, name: "For", rule: Rule::Raw },
        TagDef { id: TAG_IMAGE_DATA, name: "Image Data", rule: Rule::Raw },
        TagDef { id: TAG_KEYWORDS, name: "Keywords", rule: Rule::Raw },
        TagDef { id: TAG_MODIFY_DATE, name: "Modify Date", rule: Rule::Raw },
        TagDef { id: TAG_PAGES, name: "Pages", rule: Rule::Raw },
        TagDef { id: TAG_ROUTING, name: "Routing", rule: Rule::Raw },
        TagDef { id: TAG_SUBJECT, name: "Subject", rule: Rule::Raw },
        TagDef { id: TAG_TITLE, name: "Title", rule: Rule::Raw },
        TagDef { id: TAG_VERSION, name: "Version", rule: Rule::Raw },
        TagDef { id: TAG_DOCUMENT_DATA, name: "Document Data", rule: Rule::Raw },
        TagDef { id: TAG_EMULATION, name: "Emulation", rule: Rule::Raw },
        TagDef { id: TAG_EXTENSIONS, name: "Extensions", rule: Rule::Raw },
        TagDef { id: TAG_LANGUAGE_LEVEL, name: "Language Level", rule: Rule::Raw },
        TagDef { id: TAG_ORIENTATION, name: "Orientation", rule: Rule::Raw },
        TagDef { id: TAG_PAGE_ORDER, name: "Page Order", rule: Rule::Raw },
        TagDef { id: TAG_OPERATING_SYSTEM, name: "Operating System", rule: Rule::Raw },
        TagDef { id: TAG_PROCESS_COLORS, name: "Process Colors", rule: Rule::Raw },
        TagDef { id: TAG_REQUIREMENTS, name: "Requirements", rule: Rule::Raw },
        TagDef { id: TAG_TARGET_DEVICE, name: "Target Device", rule: Rule::Raw },
        TagDef { id: TAG_TEST, name: "Test", rule: Rule::Raw },
        TagDef { id: TAG_IMAGE_WIDTH, name: "Image Width", rule: Rule::Suffix("pixels") },
        TagDef { id: TAG_IMAGE_HEIGHT, name: "Image Height", rule: Rule::Suffix("pixels") },
        TagDef {
            id: TAG_COLOR_TYPE,
            name: "Color Type",
            rule: Rule::Indexed { base: 1, labels: &["Grayscale", "Lab", "RGB", "CMYK"] },
        },
        TagDef { id: TAG_RAM_SIZE, name: "Ram Size", rule: Rule::Raw },
        TagDef { id: TAG_TIFF_PREVIEW_SIZE, name: "TIFF Preview Size", rule: Rule::Suffix("bytes") },
        TagDef { id: TAG_TIFF_PREVIEW_OFFSET, name: "TIFF Preview Offset", rule: Rule::Suffix("bytes") },
        TagDef { id: TAG_WMF_PREVIEW_SIZE, name: "WMF Preview Size", rule: Rule::Raw },
        TagDef { id: TAG_WMF_PREVIEW_OFFSET, name: "WMF Preview Offset", rule: Rule::Raw },
    ],
};

/// DSC keyword to tag.
const KEYWORDS: &[(&str, i32)] = &[
    ("%%Author", TAG_AUTHOR),
    ("%%BoundingBox", TAG_BOUNDING_BOX),
    ("%%Copyright", TAG_COPYRIGHT),
    ("%%CreationDate", TAG_CREATION_DATE),
    ("%%Creator", TAG_CREATOR),
    ("%%For", TAG_FOR),
    ("%ImageData", TAG_IMAGE_DATA),
    ("%%Keywords", TAG_KEYWORDS),
    ("%%ModDate", TAG_MODIFY_DATE),
    ("%%Pages", TAG_PAGES),
    ("%%Routing", TAG_ROUTING),
    ("%%Subject", TAG_SUBJECT),
    ("%%Title", TAG_TITLE),
    ("%%Version", TAG_VERSION),
    ("%%DocumentData", TAG_DOCUMENT_DATA),
    ("%%Emulation", TAG_EMULATION),
    ("%%Extensions", TAG_EXTENSIONS),
    ("%%LanguageLevel", TAG_LANGUAGE_LEVEL),
    ("%%Orientation", TAG_ORIENTATION),
    ("%%PageOrder", TAG_PAGE_ORDER),
    ("%%OperatingSystem", TAG_OPERATING_SYSTEM),
    ("%%ProcessColors", TAG_PROCESS_COLORS),
    ("%%Requirements", TAG_REQUIREMENTS),
    ("%%TargetDevice", TAG_TARGET_DEVICE),
    ("%%Test", TAG_TEST),
];

pub fn read_metadata<R: Read + Seek>(r: &mut R) -> Result<Metadata> {
    let mut cur = open_source(r, Endian::Little)?;
    let mut metadata = Metadata::new();
    let id = metadata.add_directory(&EPS, None);
    if let Some(dir) = metadata.directory_mut(id) {
        if let Err(e) = read_eps(&mut cur, dir) {
            dir.add_error(e.to_string());
        }
    }
    Ok(metadata)
}

fn read_eps<R: Read + Seek>(r: &mut ByteCursor<R>, dir: &mut Directory) -> Result<()> {
    let magic = r.peek(|c| c.read_u32_with(Endian::Big))?;
    if magic == BINARY_MAGIC {
        r.skip(4)?;
        let ps_offset = r.read_u32()? as u64;
        let ps_length = r.read_u32()? as u64;
        let wmf_offset = r.read_u32()?;
        let wmf_length = r.read_u32()?;
        let tiff_offset = r.read_u32()?;
        let tiff_length = r.read_u32()?;
        r.skip(2)?; // checksum

        if wmf_offset != 0 {
            dir.set(TAG_WMF_PREVIEW_OFFSET, wmf_offset);
            dir.set(TAG_WMF_PREVIEW_SIZE, wmf_length);
        }
        if tiff_offset != 0 {
            dir.set(TAG_TIFF_PREVIEW_OFFSET, tiff_offset);
            dir.set(TAG_TIFF_PREVIEW_SIZE, tiff_length);
        }

        r.seek(ps_offset)?;
        return read_dsc_comments(r, dir, ps_offset.saturating_add(ps_length));
    }

    let lead = r.peek(|c| c.read_array::<4>())?;
    if &lead[..] != PS_MAGIC {
        return Err(DecodeError::InvalidFormat("not an EPS file".into()));
    }
    let end = r.len().unwrap_or(u64::MAX);
    read_dsc_comments(r, dir, end)
}

/// Reads header comment lines until `%%EndComments`, the first line that is
/// not a comment, or `end`.
fn read_dsc_comments<R: Read + Seek>(r: &mut ByteCursor<R>, dir: &mut Directory, end: u64) -> Result<()> {
    let mut previous: Option<i32> = None;
    while let Some(line) = read_line(r, end)? {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('%') || line.starts_with("%%EndComments") {
            break;
        }

        if let Some(version) = line.strip_prefix("%!PS-Adobe-") {
            dir.set(TAG_DSC_VERSION, version.trim());
            continue;
        }

        if let Some(more) = line.strip_prefix("%%+") {
            if let Some(tag) = previous {
                let joined = match dir.get_string(tag) {
                    Some(v) => format!("{} {}", v, more.trim()),
                    None => more.trim().to_string(),
                };
                dir.set(tag, joined);
            }
            continue;
        }

        let (keyword, value) = match line.split_once(':') {
            Some((k, v)) => (k, v.trim()),
            None => (line, ""),
        };
        let Some(&(_, tag)) = KEYWORDS.iter().find(|(k, _)| *k == keyword) else {
            previous = None;
            continue;
        };
        dir.set(tag, value);
        previous = Some(tag);
        if tag == TAG_IMAGE_DATA {
            apply_image_data(dir, value);
        }
    }
    Ok(())
}

/// `%ImageData: width height bits mode ...` also yields the image size,
/// colour type and the bytes needed to hold the raster.
fn apply_image_data(dir: &mut Directory, value: &str) {
    let fields: Vec<i64> = value
        .split_whitespace()
        .take(4)
        .map_while(|f| f.parse().ok())
        .collect();
    let &[width, height, _bits, mode] = fields.as_slice() else {
        log::debug!("unparsable %ImageData value {:?}", value);
        return;
    };
    if !dir.contains(TAG_IMAGE_WIDTH) {
        dir.set(TAG_IMAGE_WIDTH, width);
    }
    if !dir.contains(TAG_IMAGE_HEIGHT) {
        dir.set(TAG_IMAGE_HEIGHT, height);
    }
    if !dir.contains(TAG_COLOR_TYPE) {
        dir.set(TAG_COLOR_TYPE, mode);
    }
    if !dir.contains(TAG_RAM_SIZE) {
        let bytes_per_pixel = match mode {
            1 => 1,
            2 | 3 => 3,
            4 => 4,
            _ => 0,
        };
        match width.checked_mul(height).and_then(|n| n.checked_mul(bytes_per_pixel)) {
            Some(size) => dir.set(TAG_RAM_SIZE, size),
            None => dir.add_error(format!("%ImageData raster {}x{} is too large", width, height)),
        }
    }
}

/// One line terminated by CR, LF or CR LF. `None` at `end` or end of input.
fn read_line<R: Read + Seek>(r: &mut ByteCursor<R>, end: u64) -> Result<Option<String>> {
    if exhausted(r, end) {
        return Ok(None);
    }
    let mut bytes = Vec::new();
    while !exhausted(r, end) {
        match r.read_u8()? {
            b'\n' => break,
            b'\r' => {
                if !exhausted(r, end) && r.peek_u8()? == b'\n' {
                    r.skip(1)?;
                }
                break;
            }
            b if bytes.len() < MAX_LINE => bytes.push(b),
            _ => {}
        }
    }
    Ok(Some(TextEncoding::Windows1252.decode(&bytes)))
}

fn exhausted<R: Read>(r: &ByteCursor<R>, end: u64) -> bool {
    r.position() >= end || r.remaining() == Some(0)
}
