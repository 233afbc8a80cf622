//! QuickTime movies and ISO-BMFF based MP4 files.
//!
//! The movie header lands in the root `QuickTime` directory, each `trak`
//! opens a `QuickTime Track` child, and user data (`udta` text atoms,
//! `loci`, `meta/keys`, `meta/ilst`) is collected in a single
//! `QuickTime Metadata` directory under the root.

use super::open_source;
use crate::boxes::{BoxHeader, BoxKey, FourCC, FullBoxHeader};
use crate::cursor::{Endian, TextEncoding};
use crate::descriptor::{Rule, TagDef, Vocabulary, format_decimal};
use crate::directory::{Directory, StructuredValue, TagValue};
use crate::error::Result;
use crate::metadata::Metadata;
use crate::parser::{ParseOptions, next_child, walk};
use crate::plist;
use crate::registry::{BoxPayload, ChildLayout, FtypDecoder, LeafDecoder, Registry, lang_from_u16};
use chrono::DateTime;
use std::io::{Read, Seek};

pub const TAG_MAJOR_BRAND: i32 = 0x1000;
pub const TAG_MINOR_VERSION: i32 = 0x1001;
pub const TAG_COMPATIBLE_BRANDS: i32 = 0x1002;
pub const TAG_CREATION_TIME: i32 = 0x0100;
pub const TAG_MODIFICATION_TIME: i32 = 0x0101;
pub const TAG_TIME_SCALE: i32 = 0x0102;
pub const TAG_DURATION: i32 = 0x0103;
pub const TAG_PREFERRED_RATE: i32 = 0x0104;
pub const TAG_PREFERRED_VOLUME: i32 = 0x0105;
pub const TAG_PREVIEW_TIME: i32 = 0x0108;
pub const TAG_PREVIEW_DURATION: i32 = 0x0109;
pub const TAG_POSTER_TIME: i32 = 0x010A;
pub const TAG_SELECTION_TIME: i32 = 0x010B;
pub const TAG_SELECTION_DURATION: i32 = 0x010C;
pub const TAG_CURRENT_TIME: i32 = 0x010D;
pub const TAG_NEXT_TRACK_ID: i32 = 0x010E;

pub static QUICKTIME: Vocabulary = Vocabulary {
    name: "QuickTime",
    tags: &[
        TagDef { id: TAG_MAJOR_BRAND, name: "Major Brand", rule: Rule::Raw },
        TagDef { id: TAG_MINOR_VERSION, name: "Minor Version", rule: Rule::Raw },
        TagDef { id: TAG_COMPATIBLE_BRANDS, name: "Compatible Brands", rule: Rule::Raw },
        TagDef { id: TAG_CREATION_TIME, name: "Created", rule: Rule::Custom(describe_mac_time) },
        TagDef { id: TAG_MODIFICATION_TIME, name: "Modified", rule: Rule::Custom(describe_mac_time) },
        TagDef { id: TAG_TIME_SCALE, name: "Media Time Scale", rule: Rule::Raw },
        TagDef { id: TAG_DURATION, name: "Duration", rule: Rule::Custom(describe_movie_duration) },
        TagDef { id: TAG_PREFERRED_RATE, name: "Preferred Rate", rule: Rule::Raw },
        TagDef { id: TAG_PREFERRED_VOLUME, name: "Preferred Volume", rule: Rule::Raw },
        TagDef { id: TAG_PREVIEW_TIME, name: "Preview Time", rule: Rule::Raw },
        TagDef { id: TAG_PREVIEW_DURATION, name: "Preview Duration", rule: Rule::Raw },
        TagDef { id: TAG_POSTER_TIME, name: "Poster Time", rule: Rule::Raw },
        TagDef { id: TAG_SELECTION_TIME, name: "Selection Time", rule: Rule::Raw },
        TagDef { id: TAG_SELECTION_DURATION, name: "Selection Duration", rule: Rule::Raw },
        TagDef { id: TAG_CURRENT_TIME, name: "Current Time", rule: Rule::Raw },
        TagDef { id: TAG_NEXT_TRACK_ID, name: "Next Track ID", rule: Rule::Raw },
    ],
};

pub mod track {
    pub const TAG_TRACK_ID: i32 = 1;
    pub const TAG_CREATION_TIME: i32 = 2;
    pub const TAG_MODIFICATION_TIME: i32 = 3;
    pub const TAG_DURATION: i32 = 4;
    pub const TAG_LAYER: i32 = 5;
    pub const TAG_ALTERNATE_GROUP: i32 = 6;
    pub const TAG_VOLUME: i32 = 7;
    pub const TAG_WIDTH: i32 = 8;
    pub const TAG_HEIGHT: i32 = 9;
    pub const TAG_MEDIA_TIME_SCALE: i32 = 10;
    pub const TAG_MEDIA_DURATION: i32 = 11;
    pub const TAG_LANGUAGE: i32 = 12;
    pub const TAG_HANDLER_TYPE: i32 = 13;
    pub const TAG_HANDLER_NAME: i32 = 14;
}

pub static QUICKTIME_TRACK: Vocabulary = Vocabulary {
    name: "QuickTime Track",
    tags: &[
        TagDef { id: track::TAG_TRACK_ID, name: "Track ID", rule: Rule::Raw },
        TagDef { id: track::TAG_CREATION_TIME, name: "Created", rule: Rule::Custom(describe_mac_time) },
        TagDef { id: track::TAG_MODIFICATION_TIME, name: "Modified", rule: Rule::Custom(describe_mac_time) },
        TagDef { id: track::TAG_DURATION, name: "Duration", rule: Rule::Raw },
        TagDef { id: track::TAG_LAYER, name: "Layer", rule: Rule::Raw },
        TagDef { id: track::TAG_ALTERNATE_GROUP, name: "Alternate Group", rule: Rule::Raw },
        TagDef { id: track::TAG_VOLUME, name: "Volume", rule: Rule::Raw },
        TagDef { id: track::TAG_WIDTH, name: "Width", rule: Rule::Suffix("pixels") },
        TagDef { id: track::TAG_HEIGHT, name: "Height", rule: Rule::Suffix("pixels") },
        TagDef { id: track::TAG_MEDIA_TIME_SCALE, name: "Media Time Scale", rule: Rule::Raw },
        TagDef { id: track::TAG_MEDIA_DURATION, name: "Media Duration", rule: Rule::Custom(describe_media_duration) },
        TagDef { id: track::TAG_LANGUAGE, name: "Language", rule: Rule::Raw },
        TagDef { id: track::TAG_HANDLER_TYPE, name: "Handler Type", rule: Rule::Custom(describe_handler) },
        TagDef { id: track::TAG_HANDLER_NAME, name: "Handler Name", rule: Rule::Raw },
    ],
};

pub mod meta {
    pub const TAG_TITLE: i32 = 1;
    pub const TAG_ARTIST: i32 = 2;
    pub const TAG_ALBUM: i32 = 3;
    pub const TAG_YEAR: i32 = 4;
    pub const TAG_COMMENT: i32 = 5;
    pub const TAG_ENCODER: i32 = 6;
    pub const TAG_GPS_LOCATION: i32 = 7;
    pub const TAG_GENRE: i32 = 8;
    pub const TAG_DESCRIPTION: i32 = 9;
    pub const TAG_COPYRIGHT: i32 = 10;
    pub const TAG_ARTWORK: i32 = 11;
    pub const TAG_MAKE: i32 = 12;
    pub const TAG_MODEL: i32 = 13;
    pub const TAG_SOFTWARE: i32 = 14;
    pub const TAG_CREATION_DATE: i32 = 15;
    pub const TAG_LOCATION_NAME: i32 = 16;
    pub const TAG_LOCATION_ROLE: i32 = 17;
    pub const TAG_LONGITUDE: i32 = 18;
    pub const TAG_LATITUDE: i32 = 19;
    pub const TAG_ALTITUDE: i32 = 20;
    pub const TAG_LOCATION_BODY: i32 = 21;
    pub const TAG_LOCATION_NOTE: i32 = 22;
    pub const TAG_LOCATION_LANGUAGE: i32 = 23;
    pub const TAG_KEYS: i32 = 24;
}

pub static QUICKTIME_METADATA: Vocabulary = Vocabulary {
    name: "QuickTime Metadata",
    tags: &[
        TagDef { id: meta::TAG_TITLE, name: "Title", rule: Rule::Raw },
        TagDef { id: meta::TAG_ARTIST, name: "Artist", rule: Rule::Raw },
        TagDef { id: meta::TAG_ALBUM, name: "Album", rule: Rule::Raw },
        TagDef { id: meta::TAG_YEAR, name: "Year", rule: Rule::Raw },
        TagDef { id: meta::TAG_COMMENT, name: "Comment", rule: Rule::Raw },
        TagDef { id: meta::TAG_ENCODER, name: "Encoder", rule: Rule::Raw },
        TagDef { id: meta::TAG_GPS_LOCATION, name: "GPS Location", rule: Rule::Raw },
        TagDef { id: meta::TAG_GENRE, name: "Genre", rule: Rule::Raw },
        TagDef { id: meta::TAG_DESCRIPTION, name: "Description", rule: Rule::Raw },
        TagDef { id: meta::TAG_COPYRIGHT, name: "Copyright", rule: Rule::Raw },
        TagDef { id: meta::TAG_ARTWORK, name: "Artwork", rule: Rule::ByteLength },
        TagDef { id: meta::TAG_MAKE, name: "Make", rule: Rule::Raw },
        TagDef { id: meta::TAG_MODEL, name: "Model", rule: Rule::Raw },
        TagDef { id: meta::TAG_SOFTWARE, name: "Software", rule: Rule::Raw },
        TagDef { id: meta::TAG_CREATION_DATE, name: "Creation Date", rule: Rule::Raw },
        TagDef { id: meta::TAG_LOCATION_NAME, name: "Location Name", rule: Rule::Raw },
        TagDef {
            id: meta::TAG_LOCATION_ROLE,
            name: "Location Role",
            rule: Rule::Indexed {
                base: 0,
                labels: &["Shooting location", "Real location", "Fictional location"],
            },
        },
        TagDef { id: meta::TAG_LONGITUDE, name: "Longitude", rule: Rule::Raw },
        TagDef { id: meta::TAG_LATITUDE, name: "Latitude", rule: Rule::Raw },
        TagDef { id: meta::TAG_ALTITUDE, name: "Altitude", rule: Rule::Raw },
        TagDef { id: meta::TAG_LOCATION_BODY, name: "Location Body", rule: Rule::Raw },
        TagDef { id: meta::TAG_LOCATION_NOTE, name: "Location Note", rule: Rule::Raw },
        TagDef { id: meta::TAG_LOCATION_LANGUAGE, name: "Location Language", rule: Rule::Raw },
        TagDef { id: meta::TAG_KEYS, name: "Metadata Keys", rule: Rule::Raw },
    ],
};

/// Seconds between 1904-01-01 and 1970-01-01.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Text atoms found in `udta` and as `ilst` item types.
const TEXT_ATOMS: &[([u8; 4], i32)] = &[
    ([0xA9, b'n', b'a', b'm'], meta::TAG_TITLE),
    ([0xA9, b'A', b'R', b'T'], meta::TAG_ARTIST),
    ([0xA9, b'a', b'l', b'b'], meta::TAG_ALBUM),
    ([0xA9, b'd', b'a', b'y'], meta::TAG_YEAR),
    ([0xA9, b'c', b'm', b't'], meta::TAG_COMMENT),
    ([0xA9, b't', b'o', b'o'], meta::TAG_ENCODER),
    ([0xA9, b'x', b'y', b'z'], meta::TAG_GPS_LOCATION),
    ([0xA9, b'g', b'e', b'n'], meta::TAG_GENRE),
    ([0xA9, b'm', b'a', b'k'], meta::TAG_MAKE),
    ([0xA9, b'm', b'o', b'd'], meta::TAG_MODEL),
    ([0xA9, b's', b'w', b'r'], meta::TAG_SOFTWARE),
    (*b"desc", meta::TAG_DESCRIPTION),
    (*b"cprt", meta::TAG_COPYRIGHT),
    (*b"covr", meta::TAG_ARTWORK),
];

/// `mdta` key names (from the `keys` box) that have a tag.
const MDTA_KEYS: &[(&str, i32)] = &[
    ("com.apple.quicktime.make", meta::TAG_MAKE),
    ("com.apple.quicktime.model", meta::TAG_MODEL),
    ("com.apple.quicktime.software", meta::TAG_SOFTWARE),
    ("com.apple.quicktime.creationdate", meta::TAG_CREATION_DATE),
    ("com.apple.quicktime.location.ISO6709", meta::TAG_GPS_LOCATION),
    ("com.apple.quicktime.title", meta::TAG_TITLE),
    ("com.apple.quicktime.artist", meta::TAG_ARTIST),
    ("com.apple.quicktime.album", meta::TAG_ALBUM),
    ("com.apple.quicktime.comment", meta::TAG_COMMENT),
    ("com.apple.quicktime.description", meta::TAG_DESCRIPTION),
    ("com.apple.quicktime.copyright", meta::TAG_COPYRIGHT),
    ("com.apple.quicktime.genre", meta::TAG_GENRE),
    ("com.apple.quicktime.artwork", meta::TAG_ARTWORK),
];

fn describe_mac_time(dir: &Directory, tag: i32) -> Option<String> {
    let secs = dir.get_i64(tag)?;
    let t = DateTime::from_timestamp(secs.checked_sub(MAC_EPOCH_OFFSET)?, 0)?;
    Some(t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

fn seconds(duration: i64, scale: Option<i64>) -> Option<String> {
    match scale {
        Some(scale) if scale > 0 => Some(format!("{} seconds", format_decimal(duration as f64 / scale as f64, 2))),
        _ => Some(duration.to_string()),
    }
}

fn describe_movie_duration(dir: &Directory, tag: i32) -> Option<String> {
    seconds(dir.get_i64(tag)?, dir.get_i64(TAG_TIME_SCALE))
}

fn describe_media_duration(dir: &Directory, tag: i32) -> Option<String> {
    seconds(dir.get_i64(tag)?, dir.get_i64(track::TAG_MEDIA_TIME_SCALE))
}

fn describe_handler(dir: &Directory, tag: i32) -> Option<String> {
    let handler = dir.get_string(tag)?;
    let label = match handler.as_str() {
        "vide" => "Video",
        "soun" => "Sound",
        "hint" => "Hint",
        "meta" => "Timed Metadata",
        "text" => "Text",
        "sbtl" => "Subtitle",
        "subt" => "Subtitle",
        "tmcd" => "Time Code",
        "mdta" => "Metadata",
        _ => return Some(handler),
    };
    Some(label.to_string())
}

pub fn registry() -> Registry {
    let ftyp = FtypDecoder {
        major_brand: TAG_MAJOR_BRAND,
        minor_version: TAG_MINOR_VERSION,
        compatible_brands: TAG_COMPATIBLE_BRANDS,
    };
    let base = Registry::new()
        .with_container(FourCC(*b"moov"), ChildLayout::Plain, None)
        .with_container(FourCC(*b"trak"), ChildLayout::Plain, Some(&QUICKTIME_TRACK))
        .with_container(FourCC(*b"mdia"), ChildLayout::Plain, None)
        .with_container(FourCC(*b"udta"), ChildLayout::Plain, None)
        // QuickTime writes meta as a plain container, ISO-BMFF as a full box.
        .with_container(FourCC(*b"meta"), ChildLayout::Detect, None)
        .with_decoder(key(*b"ftyp"), "ftyp", Box::new(ftyp))
        .with_decoder(key(*b"mvhd"), "mvhd", Box::new(MvhdDecoder))
        .with_decoder(key(*b"tkhd"), "tkhd", Box::new(TkhdDecoder))
        .with_decoder_in(FourCC(*b"mdia"), key(*b"mdhd"), "mdhd", Box::new(MdhdDecoder))
        .with_decoder_in(FourCC(*b"mdia"), key(*b"hdlr"), "hdlr", Box::new(HdlrDecoder))
        .with_decoder_into(&QUICKTIME_METADATA, key(*b"loci"), "loci", Box::new(LociDecoder))
        .with_decoder_into(&QUICKTIME_METADATA, key(*b"keys"), "keys", Box::new(KeysDecoder))
        .with_decoder_into(&QUICKTIME_METADATA, key(*b"ilst"), "ilst", Box::new(IlstDecoder));

    TEXT_ATOMS
        .iter()
        .filter(|(typ, _)| typ[0] == 0xA9)
        .fold(base, |reg, &(typ, tag)| {
            let name = FourCC(typ).as_str_lossy();
            reg.with_decoder_into(&QUICKTIME_METADATA, key(typ), &name, Box::new(UserTextDecoder { tag }))
        })
}

fn key(typ: [u8; 4]) -> BoxKey {
    BoxKey::FourCC(FourCC(typ))
}

pub fn read_metadata<R: Read + Seek>(r: &mut R) -> Result<Metadata> {
    read_metadata_with(r, ParseOptions::default())
}

pub fn read_metadata_with<R: Read + Seek>(r: &mut R, options: ParseOptions) -> Result<Metadata> {
    let mut cur = open_source(r, Endian::Big)?;
    let end = cur.len().unwrap_or(u64::MAX);
    let mut metadata = Metadata::new();
    let root = metadata.add_directory(&QUICKTIME, None);
    walk(&mut cur, end, &registry(), &mut metadata, root, options);
    Ok(metadata)
}

fn version(full: Option<FullBoxHeader>) -> u8 {
    full.map(|f| f.version).unwrap_or(0)
}

/// Reads a 32-bit field in version 0 boxes and a 64-bit one in version 1.
fn read_versioned(payload: &mut BoxPayload, version: u8) -> Result<i64> {
    if version == 1 {
        Ok(payload.read_u64()? as i64)
    } else {
        Ok(payload.read_u32()? as i64)
    }
}

struct MvhdDecoder;

impl LeafDecoder for MvhdDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let v = version(full);
        dir.set(TAG_CREATION_TIME, read_versioned(payload, v)?);
        dir.set(TAG_MODIFICATION_TIME, read_versioned(payload, v)?);
        dir.set(TAG_TIME_SCALE, payload.read_u32()?);
        dir.set(TAG_DURATION, read_versioned(payload, v)?);
        dir.set(TAG_PREFERRED_RATE, payload.read_fixed_16_16()?);
        dir.set(TAG_PREFERRED_VOLUME, payload.read_fixed_8_8()? as f64);
        // reserved, then the display matrix
        payload.skip(10 + 36)?;
        dir.set(TAG_PREVIEW_TIME, payload.read_u32()?);
        dir.set(TAG_PREVIEW_DURATION, payload.read_u32()?);
        dir.set(TAG_POSTER_TIME, payload.read_u32()?);
        dir.set(TAG_SELECTION_TIME, payload.read_u32()?);
        dir.set(TAG_SELECTION_DURATION, payload.read_u32()?);
        dir.set(TAG_CURRENT_TIME, payload.read_u32()?);
        dir.set(TAG_NEXT_TRACK_ID, payload.read_u32()?);
        Ok(())
    }
}

struct TkhdDecoder;

impl LeafDecoder for TkhdDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let v = version(full);
        dir.set(track::TAG_CREATION_TIME, read_versioned(payload, v)?);
        dir.set(track::TAG_MODIFICATION_TIME, read_versioned(payload, v)?);
        dir.set(track::TAG_TRACK_ID, payload.read_u32()?);
        payload.skip(4)?;
        dir.set(track::TAG_DURATION, read_versioned(payload, v)?);
        payload.skip(8)?;
        dir.set(track::TAG_LAYER, payload.read_i16()?);
        dir.set(track::TAG_ALTERNATE_GROUP, payload.read_i16()?);
        dir.set(track::TAG_VOLUME, payload.read_fixed_8_8()? as f64);
        payload.skip(2 + 36)?;
        dir.set(track::TAG_WIDTH, payload.read_fixed_16_16()?);
        dir.set(track::TAG_HEIGHT, payload.read_fixed_16_16()?);
        Ok(())
    }
}

struct MdhdDecoder;

impl LeafDecoder for MdhdDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let v = version(full);
        payload.skip(if v == 1 { 16 } else { 8 })?; // creation and modification times
        dir.set(track::TAG_MEDIA_TIME_SCALE, payload.read_u32()?);
        dir.set(track::TAG_MEDIA_DURATION, read_versioned(payload, v)?);
        dir.set(track::TAG_LANGUAGE, lang_from_u16(payload.read_u16()?));
        Ok(())
    }
}

struct HdlrDecoder;

impl LeafDecoder for HdlrDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        payload.skip(4)?; // component type
        dir.set(track::TAG_HANDLER_TYPE, payload.read_string(4, TextEncoding::Ascii)?);
        payload.skip(12)?;

        // QuickTime uses a Pascal string here, ISO-BMFF a NUL-terminated one.
        let rest = payload.remaining().unwrap_or(0) as usize;
        if rest == 0 {
            return Ok(());
        }
        let name = if payload.peek_u8()? as usize == rest - 1 {
            payload.read_pascal_string(TextEncoding::Utf8)?
        } else {
            payload.read_null_terminated_string(rest, TextEncoding::Utf8)?
        };
        if !name.is_empty() {
            dir.set(track::TAG_HANDLER_NAME, name);
        }
        Ok(())
    }
}

/// udta text atom: 16-bit length, 16-bit language, then the text.
struct UserTextDecoder {
    tag: i32,
}

impl LeafDecoder for UserTextDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let len = payload.read_u16()? as usize;
        payload.skip(2)?;
        let text = payload.read_string(len, TextEncoding::Utf8)?;
        dir.set(self.tag, text);
        Ok(())
    }
}

/// loci (3GPP TS 26.244): language, name, role, coordinates, body, notes.
struct LociDecoder;

impl LeafDecoder for LociDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        dir.set(meta::TAG_LOCATION_LANGUAGE, lang_from_u16(payload.read_u16()?));
        let name = read_c_string(payload)?;
        dir.set(meta::TAG_LOCATION_NAME, name);
        dir.set(meta::TAG_LOCATION_ROLE, payload.read_u8()?);
        dir.set(meta::TAG_LONGITUDE, payload.read_fixed_16_16()?);
        dir.set(meta::TAG_LATITUDE, payload.read_fixed_16_16()?);
        dir.set(meta::TAG_ALTITUDE, payload.read_fixed_16_16()?);
        let body = read_c_string(payload)?;
        dir.set(meta::TAG_LOCATION_BODY, body);
        let note = read_c_string(payload)?;
        dir.set(meta::TAG_LOCATION_NOTE, note);
        Ok(())
    }
}

fn read_c_string(payload: &mut BoxPayload) -> Result<String> {
    let rest = payload.remaining().unwrap_or(0) as usize;
    payload.read_null_terminated_string(rest, TextEncoding::Utf8)
}

/// keys: the `mdta` key names that `ilst` items refer to by 1-based index.
struct KeysDecoder;

impl LeafDecoder for KeysDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let count = payload.read_u32()?;
        let mut keys = Vec::new();
        for _ in 0..count {
            let size = payload.read_u32()? as usize;
            payload.skip(4)?; // namespace
            keys.push(payload.read_string(size.saturating_sub(8), TextEncoding::Utf8)?);
        }
        dir.set(meta::TAG_KEYS, keys);
        Ok(())
    }
}

struct IlstDecoder;

impl LeafDecoder for IlstDecoder {
    fn decode(&self, payload: &mut BoxPayload, _hdr: &BoxHeader, _full: Option<FullBoxHeader>, dir: &mut Directory) -> Result<()> {
        let end = payload.len().unwrap_or(0);
        while let Some((item, item_end)) = next_child(payload, end)? {
            match item_tag(dir, item.typ) {
                Some(tag) => {
                    if let Err(e) = read_item(payload, item_end, tag, dir) {
                        dir.add_error(format!("ilst item '{}': {}", item.typ, e));
                    }
                }
                None => log::debug!("skipping ilst item '{}'", item.typ),
            }
            payload.seek(item_end)?;
        }
        Ok(())
    }
}

/// Items are either typed by a 4CC or, under `mdta` handlers, by a 1-based
/// index into the `keys` box. Unknown 4CC items keep their code as tag id.
fn item_tag(dir: &Directory, typ: FourCC) -> Option<i32> {
    if typ.0[0] != 0 {
        let tag = TEXT_ATOMS
            .iter()
            .find(|(t, _)| *t == typ.0)
            .map(|&(_, tag)| tag)
            .unwrap_or(typ.as_u32() as i32);
        return Some(tag);
    }
    let index = typ.as_u32() as usize;
    let Some(TagValue::Texts(keys)) = dir.get(meta::TAG_KEYS) else {
        return None;
    };
    let name = keys.get(index.checked_sub(1)?)?;
    MDTA_KEYS.iter().find(|(k, _)| *k == name.as_str()).map(|&(_, tag)| tag)
}

fn read_item(payload: &mut BoxPayload, item_end: u64, tag: i32, dir: &mut Directory) -> Result<()> {
    while let Some((child, child_end)) = next_child(payload, item_end)? {
        if &child.typ.0 == b"data" {
            let type_code = payload.read_u32()? & 0x00FF_FFFF;
            payload.skip(4)?; // locale
            let len = child_end.saturating_sub(payload.position()) as usize;
            let bytes = payload.read_bytes(len)?;
            let value = if tag == meta::TAG_ARTWORK {
                TagValue::Bytes(bytes)
            } else {
                data_value(type_code, bytes)?
            };
            dir.set(tag, value);
        }
        payload.seek(child_end)?;
    }
    Ok(())
}

/// Converts a `data` atom payload by its well-known type.
fn data_value(type_code: u32, bytes: Vec<u8>) -> Result<TagValue> {
    let n = bytes.len();
    let value = match type_code {
        1 | 4 => TagValue::Text(TextEncoding::Utf8.decode(&bytes)),
        2 | 5 => TagValue::Text(TextEncoding::Utf16Be.decode(&bytes)),
        21 if (1..=8).contains(&n) => {
            let init: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
            TagValue::Int(bytes.iter().fold(init, |acc, &b| (acc << 8) | b as i64))
        }
        22 if (1..=8).contains(&n) => TagValue::Int(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64) as i64),
        23 if n == 4 => TagValue::Float(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64),
        24 if n == 8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            TagValue::Float(f64::from_be_bytes(raw))
        }
        _ if plist::is_bplist(&bytes) => TagValue::Structured(StructuredValue::PropertyList(plist::parse(&bytes)?)),
        _ => TagValue::Bytes(bytes),
    };
    Ok(value)
}
