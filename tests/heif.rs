use mediameta::error::DecodeError;
use mediameta::formats::heif::{self, *};
use mediameta::parser::ParseOptions;
use std::io::Cursor;

fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

fn full(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut p = vec![0, 0, 0, 0];
    p.extend_from_slice(payload);
    bx(typ, &p)
}

fn ispe(width: u32, height: u32) -> Vec<u8> {
    let mut p = width.to_be_bytes().to_vec();
    p.extend_from_slice(&height.to_be_bytes());
    full(b"ispe", &p)
}

fn sample(properties: Vec<u8>) -> Vec<u8> {
    let mut data = bx(b"ftyp", b"heic\0\0\0\0mif1heic");
    let ipco = bx(b"ipco", &properties);
    let iprp = bx(b"iprp", &ipco);
    data.extend(full(b"meta", &[full(b"hdlr", b"\0\0\0\0pict"), iprp].concat()));
    data.extend(bx(b"mdat", &[0u8; 16]));
    data
}

#[test]
fn brands_and_item_properties() {
    let props = [ispe(4032, 3024), bx(b"irot", &[0x01]), full(b"pixi", &[3, 8, 8, 8])].concat();
    let m = heif::read_metadata(&mut Cursor::new(sample(props))).unwrap();

    assert_eq!(m.directory_count(), 1);
    let d = m.first_of(&HEIF).unwrap();
    assert!(!d.has_errors(), "{:?}", d.errors());
    assert_eq!(d.get_string(TAG_MAJOR_BRAND).as_deref(), Some("heic"));
    assert_eq!(d.get_i64(TAG_MINOR_VERSION), Some(0));
    assert_eq!(d.description(TAG_COMPATIBLE_BRANDS).as_deref(), Some("mif1, heic"));
    assert_eq!(d.description(TAG_IMAGE_WIDTH).as_deref(), Some("4032 pixels"));
    assert_eq!(d.get_i64(TAG_IMAGE_HEIGHT), Some(3024));
    assert_eq!(d.description(TAG_IMAGE_ROTATION).as_deref(), Some("90 degrees"));
    assert_eq!(d.description(TAG_BITS_PER_CHANNEL).as_deref(), Some("8 8 8"));
}

#[test]
fn first_property_wins() {
    // Thumbnail properties follow the primary image's.
    let props = [
        ispe(1920, 1080),
        bx(b"irot", &[0x03]),
        ispe(320, 240),
        bx(b"irot", &[0x01]),
    ]
    .concat();
    let m = heif::read_metadata(&mut Cursor::new(sample(props))).unwrap();
    let d = m.first_of(&HEIF).unwrap();
    assert_eq!(d.get_i64(TAG_IMAGE_WIDTH), Some(1920));
    assert_eq!(d.get_i64(TAG_IMAGE_HEIGHT), Some(1080));
    assert_eq!(d.description(TAG_IMAGE_ROTATION).as_deref(), Some("270 degrees"));
}

#[test]
fn reserved_rotation_bits_are_ignored() {
    let m = heif::read_metadata(&mut Cursor::new(sample(bx(b"irot", &[0xFE])))).unwrap();
    let d = m.first_of(&HEIF).unwrap();
    assert_eq!(d.description(TAG_IMAGE_ROTATION).as_deref(), Some("180 degrees"));
}

#[test]
fn truncated_property_is_recorded() {
    let props = [full(b"ispe", &[0, 0, 1]), bx(b"irot", &[0x02])].concat();
    let m = heif::read_metadata(&mut Cursor::new(sample(props))).unwrap();
    let d = m.first_of(&HEIF).unwrap();
    assert!(!d.contains(TAG_IMAGE_WIDTH));
    assert_eq!(d.errors().len(), 1);
    assert!(d.errors()[0].starts_with("ispe box:"), "{}", d.errors()[0]);
    assert_eq!(d.get_i64(TAG_IMAGE_ROTATION), Some(2));
}

#[test]
fn depth_limit_is_configurable() {
    let props = ispe(64, 64);
    let m = heif::read_metadata_with(&mut Cursor::new(sample(props)), ParseOptions { max_depth: 1 }).unwrap();
    let d = m.first_of(&HEIF).unwrap();
    assert_eq!(d.get_string(TAG_MAJOR_BRAND).as_deref(), Some("heic"));
    assert!(!d.contains(TAG_IMAGE_WIDTH));
    assert!(d.has_errors());
}

#[test]
fn empty_source_is_unavailable() {
    let err = heif::read_metadata(&mut Cursor::new(Vec::new())).unwrap_err();
    assert!(matches!(err, DecodeError::SourceUnavailable(_)));
}
