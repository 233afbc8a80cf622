use mediameta::error::DecodeError;
use mediameta::formats::bmp::{self, *};
use std::io::Cursor;

fn file_header(magic: &[u8; 2]) -> Vec<u8> {
    let mut v = magic.to_vec();
    v.extend_from_slice(&[0u8; 12]);
    v
}

/// BITMAPINFOHEADER fields shared by every header of 40 bytes or more.
fn info(size: u32, width: i32, height: i32, bpp: u16, compression: u32) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&size.to_le_bytes());
    v.extend_from_slice(&width.to_le_bytes());
    v.extend_from_slice(&height.to_le_bytes());
    v.extend_from_slice(&1u16.to_le_bytes());
    v.extend_from_slice(&bpp.to_le_bytes());
    v.extend_from_slice(&compression.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes()); // image size
    v.extend_from_slice(&2835i32.to_le_bytes());
    v.extend_from_slice(&2835i32.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v
}

fn core_header(width: u16, height: u16) -> Vec<u8> {
    let mut v = 12u32.to_le_bytes().to_vec();
    for x in [width, height, 1, 8] {
        v.extend_from_slice(&x.to_le_bytes());
    }
    v
}

fn read(data: Vec<u8>) -> mediameta::Metadata {
    bmp::read_metadata(&mut Cursor::new(data)).unwrap()
}

#[test]
fn windows_info_header() {
    let mut data = file_header(b"BM");
    data.extend(info(40, 640, -480, 24, 0));
    let m = read(data);

    assert_eq!(m.directory_count(), 1);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert!(!d.has_errors(), "{:?}", d.errors());
    assert_eq!(d.description(TAG_BITMAP_TYPE).as_deref(), Some("Standard"));
    assert_eq!(d.description(TAG_HEADER_SIZE).as_deref(), Some("40 bytes"));
    assert_eq!(d.get_i64(TAG_IMAGE_WIDTH), Some(640));
    assert_eq!(d.get_i64(TAG_IMAGE_HEIGHT), Some(-480));
    assert_eq!(d.get_i64(TAG_BITS_PER_PIXEL), Some(24));
    assert_eq!(d.description(TAG_COMPRESSION).as_deref(), Some("None"));
    assert_eq!(d.get_i64(TAG_X_PIXELS_PER_METER), Some(2835));
    assert!(!d.contains(TAG_RED_MASK));
}

#[test]
fn bit_fields_masks_follow_info_header() {
    let mut data = file_header(b"BM");
    data.extend(info(40, 4, 4, 16, 3));
    for mask in [0xF800u32, 0x07E0, 0x001F] {
        data.extend_from_slice(&mask.to_le_bytes());
    }
    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert_eq!(d.description(TAG_COMPRESSION).as_deref(), Some("Bit Fields"));
    assert_eq!(d.description(TAG_RED_MASK).as_deref(), Some("0x0000F800"));
    assert_eq!(d.description(TAG_GREEN_MASK).as_deref(), Some("0x000007E0"));
    assert_eq!(d.description(TAG_BLUE_MASK).as_deref(), Some("0x0000001F"));
    assert!(!d.contains(TAG_ALPHA_MASK));
}

#[test]
fn os2_v2_header_changes_compression_meaning() {
    let mut data = file_header(b"BM");
    data.extend(info(64, 10, 10, 1, 3));
    data.extend_from_slice(&[0u8; 6]);
    data.extend_from_slice(&3u16.to_le_bytes()); // rendering
    data.extend_from_slice(&[0u8; 8]);
    data.extend_from_slice(&0u32.to_le_bytes()); // colour encoding
    data.extend_from_slice(&[0u8; 4]);
    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert!(!d.has_errors(), "{:?}", d.errors());
    assert_eq!(d.description(TAG_COMPRESSION).as_deref(), Some("Huffman 1D"));
    assert_eq!(d.description(TAG_RENDERING).as_deref(), Some("Super-circle Halftoning"));
    assert_eq!(d.description(TAG_COLOR_ENCODING).as_deref(), Some("RGB"));
}

#[test]
fn v5_header_with_linked_profile() {
    let mut data = file_header(b"BM");
    data.extend(info(124, 1, 1, 32, 6));
    for mask in [0x00FF_0000u32, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000] {
        data.extend_from_slice(&mask.to_le_bytes());
    }
    data.extend_from_slice(&0x4C49_4E4Bu32.to_le_bytes()); // 'LINK'
    data.extend_from_slice(&[0u8; 36]);
    for gamma in [0x0001_8000u32, 0x0002_0000, 0] {
        data.extend_from_slice(&gamma.to_le_bytes());
    }
    data.extend_from_slice(&4u32.to_le_bytes()); // intent
    data.extend_from_slice(&124u32.to_le_bytes()); // profile offset from DIB start
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(b"C:\\srgb.icc\0\0\0\0\0");

    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert!(!d.has_errors(), "{:?}", d.errors());
    assert_eq!(d.description(TAG_COMPRESSION).as_deref(), Some("Bit Fields"));
    assert_eq!(d.description(TAG_ALPHA_MASK).as_deref(), Some("0xFF000000"));
    assert_eq!(d.description(TAG_COLOR_SPACE_TYPE).as_deref(), Some("Linked Profile"));
    assert_eq!(d.description(TAG_GAMMA_RED).as_deref(), Some("1.5"));
    assert_eq!(d.description(TAG_GAMMA_GREEN).as_deref(), Some("2"));
    assert_eq!(d.description(TAG_GAMMA_BLUE).as_deref(), Some("0"));
    assert_eq!(d.description(TAG_INTENT).as_deref(), Some("Picture, Perceptual"));
    assert_eq!(d.get_string(TAG_LINKED_PROFILE).as_deref(), Some("C:\\srgb.icc"));
}

#[test]
fn unknown_compression_is_illegal_value() {
    let mut data = file_header(b"BM");
    data.extend(info(40, 1, 1, 8, 0x1F));
    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert_eq!(d.description(TAG_COMPRESSION).as_deref(), Some("Illegal value 0x1f"));
}

#[test]
fn truncated_header_keeps_what_was_read() {
    let mut data = file_header(b"BM");
    data.extend(info(108, 800, 600, 24, 0));
    data.extend_from_slice(&0xFFu32.to_le_bytes());
    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert_eq!(d.get_i64(TAG_IMAGE_WIDTH), Some(800));
    assert_eq!(d.get_i64(TAG_RED_MASK), Some(0xFF));
    assert!(!d.contains(TAG_GREEN_MASK));
    assert_eq!(d.errors().len(), 1);
}

#[test]
fn unsupported_header_size() {
    let mut data = file_header(b"BM");
    data.extend_from_slice(&20u32.to_le_bytes());
    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert_eq!(d.get_i64(TAG_HEADER_SIZE), Some(20));
    assert!(d.errors()[0].contains("unexpected DIB header size: 20"));
}

#[test]
fn bad_magic() {
    let m = read(b"XY\0\0\0\0\0\0\0\0\0\0\0\0".to_vec());
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert_eq!(d.description(TAG_BITMAP_TYPE).as_deref(), Some("Illegal value 0x5958"));
    assert!(d.has_errors());
}

fn array_entry(next: u32, magic: &[u8; 2], width: u16) -> Vec<u8> {
    let mut v = b"BA".to_vec();
    v.extend_from_slice(&40u32.to_le_bytes());
    v.extend_from_slice(&next.to_le_bytes());
    v.extend_from_slice(&[0u8; 4]);
    v.extend(file_header(magic));
    v.extend(core_header(width, width));
    v
}

#[test]
fn bitmap_array_gives_one_directory_per_entry() {
    let mut data = array_entry(40, b"CI", 32);
    data.extend(array_entry(0, b"CI", 16));
    assert_eq!(data.len(), 80);

    let m = read(data);
    let dirs: Vec<_> = m.of_type(&BMP_HEADER).collect();
    assert_eq!(dirs.len(), 2);
    assert_eq!(dirs[0].description(TAG_BITMAP_TYPE).as_deref(), Some("Color Icon"));
    assert_eq!(dirs[0].get_i64(TAG_IMAGE_WIDTH), Some(32));
    assert_eq!(dirs[1].get_i64(TAG_IMAGE_WIDTH), Some(16));
    assert!(!m.has_errors());
}

#[test]
fn bitmap_array_must_move_forward() {
    let mut data = array_entry(40, b"IC", 32);
    data.extend(array_entry(40, b"IC", 16));
    let m = read(data);
    let dirs: Vec<_> = m.of_type(&BMP_HEADER).collect();
    assert_eq!(dirs.len(), 2);
    assert!(dirs[1].errors()[0].contains("invalid next header offset 40"));
}

#[test]
fn nested_bitmap_array_is_rejected() {
    let data = array_entry(0, b"BA", 32);
    let m = read(data);
    let d = m.first_of(&BMP_HEADER).unwrap();
    assert_eq!(d.description(TAG_BITMAP_TYPE).as_deref(), Some("Bitmap Array"));
    assert!(d.errors()[0].contains("nested bitmap arrays"));
}

#[test]
fn empty_source_is_unavailable() {
    let err = bmp::read_metadata(&mut Cursor::new(Vec::new())).unwrap_err();
    assert!(matches!(err, DecodeError::SourceUnavailable(_)));
}
