use mediameta::formats::eps::{self, *};
use std::io::Cursor;

const HEADER: &str = "%!PS-Adobe-3.0 EPSF-3.0\r\n\
%%Creator: Sketcher 2.1\r\n\
%%Title: (harbour.eps)\r\n\
%%BoundingBox: 0 0 320 200\r\n\
%%DocumentData: Clean7Bit\r\n\
%%Keywords: boats\n\
%%+ water night\n\
%ImageData: 320 200 8 3 0 1 2 \"beginimage\"\r\n\
%%EndComments\r\n\
%%Title: ignored after end of comments\r\n";

fn read(data: Vec<u8>) -> mediameta::Metadata {
    eps::read_metadata(&mut Cursor::new(data)).unwrap()
}

#[test]
fn plain_postscript_header_comments() {
    let m = read(HEADER.as_bytes().to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert!(!d.has_errors(), "{:?}", d.errors());
    assert_eq!(d.get_string(TAG_DSC_VERSION).as_deref(), Some("3.0 EPSF-3.0"));
    assert_eq!(d.get_string(TAG_CREATOR).as_deref(), Some("Sketcher 2.1"));
    assert_eq!(d.get_string(TAG_TITLE).as_deref(), Some("(harbour.eps)"));
    assert_eq!(d.get_string(TAG_BOUNDING_BOX).as_deref(), Some("0 0 320 200"));
    assert_eq!(d.get_string(TAG_DOCUMENT_DATA).as_deref(), Some("Clean7Bit"));
}

#[test]
fn continuation_lines_append_to_previous_comment() {
    let m = read(HEADER.as_bytes().to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.get_string(TAG_KEYWORDS).as_deref(), Some("boats water night"));
}

#[test]
fn image_data_fills_dimensions() {
    let m = read(HEADER.as_bytes().to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.description(TAG_IMAGE_WIDTH).as_deref(), Some("320 pixels"));
    assert_eq!(d.get_i64(TAG_IMAGE_HEIGHT), Some(200));
    assert_eq!(d.description(TAG_COLOR_TYPE).as_deref(), Some("RGB"));
    assert_eq!(d.get_i64(TAG_RAM_SIZE), Some(3 * 320 * 200));
}

#[test]
fn oversized_image_data_is_an_error() {
    let m = read(b"%!PS-Adobe-3.0 EPSF-3.0\n%ImageData: 9999999999 9999999999 8 3 0 1 2\n".to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.get_i64(TAG_IMAGE_WIDTH), Some(9_999_999_999));
    assert!(!d.contains(TAG_RAM_SIZE));
    assert_eq!(d.errors().len(), 1);
    assert!(d.errors()[0].contains("too large"), "{}", d.errors()[0]);
}

#[test]
fn stops_at_first_non_comment_line() {
    let m = read(b"%!PS-Adobe-2.0\n%%Creator: a\nnewpath\n%%Title: late\n".to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.get_string(TAG_CREATOR).as_deref(), Some("a"));
    assert!(!d.contains(TAG_TITLE));
}

#[test]
fn lone_carriage_returns_split_lines() {
    let m = read(b"%!PS-Adobe-3.0\r%%For: press\r%%Pages: 1\r".to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.get_string(TAG_FOR).as_deref(), Some("press"));
    assert_eq!(d.get_string(TAG_PAGES).as_deref(), Some("1"));
}

#[test]
fn binary_header_points_at_postscript_and_previews() {
    let ps = b"%!PS-Adobe-3.0 EPSF-3.0\n%%Creator: bin\n%%EndComments\n";
    let ps_offset = 30u32;
    let tiff_offset = ps_offset + ps.len() as u32;

    let mut data = BINARY_MAGIC.to_be_bytes().to_vec();
    for field in [ps_offset, ps.len() as u32, 0, 0, tiff_offset, 4] {
        data.extend_from_slice(&field.to_le_bytes());
    }
    data.extend_from_slice(&[0xFF, 0xFF]);
    data.extend_from_slice(ps);
    data.extend_from_slice(b"II*\0");

    let m = read(data);
    let d = m.first_of(&EPS).unwrap();
    assert!(!d.has_errors(), "{:?}", d.errors());
    assert_eq!(d.get_string(TAG_CREATOR).as_deref(), Some("bin"));
    assert_eq!(d.get_i64(TAG_TIFF_PREVIEW_OFFSET), Some(tiff_offset as i64));
    assert_eq!(d.description(TAG_TIFF_PREVIEW_SIZE).as_deref(), Some("4 bytes"));
    assert!(!d.contains(TAG_WMF_PREVIEW_OFFSET));
}

#[test]
fn postscript_section_length_bounds_the_scan() {
    let ps = b"%!PS-Adobe-3.0\n%%Creator: bin\n";
    let mut data = BINARY_MAGIC.to_be_bytes().to_vec();
    for field in [30u32, 15, 0, 0, 0, 0] {
        data.extend_from_slice(&field.to_le_bytes());
    }
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(ps);

    let m = read(data);
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.get_string(TAG_DSC_VERSION).as_deref(), Some("3.0"));
    assert!(!d.contains(TAG_CREATOR));
}

#[test]
fn other_files_are_rejected() {
    let m = read(b"GIF89a....".to_vec());
    let d = m.first_of(&EPS).unwrap();
    assert_eq!(d.tag_count(), 0);
    assert!(d.errors()[0].contains("not an EPS file"));
}
