use mediameta::cursor::{ByteCursor, Endian, TextEncoding};
use mediameta::error::DecodeError;
use proptest::prelude::*;
use std::io::Cursor;

fn buf(bytes: Vec<u8>, endian: Endian) -> ByteCursor<Cursor<Vec<u8>>> {
    ByteCursor::from_buffer(bytes, endian)
}

fn encode<const N: usize>(be: [u8; N], le: [u8; N], endian: Endian) -> Vec<u8> {
    match endian {
        Endian::Big => be.to_vec(),
        Endian::Little => le.to_vec(),
    }
}

fn endian() -> impl Strategy<Value = Endian> {
    prop_oneof![Just(Endian::Big), Just(Endian::Little)]
}

proptest! {
    #[test]
    fn u16_round_trip(v in any::<u16>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_u16().unwrap(), v);
    }

    #[test]
    fn i16_round_trip(v in any::<i16>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_i16().unwrap(), v);
    }

    #[test]
    fn u32_round_trip(v in any::<u32>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_u32().unwrap(), v);
    }

    #[test]
    fn i32_round_trip(v in any::<i32>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_i32().unwrap(), v);
    }

    #[test]
    fn u64_round_trip(v in any::<u64>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_u64().unwrap(), v);
    }

    #[test]
    fn i64_round_trip(v in any::<i64>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_i64().unwrap(), v);
    }

    #[test]
    fn f64_round_trip_bits(v in any::<f64>(), e in endian()) {
        let mut c = buf(encode(v.to_be_bytes(), v.to_le_bytes(), e), e);
        prop_assert_eq!(c.read_f64().unwrap().to_bits(), v.to_bits());
    }

    #[test]
    fn explicit_order_overrides_default(v in any::<u32>()) {
        let mut c = buf(v.to_le_bytes().to_vec(), Endian::Big);
        prop_assert_eq!(c.read_u32_with(Endian::Little).unwrap(), v);
    }
}

#[test]
fn sign_follows_byte_order() {
    let mut c = buf(vec![0xFF, 0xFE, 0xFE, 0xFF], Endian::Big);
    assert_eq!(c.read_i16().unwrap(), -2);
    assert_eq!(c.read_i16_with(Endian::Little).unwrap(), -2);
}

#[test]
fn reading_past_end_is_out_of_bounds() {
    let mut c = buf(vec![1, 2, 3], Endian::Big);
    match c.read_u32() {
        Err(DecodeError::OutOfBounds { offset, requested, available }) => {
            assert_eq!((offset, requested, available), (0, 4, 3));
        }
        other => panic!("expected OutOfBounds, got {:?}", other),
    }
    // Nothing was consumed by the refused read.
    assert_eq!(c.position(), 0);
    assert_eq!(c.read_u16().unwrap(), 0x0102);
}

#[test]
fn streaming_source_reports_short_read() {
    let data: &[u8] = &[0xAB, 0xCD];
    let mut c = ByteCursor::new(data, Endian::Big);
    assert!(c.len().is_none());
    assert!(matches!(c.read_u32(), Err(DecodeError::OutOfBounds { available: 2, .. })));
}

#[test]
fn seek_past_end_is_rejected() {
    let mut src = Cursor::new(vec![0u8; 8]);
    let mut c = ByteCursor::random_access(&mut src, Endian::Big).unwrap();
    assert!(c.seek(8).is_ok());
    assert!(matches!(c.seek(9), Err(DecodeError::OutOfBounds { offset: 9, .. })));
}

#[test]
fn read_at_restores_position() {
    let mut c = buf(vec![0x00, 0x01, 0x02, 0x03, 0x04], Endian::Big);
    c.skip(1).unwrap();
    let v = c.read_at(3, |c| c.read_u16()).unwrap();
    assert_eq!(v, 0x0304);
    assert_eq!(c.position(), 1);
    assert_eq!(c.peek_u8().unwrap(), 0x01);
    assert_eq!(c.position(), 1);
}

#[test]
fn strings() {
    let mut c = buf(b"abc\0\0\x03xyzhi\0rest".to_vec(), Endian::Big);
    assert_eq!(c.read_string(5, TextEncoding::Ascii).unwrap(), "abc");
    assert_eq!(c.read_pascal_string(TextEncoding::Utf8).unwrap(), "xyz");
    assert_eq!(c.read_null_terminated_string(16, TextEncoding::Utf8).unwrap(), "hi");
    assert_eq!(c.read_null_terminated_string(2, TextEncoding::Utf8).unwrap(), "re");
    assert_eq!(c.position(), 14);
}

#[test]
fn utf16_strings() {
    let mut c = buf(vec![0x00, b'O', 0x00, b'K', 0x00, 0x00], Endian::Big);
    assert_eq!(c.read_null_terminated_string(6, TextEncoding::Utf16Be).unwrap(), "OK");
}

#[test]
fn fixed_point_reads() {
    let mut c = buf(vec![0x00, 0x01, 0x80, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x01, 0x80], Endian::Big);
    assert_eq!(c.read_fixed_16_16().unwrap(), 1.5);
    assert_eq!(c.read_fixed_16_16().unwrap(), -1.0);
    assert_eq!(c.read_fixed_8_8().unwrap(), 1.5);
}

#[test]
fn bounded_cursor_cannot_see_past_its_window() {
    let mut c = buf(vec![1, 2, 3, 4, 5, 6], Endian::Big);
    c.skip(1).unwrap();
    let mut sub = c.bounded(2).unwrap();
    assert_eq!(c.position(), 3);
    assert_eq!(sub.read_u16().unwrap(), 0x0203);
    assert!(sub.read_u8().is_err());
}
