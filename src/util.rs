use std::io::{Read, Seek, SeekFrom};

/// Up to `len` bytes from the start of `r`; shorter sources give fewer bytes.
/// The position is left at the start.
pub fn read_head<R: Read + Seek>(r: &mut R, len: usize) -> std::io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(0))?;
    let mut v = Vec::with_capacity(len);
    r.by_ref().take(len as u64).read_to_end(&mut v)?;
    r.seek(SeekFrom::Start(0))?;
    Ok(v)
}

/// Classic 16-bytes-per-row dump: offset, hex column, printable ASCII.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let offset = start_offset + (row as u64) * 16;
        let hex_col: Vec<String> = chunk.iter().map(|b| hex::encode([*b])).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<47}  |{}|\n", offset, hex_col.join(" "), ascii));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn dump_row_layout() {
        let s = hex_dump(b"BM\x00\x01", 0x10);
        assert_eq!(s, format!("00000010  {:<47}  |BM..|\n", "42 4d 00 01"));
    }

    #[test]
    fn head_of_short_source() {
        let mut c = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(read_head(&mut c, 16).unwrap(), vec![1, 2, 3]);
        assert_eq!(c.position(), 0);
    }
}
