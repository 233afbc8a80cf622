use crate::error::{DecodeError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Byte order used by a [`ByteCursor`] read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Character encodings understood by the string readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Ascii,
    Windows1252,
    Utf8,
    Utf16Be,
    Utf16Le,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Utf16Be => encoding_rs::UTF_16BE
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            TextEncoding::Utf16Le => encoding_rs::UTF_16LE
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }

    fn unit_width(self) -> usize {
        match self {
            TextEncoding::Utf16Be | TextEncoding::Utf16Le => 2,
            _ => 1,
        }
    }
}

/// Sequential reader over a byte source with a default byte order.
///
/// Every typed read has a `_with` twin taking an explicit [`Endian`], so a
/// decoder can mix byte orders without flipping the cursor's default.
///
/// A cursor built with [`ByteCursor::new`] knows nothing about the source
/// length and reports [`DecodeError::OutOfBounds`] when the stream runs dry.
/// Cursors built with [`ByteCursor::random_access`] or
/// [`ByteCursor::from_buffer`] know their length up front, refuse reads that
/// would cross it before touching the source, and additionally support
/// absolute-offset reads via [`ByteCursor::seek`] and [`ByteCursor::read_at`].
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
    pos: u64,
    len: Option<u64>,
    endian: Endian,
}

macro_rules! typed_reads {
    ($($name:ident, $name_with:ident, $ty:ty, $width:expr;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                self.$name_with(self.endian)
            }

            pub fn $name_with(&mut self, endian: Endian) -> Result<$ty> {
                let mut buf = [0u8; $width];
                self.fill(&mut buf)?;
                Ok(match endian {
                    Endian::Big => BigEndian::$name(&buf),
                    Endian::Little => LittleEndian::$name(&buf),
                })
            }
        )*
    };
}

impl<R: Read> ByteCursor<R> {
    /// Wrap a stream whose length is unknown.
    pub fn new(inner: R, endian: Endian) -> Self {
        Self {
            inner,
            pos: 0,
            len: None,
            endian,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> Option<u64> {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// Bytes left before the end of the source, when the length is known.
    pub fn remaining(&self) -> Option<u64> {
        self.len.map(|l| l.saturating_sub(self.pos))
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check_available(&self, requested: u64) -> Result<()> {
        if let Some(len) = self.len {
            let available = len.saturating_sub(self.pos);
            if requested > available {
                return Err(DecodeError::OutOfBounds {
                    offset: self.pos,
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let requested = buf.len() as u64;
        self.check_available(requested)?;
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let offset = self.pos;
        self.pos += filled as u64;
        if filled < buf.len() {
            return Err(DecodeError::OutOfBounds {
                offset,
                requested,
                available: filled as u64,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    typed_reads! {
        read_u16, read_u16_with, u16, 2;
        read_i16, read_i16_with, i16, 2;
        read_u24, read_u24_with, u32, 3;
        read_u32, read_u32_with, u32, 4;
        read_i32, read_i32_with, i32, 4;
        read_u64, read_u64_with, u64, 8;
        read_i64, read_i64_with, i64, 8;
        read_f32, read_f32_with, f32, 4;
        read_f64, read_f64_with, f64, 8;
    }

    /// Reads a signed 16.16 fixed-point number.
    pub fn read_fixed_16_16(&mut self) -> Result<f64> {
        Ok(self.read_i32()? as f64 / 65536.0)
    }

    /// Reads an unsigned 8.8 fixed-point number.
    pub fn read_fixed_8_8(&mut self) -> Result<f32> {
        Ok(self.read_u16()? as f32 / 256.0)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let requested = count as u64;
        self.check_available(requested)?;
        if self.len.is_some() {
            let mut v = vec![0u8; count];
            self.fill(&mut v)?;
            return Ok(v);
        }
        // Unknown length: grow as data arrives instead of trusting `count`.
        let mut v = Vec::new();
        (&mut self.inner).take(requested).read_to_end(&mut v)?;
        let offset = self.pos;
        self.pos += v.len() as u64;
        if v.len() < count {
            return Err(DecodeError::OutOfBounds {
                offset,
                requested,
                available: v.len() as u64,
            });
        }
        Ok(v)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.check_available(count)?;
        let copied = io::copy(&mut (&mut self.inner).take(count), &mut io::sink())?;
        let offset = self.pos;
        self.pos += copied;
        if copied < count {
            return Err(DecodeError::OutOfBounds {
                offset,
                requested: count,
                available: copied,
            });
        }
        Ok(())
    }

    /// Fixed-length string; trailing NULs are trimmed.
    pub fn read_string(&mut self, byte_len: usize, encoding: TextEncoding) -> Result<String> {
        let mut bytes = self.read_bytes(byte_len)?;
        trim_nuls(&mut bytes, encoding.unit_width());
        Ok(encoding.decode(&bytes))
    }

    /// Reads up to `max_len` bytes, stopping after the first NUL unit.
    ///
    /// Running into `max_len` without a terminator is not an error: the
    /// bytes read so far are returned.
    pub fn read_null_terminated_string(
        &mut self,
        max_len: usize,
        encoding: TextEncoding,
    ) -> Result<String> {
        let width = encoding.unit_width();
        let mut bytes = Vec::new();
        while bytes.len() + width <= max_len {
            let mut unit = [0u8; 2];
            self.fill(&mut unit[..width])?;
            if unit[..width].iter().all(|&b| b == 0) {
                break;
            }
            bytes.extend_from_slice(&unit[..width]);
        }
        Ok(encoding.decode(&bytes))
    }

    /// A string preceded by a one-byte length.
    pub fn read_pascal_string(&mut self, encoding: TextEncoding) -> Result<String> {
        let len = self.read_u8()? as usize;
        self.read_string(len, encoding)
    }

    /// Reads `len` bytes into a new cursor that cannot see past them.
    pub fn bounded(&mut self, len: u64) -> Result<ByteCursor<Cursor<Vec<u8>>>> {
        let start = self.pos;
        let bytes = self.read_bytes(len as usize)?;
        log::trace!("bounded cursor over {} bytes at offset {}", len, start);
        Ok(ByteCursor::from_buffer(bytes, self.endian))
    }
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Wrap a seekable source, measuring its length. Reading starts at the
    /// source's current position.
    pub fn random_access(mut inner: R, endian: Endian) -> Result<Self> {
        let pos = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self {
            inner,
            pos,
            len: Some(len),
            endian,
        })
    }

    /// Moves to an absolute offset. Offsets past the end are rejected.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if let Some(len) = self.len {
            if offset > len {
                return Err(DecodeError::OutOfBounds {
                    offset,
                    requested: 0,
                    available: 0,
                });
            }
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Runs `f` at `offset` and restores the current position afterwards,
    /// whether or not `f` succeeded.
    pub fn read_at<T>(&mut self, offset: u64, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.pos;
        self.seek(offset)?;
        let out = f(self);
        self.seek(saved)?;
        out
    }

    /// Runs `f` without advancing the cursor.
    pub fn peek<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let here = self.pos;
        self.read_at(here, f)
    }

    pub fn peek_u8(&mut self) -> Result<u8> {
        self.peek(|c| c.read_u8())
    }
}

impl<B: AsRef<[u8]>> ByteCursor<Cursor<B>> {
    /// Cursor over an in-memory buffer; the length is the buffer length.
    pub fn from_buffer(buf: B, endian: Endian) -> Self {
        let len = buf.as_ref().len() as u64;
        Self {
            inner: Cursor::new(buf),
            pos: 0,
            len: Some(len),
            endian,
        }
    }

    /// Everything from the current position to the end, without copying.
    pub fn rest(&self) -> &[u8] {
        let buf = self.inner.get_ref().as_ref();
        let start = (self.pos as usize).min(buf.len());
        &buf[start..]
    }
}

fn trim_nuls(bytes: &mut Vec<u8>, width: usize) {
    while bytes.len() >= width && bytes[bytes.len() - width..].iter().all(|&b| b == 0) {
        bytes.truncate(bytes.len() - width);
    }
}
