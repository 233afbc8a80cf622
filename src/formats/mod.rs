//! Format-specific entry decoders.
//!
//! Each submodule exposes `read_metadata`, which takes a seekable byte
//! source and always returns a [`Metadata`](crate::Metadata) unless the
//! source cannot be read at all.

pub mod bmp;
pub mod eps;
pub mod heif;
pub mod jpeg;
pub mod quicktime;

use crate::cursor::{ByteCursor, Endian};
use crate::error::{DecodeError, Result};
use std::io::{Read, Seek};

/// Wraps `r` in a random-access cursor, mapping an unreadable or empty
/// source to [`DecodeError::SourceUnavailable`].
pub(crate) fn open_source<R: Read + Seek>(r: &mut R, endian: Endian) -> Result<ByteCursor<&mut R>> {
    let cursor = ByteCursor::random_access(r, endian)
        .map_err(|e| DecodeError::SourceUnavailable(e.to_string()))?;
    if cursor.remaining() == Some(0) {
        return Err(DecodeError::SourceUnavailable("no bytes to read".into()));
    }
    Ok(cursor)
}
