//! Error types shared by the cursor, the box parser and the format decoders.
//!
//! Only [`DecodeError::SourceUnavailable`] ever escapes a `read_metadata`
//! entry point. Everything else is caught by the decoder that raised it and
//! stored on a [`Directory`](crate::Directory) as a text error.

use crate::boxes::FourCC;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// A read asked for more bytes than the source has left.
    #[error("attempted to read {requested} bytes at offset {offset}, but only {available} available")]
    OutOfBounds {
        offset: u64,
        requested: u64,
        available: u64,
    },

    /// A box header whose length cannot fit the enclosing bounds.
    #[error("malformed '{typ}' box at offset {offset}: {reason}")]
    MalformedContainer {
        typ: FourCC,
        offset: u64,
        reason: &'static str,
    },

    /// A property list object that refers back to one of its ancestors.
    ///
    /// Part of the error vocabulary for callers; [`crate::plist::parse`]
    /// itself marks such references with `PlistValue::Cycle` and keeps going.
    #[error("object {object} refers to one of its own ancestors")]
    CycleDetected { object: u64 },

    /// Structurally invalid data that is not a bounds problem.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The byte source could not be read at all.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
