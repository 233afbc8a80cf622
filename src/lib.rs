//! Metadata extraction from photo, video and image containers.
//!
//! Decoding is split in layers: [`cursor::ByteCursor`] reads primitives with
//! explicit byte order and bounds, [`parser`] walks length-prefixed box
//! trees through a [`Registry`], decoders fill [`Directory`] values inside a
//! [`Metadata`] forest, and [`descriptor`] turns stored values into text.
//! The per-format entry points live in [`formats`].

pub mod boxes;
pub mod cursor;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod formats;
pub mod huffman;
pub mod known_boxes;
pub mod metadata;
pub mod parser;
pub mod plist;
pub mod registry;
pub mod util;

pub use boxes::{BoxHeader, BoxKey, FourCC, FullBoxHeader};
pub use cursor::{ByteCursor, Endian, TextEncoding};
pub use descriptor::{Rule, TagDef, Vocabulary};
pub use directory::{Directory, DirectoryId, StructuredValue, TagValue};
pub use error::{DecodeError, Result};
pub use metadata::{Metadata, Tag, UnknownTagTally};
pub use parser::{ParseOptions, read_box_header, walk};
pub use registry::{BoxEntry, ChildLayout, LeafDecoder, Registry};
