use crate::boxes::{BoxHeader, BoxKey, FourCC, FullBoxHeader};
use crate::cursor::{ByteCursor, TextEncoding};
use crate::descriptor::Vocabulary;
use crate::directory::Directory;
use crate::error::Result;
use std::collections::HashMap;
use std::io::Cursor;

/// Cursor handed to a leaf decoder: holds exactly the box payload.
pub type BoxPayload = ByteCursor<Cursor<Vec<u8>>>;

/// Trait for box payload decoders.
///
/// A decoder interprets the payload of a specific box (identified by a
/// [`BoxKey`]) and writes what it finds into `dir`. Returning an error
/// records it on `dir`; tags already written stay.
pub trait LeafDecoder: Send + Sync {
    fn decode(
        &self,
        payload: &mut BoxPayload,
        hdr: &BoxHeader,
        full: Option<FullBoxHeader>,
        dir: &mut Directory,
    ) -> Result<()>;
}

/// Where a container's children start relative to its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLayout {
    /// Children start right after the header.
    Plain,
    /// Four bytes of version/flags precede the children.
    Full,
    /// Version/flags are present only when the first four payload bytes are
    /// zero, which no child box size can be (`meta` differs between
    /// QuickTime and ISO-BMFF).
    Detect,
}

pub enum BoxEntry {
    Container {
        layout: ChildLayout,
        /// Each occurrence opens a fresh child directory of this type.
        opens: Option<&'static Vocabulary>,
    },
    Leaf {
        decoder: Box<dyn LeafDecoder>,
        /// Write into the single directory of this type under the walk's
        /// root instead of the enclosing one.
        target: Option<&'static Vocabulary>,
        name: String,
    },
}

/// Registry of box handlers keyed by `BoxKey` (4CC or UUID), optionally
/// scoped to a parent box type.
///
/// The registry is immutable once constructed; build it fluently with the
/// `with_*` methods. Lookups try the parent-scoped entry first.
#[derive(Default)]
pub struct Registry {
    map: HashMap<(Option<FourCC>, BoxKey), BoxEntry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn with_container(
        mut self,
        typ: FourCC,
        layout: ChildLayout,
        opens: Option<&'static Vocabulary>,
    ) -> Self {
        self.map
            .insert((None, BoxKey::FourCC(typ)), BoxEntry::Container { layout, opens });
        self
    }

    /// Return a new registry with the given decoder added.
    ///
    /// `name` is human-readable and used only for error messages / logging.
    pub fn with_decoder(self, key: BoxKey, name: &str, dec: Box<dyn LeafDecoder>) -> Self {
        self.insert_leaf(None, key, None, name, dec)
    }

    /// Like [`Registry::with_decoder`] but only for boxes directly inside `parent`.
    pub fn with_decoder_in(
        self,
        parent: FourCC,
        key: BoxKey,
        name: &str,
        dec: Box<dyn LeafDecoder>,
    ) -> Self {
        self.insert_leaf(Some(parent), key, None, name, dec)
    }

    /// Like [`Registry::with_decoder`] but writing into a directory of `target`.
    pub fn with_decoder_into(
        self,
        target: &'static Vocabulary,
        key: BoxKey,
        name: &str,
        dec: Box<dyn LeafDecoder>,
    ) -> Self {
        self.insert_leaf(None, key, Some(target), name, dec)
    }

    fn insert_leaf(
        mut self,
        parent: Option<FourCC>,
        key: BoxKey,
        target: Option<&'static Vocabulary>,
        name: &str,
        dec: Box<dyn LeafDecoder>,
    ) -> Self {
        self.map.insert(
            (parent, key),
            BoxEntry::Leaf {
                decoder: dec,
                target,
                name: name.to_string(),
            },
        );
        self
    }

    /// Returns `None` if nothing is registered for the key.
    pub fn lookup(&self, parent: Option<FourCC>, key: &BoxKey) -> Option<&BoxEntry> {
        if parent.is_some() {
            if let Some(e) = self.map.get(&(parent, key.clone())) {
                return Some(e);
            }
        }
        self.map.get(&(None, key.clone()))
    }
}

// ---------- Helpers ----------

/// Packed ISO-639-2/T language code as used by `mdhd` and `loci`.
pub fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char,)
}

// ---------- Decoders ----------

/// ftyp: major + minor + compatible brands, written to the given tag ids.
pub struct FtypDecoder {
    pub major_brand: i32,
    pub minor_version: i32,
    pub compatible_brands: i32,
}

impl LeafDecoder for FtypDecoder {
    fn decode(
        &self,
        payload: &mut BoxPayload,
        _hdr: &BoxHeader,
        _full: Option<FullBoxHeader>,
        dir: &mut Directory,
    ) -> Result<()> {
        let major = payload.read_string(4, TextEncoding::Ascii)?;
        dir.set(self.major_brand, major);
        let minor = payload.read_u32()?;
        dir.set(self.minor_version, minor);

        let mut brands = Vec::new();
        while payload.remaining().unwrap_or(0) >= 4 {
            brands.push(payload.read_string(4, TextEncoding::Ascii)?);
        }
        if !brands.is_empty() {
            dir.set(self.compatible_brands, brands);
        }
        Ok(())
    }
}
