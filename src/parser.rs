use crate::boxes::{BoxHeader, FourCC, FullBoxHeader};
use crate::cursor::ByteCursor;
use crate::descriptor::Vocabulary;
use crate::directory::DirectoryId;
use crate::error::{DecodeError, Result};
use crate::known_boxes::KnownBox;
use crate::metadata::Metadata;
use crate::registry::{BoxEntry, ChildLayout, LeafDecoder, Registry};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Smallest possible box: 32-bit size + 4CC.
const MIN_HEADER: u64 = 8;

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Containers nested deeper than this are reported and not entered.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

pub fn read_box_header<R: Read>(r: &mut ByteCursor<R>) -> Result<BoxHeader> {
    let start = r.position();
    let size32 = r.read_u32()?;
    let typ = FourCC(r.read_array::<4>()?);
    let mut size = size32 as u64;

    if size32 == 1 {
        size = r.read_u64()?;
    }

    let mut uuid = None;
    if &typ.0 == b"uuid" {
        uuid = Some(r.read_array::<16>()?);
    }

    let header_size = match (size32 == 1, &typ.0 == b"uuid") {
        (true, true)  => 8 + 8 + 16,
        (true, false) => 8 + 8,
        (false, true) => 8 + 16,
        (false, false)=> 8,
    } as u64;

    if size != 0 && size < header_size {
        return Err(DecodeError::MalformedContainer {
            typ,
            offset: start,
            reason: "declared size is smaller than its header",
        });
    }

    Ok(BoxHeader { size, typ, uuid, header_size, start })
}

/// Reads the next box header inside `[position, parent_end)` and returns it
/// with its end offset.
///
/// Returns `Ok(None)` once fewer than eight bytes are left; QuickTime pads
/// some containers with a four-byte zero terminator. A box that would end
/// past `parent_end`, or would not move the cursor forward, is an error.
pub fn next_child<R: Read>(r: &mut ByteCursor<R>, parent_end: u64) -> Result<Option<(BoxHeader, u64)>> {
    let pos = r.position();
    if pos >= parent_end || parent_end - pos < MIN_HEADER {
        return Ok(None);
    }
    let h = read_box_header(r)?;
    let end = h.end(parent_end);
    if end > parent_end {
        return Err(DecodeError::MalformedContainer {
            typ: h.typ,
            offset: h.start,
            reason: "extends past the end of its parent",
        });
    }
    if end <= h.start || end < h.payload_start() {
        return Err(DecodeError::MalformedContainer {
            typ: h.typ,
            offset: h.start,
            reason: "does not advance past its own header",
        });
    }
    Ok(Some((h, end)))
}

/// Walks the boxes in `[position, end)`, dispatching each through `registry`
/// and recording problems on the directories involved.
///
/// Never fails: a malformed box stops the walk of its own level only, and
/// the caller's level continues with the next sibling.
pub fn walk<R: Read + Seek>(
    r: &mut ByteCursor<R>,
    end: u64,
    registry: &Registry,
    metadata: &mut Metadata,
    root: DirectoryId,
    options: ParseOptions,
) {
    let mut walker = Walker {
        registry,
        options,
        metadata,
        root,
        targets: HashMap::new(),
    };
    walker.walk_children(r, end, root, None, 0);
}

struct Walker<'a> {
    registry: &'a Registry,
    options: ParseOptions,
    metadata: &'a mut Metadata,
    root: DirectoryId,
    targets: HashMap<&'static str, DirectoryId>,
}

impl Walker<'_> {
    fn error(&mut self, dir: DirectoryId, e: impl std::fmt::Display) {
        if let Some(d) = self.metadata.directory_mut(dir) {
            d.add_error(e.to_string());
        }
    }

    fn walk_children<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        parent_end: u64,
        dir: DirectoryId,
        parent: Option<FourCC>,
        depth: usize,
    ) {
        loop {
            let (h, box_end) = match next_child(r, parent_end) {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => {
                    self.error(dir, e);
                    break;
                }
            };

            let registry = self.registry;
            match registry.lookup(parent, &h.key()) {
                Some(BoxEntry::Container { layout, opens }) => {
                    if depth + 1 > self.options.max_depth {
                        self.error(
                            dir,
                            format!("'{}' at offset {} nested deeper than {} levels", h.typ, h.start, self.options.max_depth),
                        );
                    } else {
                        let child_dir = match *opens {
                            Some(v) => self.metadata.add_directory(v, Some(dir)),
                            None => dir,
                        };
                        match skip_container_prefix(r, box_end, *layout) {
                            Ok(()) => self.walk_children(r, box_end, child_dir, Some(h.typ), depth + 1),
                            Err(e) => self.error(child_dir, e),
                        }
                    }
                }
                Some(BoxEntry::Leaf { decoder, target, name }) => {
                    let out = match *target {
                        Some(v) => self.target(v),
                        None => dir,
                    };
                    self.decode_leaf(r, &h, box_end, decoder.as_ref(), name, out);
                }
                None => {
                    log::trace!("skipping '{}' ({}) at offset {}", h.key(), KnownBox::from(h.typ).full_name(), h.start);
                }
            }

            // Skip to end of box
            if let Err(e) = r.seek(box_end) {
                self.error(dir, e);
                break;
            }
        }
    }

    fn target(&mut self, v: &'static Vocabulary) -> DirectoryId {
        let root = self.root;
        let metadata = &mut *self.metadata;
        *self
            .targets
            .entry(v.name)
            .or_insert_with(|| metadata.add_directory(v, Some(root)))
    }

    fn decode_leaf<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        h: &BoxHeader,
        box_end: u64,
        decoder: &dyn LeafDecoder,
        name: &str,
        out: DirectoryId,
    ) {
        let full = if h.uuid.is_none() && KnownBox::from(h.typ).is_full_box() {
            match read_full_box_header(r) {
                Ok(f) => Some(f),
                Err(e) => {
                    self.error(out, format!("{} box: {}", name, e));
                    return;
                }
            }
        } else {
            None
        };

        let len = box_end.saturating_sub(r.position());
        let mut payload = match r.bounded(len) {
            Ok(p) => p,
            Err(e) => {
                self.error(out, format!("{} box: {}", name, e));
                return;
            }
        };

        if let Some(dir) = self.metadata.directory_mut(out) {
            if let Err(e) = decoder.decode(&mut payload, h, full, dir) {
                dir.add_error(format!("{} box: {}", name, e));
            }
        }
    }
}

pub fn read_full_box_header<R: Read>(r: &mut ByteCursor<R>) -> Result<FullBoxHeader> {
    let version = r.read_u8()?;
    let flags = r.read_u24()?;
    Ok(FullBoxHeader { version, flags })
}

fn skip_container_prefix<R: Read + Seek>(r: &mut ByteCursor<R>, box_end: u64, layout: ChildLayout) -> Result<()> {
    let has_prefix = match layout {
        ChildLayout::Plain => false,
        ChildLayout::Full => true,
        ChildLayout::Detect => {
            box_end.saturating_sub(r.position()) >= 4 && r.peek(|c| c.read_u32())? == 0
        }
    };
    if has_prefix {
        r.skip(4)?;
    }
    Ok(())
}
