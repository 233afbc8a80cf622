use crate::descriptor::Vocabulary;
use crate::directory::{Directory, DirectoryId, TagValue};
use std::collections::BTreeMap;

/// Every directory produced by one decode, in creation order.
///
/// Directories form a forest: each may name a parent by [`DirectoryId`],
/// and any number of them may have none.
#[derive(Debug, Default)]
pub struct Metadata {
    directories: Vec<Directory>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty directory. A `parent` that does not exist yet is
    /// dropped rather than stored dangling.
    pub fn add_directory(
        &mut self,
        vocabulary: &'static Vocabulary,
        parent: Option<DirectoryId>,
    ) -> DirectoryId {
        let id = DirectoryId(self.directories.len());
        let parent = parent.filter(|p| p.0 < self.directories.len());
        log::debug!("new directory {} ({:?}, parent {:?})", vocabulary.name, id, parent);
        self.directories.push(Directory::new(id, vocabulary, parent));
        id
    }

    pub fn directory(&self, id: DirectoryId) -> Option<&Directory> {
        self.directories.get(id.0)
    }

    pub fn directory_mut(&mut self, id: DirectoryId) -> Option<&mut Directory> {
        self.directories.get_mut(id.0)
    }

    pub fn directories(&self) -> impl Iterator<Item = &Directory> + '_ {
        self.directories.iter()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn of_type(&self, vocabulary: &'static Vocabulary) -> impl Iterator<Item = &Directory> + '_ {
        self.directories.iter().filter(move |d| d.is(vocabulary))
    }

    pub fn first_of(&self, vocabulary: &'static Vocabulary) -> Option<&Directory> {
        self.of_type(vocabulary).next()
    }

    pub fn parent_of(&self, dir: &Directory) -> Option<&Directory> {
        dir.parent().and_then(|p| self.directory(p))
    }

    pub fn children(&self, id: DirectoryId) -> impl Iterator<Item = &Directory> + '_ {
        self.directories.iter().filter(move |d| d.parent() == Some(id))
    }

    pub fn has_errors(&self) -> bool {
        self.directories.iter().any(Directory::has_errors)
    }

    /// All tags of all directories, directory by directory.
    pub fn tags(&self) -> impl Iterator<Item = Tag<'_>> + '_ {
        self.directories
            .iter()
            .flat_map(|d| d.tags().map(move |(id, _)| Tag { directory: d, id }))
    }
}

/// A tag id seen through its directory; built on demand, never stored.
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    directory: &'a Directory,
    id: i32,
}

impl<'a> Tag<'a> {
    pub fn new(directory: &'a Directory, id: i32) -> Self {
        Self { directory, id }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn directory_name(&self) -> &'static str {
        self.directory.name()
    }

    pub fn name(&self) -> String {
        self.directory.tag_name(self.id)
    }

    pub fn has_name(&self) -> bool {
        self.directory.has_tag_name(self.id)
    }

    pub fn value(&self) -> Option<&'a TagValue> {
        self.directory.get(self.id)
    }

    pub fn description(&self) -> Option<String> {
        self.directory.description(self.id)
    }

    /// `0x%04x` form used by text reports.
    pub fn id_hex(&self) -> String {
        format!("{:#06x}", self.id)
    }
}

/// Caller-owned tally of tags that have no name in their vocabulary.
#[derive(Debug, Default)]
pub struct UnknownTagTally {
    counts: BTreeMap<&'static str, BTreeMap<i32, usize>>,
}

impl UnknownTagTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metadata: &Metadata) {
        for dir in metadata.directories() {
            for (id, _) in dir.tags() {
                if dir.has_tag_name(id) {
                    continue;
                }
                *self
                    .counts
                    .entry(dir.name())
                    .or_default()
                    .entry(id)
                    .or_insert(0) += 1;
            }
        }
    }

    /// `(directory, tag, count)` rows, most frequent first within each directory.
    pub fn rows(&self) -> Vec<(&'static str, i32, usize)> {
        let mut out = Vec::new();
        for (dir, tags) in &self.counts {
            let mut by_count: Vec<(i32, usize)> = tags.iter().map(|(t, c)| (*t, *c)).collect();
            by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            out.extend(by_count.into_iter().map(|(t, c)| (*dir, t, c)));
        }
        out
    }
}
