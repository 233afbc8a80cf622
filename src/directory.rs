use crate::descriptor::Vocabulary;
use crate::huffman::HuffmanTable;
use crate::plist::PropertyList;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Position of a directory inside its owning [`Metadata`](crate::Metadata).
///
/// Parent links are stored as ids, never as references, so the directory
/// forest cannot form an ownership cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DirectoryId(pub(crate) usize);

impl DirectoryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Ints(Vec<i64>),
    Texts(Vec<String>),
    Structured(StructuredValue),
}

/// Records that do not reduce to a scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StructuredValue {
    HuffmanTables(Vec<HuffmanTable>),
    PropertyList(PropertyList),
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}
impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::Int(v as i64)
    }
}
impl From<u32> for TagValue {
    fn from(v: u32) -> Self {
        TagValue::Int(v as i64)
    }
}
impl From<i16> for TagValue {
    fn from(v: i16) -> Self {
        TagValue::Int(v as i64)
    }
}

impl From<u16> for TagValue {
    fn from(v: u16) -> Self {
        TagValue::Int(v as i64)
    }
}
impl From<u8> for TagValue {
    fn from(v: u8) -> Self {
        TagValue::Int(v as i64)
    }
}
impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Float(v)
    }
}
impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Text(v)
    }
}
impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Text(v.to_string())
    }
}
impl From<Vec<u8>> for TagValue {
    fn from(v: Vec<u8>) -> Self {
        TagValue::Bytes(v)
    }
}
impl From<Vec<String>> for TagValue {
    fn from(v: Vec<String>) -> Self {
        TagValue::Texts(v)
    }
}
impl From<StructuredValue> for TagValue {
    fn from(v: StructuredValue) -> Self {
        TagValue::Structured(v)
    }
}

/// Generic rendering used when a vocabulary has no rule for a tag.
impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(v) => write!(f, "{}", v),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Text(s) => f.write_str(s),
            TagValue::Bytes(b) => write!(f, "[{} bytes]", b.len()),
            TagValue::Ints(v) => {
                let parts: Vec<String> = v.iter().map(|i| i.to_string()).collect();
                f.write_str(&parts.join(" "))
            }
            TagValue::Texts(v) => f.write_str(&v.join(", ")),
            TagValue::Structured(StructuredValue::HuffmanTables(t)) => {
                write!(f, "[{} Huffman tables]", t.len())
            }
            TagValue::Structured(StructuredValue::PropertyList(p)) => f.write_str(&p.to_xml()),
        }
    }
}

/// One logical block of decoded metadata: tags keyed by id, in insertion order.
///
/// Errors found while filling a directory are collected on it instead of
/// being raised, so a directory with errors still exposes every tag that
/// was read before (and after) the failure.
#[derive(Debug)]
pub struct Directory {
    id: DirectoryId,
    vocabulary: &'static Vocabulary,
    parent: Option<DirectoryId>,
    tags: Vec<(i32, TagValue)>,
    index: HashMap<i32, usize>,
    errors: Vec<String>,
}

impl Directory {
    pub(crate) fn new(id: DirectoryId, vocabulary: &'static Vocabulary, parent: Option<DirectoryId>) -> Self {
        Self {
            id,
            vocabulary,
            parent,
            tags: Vec::new(),
            index: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn id(&self) -> DirectoryId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.vocabulary.name
    }

    pub fn vocabulary(&self) -> &'static Vocabulary {
        self.vocabulary
    }

    pub fn is(&self, vocabulary: &'static Vocabulary) -> bool {
        std::ptr::eq(self.vocabulary, vocabulary)
    }

    pub fn parent(&self) -> Option<DirectoryId> {
        self.parent
    }

    /// Stores a value; a second write to the same id replaces the first
    /// but keeps its original position.
    pub fn set(&mut self, tag: i32, value: impl Into<TagValue>) {
        let value = value.into();
        match self.index.get(&tag) {
            Some(&i) => self.tags[i].1 = value,
            None => {
                self.index.insert(tag, self.tags.len());
                self.tags.push((tag, value));
            }
        }
    }

    pub fn get(&self, tag: i32) -> Option<&TagValue> {
        self.index.get(&tag).map(|&i| &self.tags[i].1)
    }

    pub fn contains(&self, tag: i32) -> bool {
        self.index.contains_key(&tag)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// (id, value) pairs in insertion order. Each call starts over.
    pub fn tags(&self) -> impl Iterator<Item = (i32, &TagValue)> + '_ {
        self.tags.iter().map(|(id, v)| (*id, v))
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", self.name(), message);
        self.errors.push(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn get_i64(&self, tag: i32) -> Option<i64> {
        match self.get(tag)? {
            TagValue::Int(v) => Some(*v),
            TagValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            TagValue::Text(s) => s.trim().parse().ok(),
            TagValue::Ints(v) if v.len() == 1 => Some(v[0]),
            TagValue::Bytes(b) if b.len() == 1 => Some(b[0] as i64),
            _ => None,
        }
    }

    pub fn get_i32(&self, tag: i32) -> Option<i32> {
        self.get_i64(tag).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_f64(&self, tag: i32) -> Option<f64> {
        match self.get(tag)? {
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
            TagValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_string(&self, tag: i32) -> Option<String> {
        match self.get(tag)? {
            TagValue::Text(s) => Some(s.clone()),
            TagValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            TagValue::Structured(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn get_bytes(&self, tag: i32) -> Option<&[u8]> {
        match self.get(tag)? {
            TagValue::Bytes(b) => Some(b),
            TagValue::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn get_structured(&self, tag: i32) -> Option<&StructuredValue> {
        match self.get(tag)? {
            TagValue::Structured(s) => Some(s),
            _ => None,
        }
    }

    pub fn tag_name(&self, tag: i32) -> String {
        match self.vocabulary.tag_name(tag) {
            Some(name) => name.to_string(),
            None => format!("Unknown tag ({:#06x})", tag),
        }
    }

    pub fn has_tag_name(&self, tag: i32) -> bool {
        self.vocabulary.tag_name(tag).is_some()
    }

    pub fn description(&self, tag: i32) -> Option<String> {
        self.vocabulary.describe(self, tag)
    }
}
