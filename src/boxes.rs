use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
    /// Printable form; `©` (0xA9) is kept since QuickTime user data atoms use it.
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| match c {
            32..=126 => c as char,
            0xA9 => '©',
            _ => '.',
        })
        .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

impl Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// Decoded box header. Lives only while its box is being walked.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,          // total size including header, or 0=to parent end
    pub typ: FourCC,        // 4CC or b"uuid"
    pub uuid: Option<[u8;16]>,
    pub header_size: u64,   // 8, 16, or 24
    pub start: u64,         // offset of header start
}

impl BoxHeader {
    pub fn payload_start(&self) -> u64 {
        self.start + self.header_size
    }

    /// Offset one past the last byte of this box.
    pub fn end(&self, parent_end: u64) -> u64 {
        if self.size == 0 { parent_end } else { self.start.saturating_add(self.size) }
    }

    pub fn key(&self) -> BoxKey {
        match self.uuid {
            Some(u) => BoxKey::Uuid(u),
            None => BoxKey::FourCC(self.typ),
        }
    }
}

/// Version and flags of a FullBox, peeled off before a leaf decoder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

impl fmt::Display for BoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxKey::FourCC(cc) => write!(f, "{}", cc),
            BoxKey::Uuid(u) => write!(f, "uuid:{}", hex::encode(u)),
        }
    }
}
