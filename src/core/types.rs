use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::offsets::OffsetVector;

/// Dense document identifier, minted monotonically on first ingest of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// All fields of a document match this mask.
pub const FIELD_MASK_ALL: u8 = 0xFF;

/// Maximum number of indexable fields per document (one mask bit each).
pub const MAX_FIELDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentField {
    pub name: String,
    pub value: FieldValue,
}

/// A document as submitted for ingest. Field order is significant: field `i`
/// owns bit `i` of the posting field mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub key: String,
    pub score: f32,
    pub flags: u8,
    pub fields: Vec<DocumentField>,
}

impl Document {
    pub fn new(key: impl Into<String>, score: f32) -> Self {
        Document {
            key: key.into(),
            score,
            flags: 0,
            fields: Vec::new(),
        }
    }

    pub fn add_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(DocumentField {
            name: name.into(),
            value,
        });
        self
    }

    pub fn add_text(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.add_field(name, FieldValue::Text(text.into()))
    }

    pub fn add_number(self, name: impl Into<String>, value: f64) -> Self {
        self.add_field(name, FieldValue::Number(value))
    }
}

/// Static per-document metadata consulted during scoring.
/// Stored as a 6-byte little-endian payload in the doc table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub score: f32,
    pub flags: u16,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        DocumentMetadata {
            score: 0.0,
            flags: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitType {
    Raw,
    Exact,
}

/// Transient carrier passed between iterators during evaluation.
/// The executor pools a single hit and re-initializes it between reads.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub doc_id: DocId,
    pub flags: u8,
    pub field_mask: u8,
    pub total_freq: f32,
    pub offsets: Vec<OffsetVector>,
    pub hit_type: HitType,
}

impl IndexHit {
    pub fn new() -> Self {
        IndexHit {
            doc_id: DocId(0),
            flags: 0,
            field_mask: 0,
            total_freq: 0.0,
            offsets: Vec::new(),
            hit_type: HitType::Raw,
        }
    }

    /// Reset for reuse without dropping the offsets allocation.
    pub fn init(&mut self) {
        self.doc_id = DocId(0);
        self.flags = 0;
        self.field_mask = 0;
        self.total_freq = 0.0;
        self.offsets.clear();
        self.hit_type = HitType::Raw;
    }
}

impl Default for IndexHit {
    fn default() -> Self {
        Self::new()
    }
}
