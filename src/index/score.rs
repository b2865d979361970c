use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::storage::buffer::ByteBuffer;

/// One score directory entry. `byte_offset` points at the start of this
/// doc's posting in the posting blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreIndexEntry {
    pub doc_id: DocId,
    pub total_freq: f32,
    pub byte_offset: u32,
}

/// Per-term directory sorted by descending total frequency, letting a
/// single-word query visit postings best-first and stop early. Blob layout:
/// u32 entry count, then 12 bytes per entry, all little-endian.
#[derive(Debug, Default)]
pub struct ScoreIndex {
    pub entries: Vec<ScoreIndexEntry>,
}

impl ScoreIndex {
    pub fn new(mut entries: Vec<ScoreIndexEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.total_freq
                .partial_cmp(&a.total_freq)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        ScoreIndex { entries }
    }

    pub fn from_buffer(buf: &mut ByteBuffer) -> Result<ScoreIndex> {
        let len_bytes = buf
            .read(4)
            .ok_or_else(|| malformed("missing length prefix"))?;
        let count = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = buf.read(12).ok_or_else(|| malformed("short entry"))?;
            entries.push(ScoreIndexEntry {
                doc_id: DocId(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
                total_freq: f32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
                byte_offset: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            });
        }
        Ok(ScoreIndex { entries })
    }

    pub fn write(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write(&(self.entries.len() as u32).to_le_bytes())?;
        for entry in &self.entries {
            buf.write(&entry.doc_id.0.to_le_bytes())?;
            buf.write(&entry.total_freq.to_le_bytes())?;
            buf.write(&entry.byte_offset.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn malformed(what: &str) -> Error {
    Error::new(ErrorKind::Decode, format!("malformed score index: {}", what))
}
