use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::storage::buffer::ByteBuffer;

/// One sparse directory entry: the doc id of the last posting before
/// `byte_offset`, which is a decoding-safe boundary in the posting blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    pub doc_id: DocId,
    pub byte_offset: u32,
}

/// Sparse `(doc id, byte offset)` directory over a posting list, ascending
/// by doc id. Blob layout: u32 entry count, then 8 bytes per entry, all
/// little-endian.
#[derive(Debug, Default)]
pub struct SkipIndex {
    pub entries: Vec<SkipEntry>,
}

impl SkipIndex {
    pub fn new(entries: Vec<SkipEntry>) -> Self {
        SkipIndex { entries }
    }

    pub fn from_buffer(buf: &mut ByteBuffer) -> Result<SkipIndex> {
        let len_bytes = buf
            .read(4)
            .ok_or_else(|| malformed("missing length prefix"))?;
        let count = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = buf.read(8).ok_or_else(|| malformed("short entry"))?;
            entries.push(SkipEntry {
                doc_id: DocId(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
                byte_offset: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            });
        }
        Ok(SkipIndex { entries })
    }

    pub fn write(&self, buf: &mut ByteBuffer) -> Result<()> {
        buf.write(&(self.entries.len() as u32).to_le_bytes())?;
        for entry in &self.entries {
            buf.write(&entry.doc_id.0.to_le_bytes())?;
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

    /// Greatest entry whose doc id is strictly below `target`. Decoding from
    /// its offset with the entry's doc id as the delta base reaches every
    /// posting with id >= target.
    pub fn find(&self, target: DocId) -> Option<&SkipEntry> {
        let idx = self.entries.partition_point(|e| e.doc_id < target);
        if idx == 0 {
            None
        } else {
            Some(&self.entries[idx - 1])
        }
    }
}

fn malformed(what: &str) -> Error {
    Error::new(ErrorKind::Decode, format!("malformed skip index: {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(pairs: &[(u32, u32)]) -> SkipIndex {
        SkipIndex::new(
            pairs
                .iter()
                .map(|&(doc_id, byte_offset)| SkipEntry {
                    doc_id: DocId(doc_id),
                    byte_offset,
                })
                .collect(),
        )
    }

    #[test]
    fn test_round_trip() {
        let original = index(&[(10, 80), (20, 160), (35, 260)]);
        let mut buf = ByteBuffer::memory(64);
        original.write(&mut buf).unwrap();
        buf.truncate(0).unwrap();
        buf.seek(0);

        let loaded = SkipIndex::from_buffer(&mut buf).unwrap();
        assert_eq!(loaded.entries, original.entries);
        assert!(buf.at_end());
    }

    #[test]
    fn test_find_is_strictly_below_target() {
        let idx = index(&[(10, 80), (20, 160), (35, 260)]);

        assert!(idx.find(DocId(5)).is_none());
        assert!(idx.find(DocId(10)).is_none());
        assert_eq!(idx.find(DocId(11)).unwrap().doc_id, DocId(10));
        assert_eq!(idx.find(DocId(20)).unwrap().doc_id, DocId(10));
        assert_eq!(idx.find(DocId(21)).unwrap().doc_id, DocId(20));
        assert_eq!(idx.find(DocId(1000)).unwrap().doc_id, DocId(35));
    }

    #[test]
    fn test_short_blob_is_error() {
        let mut buf = ByteBuffer::from_vec(vec![2, 0, 0, 0, 1, 1]);
        assert!(SkipIndex::from_buffer(&mut buf).is_err());
    }
}
