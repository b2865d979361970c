use std::sync::Arc;

use log::warn;

use crate::core::error::Result;
use crate::core::types::{DocId, HitType, IndexHit};
use crate::index::iterator::{IndexIterator, ReadOutcome};
use crate::index::posting::{Posting, PostingCodec};
use crate::index::score::ScoreIndex;
use crate::index::skip::SkipIndex;
use crate::storage::buffer::ByteBuffer;
use crate::storage::keys;
use crate::storage::store::BlobStore;

/// Leaf iterator over one term's posting list.
///
/// In normal mode postings come back in ascending doc id order and `skip_to`
/// is accelerated by the skip index. In single-word mode the score index
/// drives the traversal instead, yielding postings by descending total
/// frequency so the executor can stop once its heap cannot improve;
/// `skip_to` is not meaningful there.
pub struct IndexReader {
    term: String,
    buf: ByteBuffer,
    skip_index: Option<SkipIndex>,
    score_index: Option<ScoreIndex>,
    score_pos: usize,
    prev_doc_id: DocId,
    last_doc_id: DocId,
    field_mask: u8,
    eof: bool,
}

impl IndexReader {
    /// Open a reader for `term`. `None` when the term has no posting list.
    pub fn open(
        store: Arc<dyn BlobStore>,
        index: &str,
        term: &str,
        field_mask: u8,
        single_word: bool,
    ) -> Result<Option<IndexReader>> {
        let buf = match ByteBuffer::store_read(store.clone(), &keys::term_key(index, term))? {
            Some(buf) => buf,
            None => return Ok(None),
        };

        let mut skip_index = None;
        let mut score_index = None;
        if single_word {
            score_index = load_score_index(&store, index, term)?;
        } else {
            skip_index = load_skip_index(&store, index, term)?;
        }

        Ok(Some(IndexReader {
            term: term.to_string(),
            buf,
            skip_index,
            score_index,
            score_pos: 0,
            prev_doc_id: DocId(0),
            last_doc_id: DocId(0),
            field_mask,
            eof: false,
        }))
    }

    fn fill_hit(
        &self,
        hit: &mut IndexHit,
        posting: Posting,
        doc_id: DocId,
    ) {
        hit.init();
        hit.doc_id = doc_id;
        hit.flags = posting.flags;
        hit.field_mask = posting.field_mask;
        hit.total_freq = posting.total_freq;
        hit.offsets.push(posting.offsets);
        hit.hit_type = HitType::Raw;
    }

    /// Decode forward until a posting passes the field mask. Corruption ends
    /// the stream rather than failing the query.
    fn next_posting(&mut self) -> Option<Posting> {
        loop {
            match PostingCodec::decode_one(&mut self.buf, self.prev_doc_id) {
                Ok(Some(posting)) => {
                    self.prev_doc_id = posting.doc_id;
                    if posting.field_mask & self.field_mask == 0 {
                        continue;
                    }
                    return Some(posting);
                }
                Ok(None) => {
                    self.eof = true;
                    return None;
                }
                Err(err) => {
                    warn!("corrupt posting list for '{}': {}", self.term, err);
                    self.eof = true;
                    return None;
                }
            }
        }
    }

    fn read_by_score(&mut self, hit: &mut IndexHit) -> ReadOutcome {
        let next = self
            .score_index
            .as_ref()
            .and_then(|si| si.entries.get(self.score_pos))
            .copied();
        let entry = match next {
            Some(entry) => entry,
            None => {
                self.eof = true;
                return ReadOutcome::Eof;
            }
        };
        self.score_pos += 1;

        self.buf.seek(entry.byte_offset as usize);
        // the stored delta is relative to the preceding posting, which we
        // did not decode; the entry carries the real doc id
        match PostingCodec::decode_one(&mut self.buf, DocId(0)) {
            Ok(Some(posting)) => {
                self.fill_hit(hit, posting, entry.doc_id);
                self.last_doc_id = entry.doc_id;
                ReadOutcome::Ok
            }
            Ok(None) | Err(_) => {
                warn!("score index for '{}' points past the posting list", self.term);
                self.eof = true;
                ReadOutcome::Eof
            }
        }
    }
}

impl IndexIterator for IndexReader {
    fn read(&mut self, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        if self.score_index.is_some() {
            return self.read_by_score(hit);
        }

        match self.next_posting() {
            Some(posting) => {
                let doc_id = posting.doc_id;
                self.fill_hit(hit, posting, doc_id);
                self.last_doc_id = doc_id;
                ReadOutcome::Ok
            }
            None => ReadOutcome::Eof,
        }
    }

    fn skip_to(&mut self, target: DocId, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        debug_assert!(
            self.score_index.is_none(),
            "skip_to is undefined in score-index mode"
        );

        if let Some(skip_index) = &self.skip_index {
            if let Some(entry) = skip_index.find(target) {
                // only seek forward; an earlier skip may already be past it
                if entry.byte_offset as usize > self.buf.offset() {
                    self.buf.seek(entry.byte_offset as usize);
                    self.prev_doc_id = entry.doc_id;
                }
            }
        }

        loop {
            match self.next_posting() {
                Some(posting) if posting.doc_id >= target => {
                    let doc_id = posting.doc_id;
                    self.fill_hit(hit, posting, doc_id);
                    self.last_doc_id = doc_id;
                    return if doc_id == target {
                        ReadOutcome::Ok
                    } else {
                        ReadOutcome::NotFound
                    };
                }
                Some(_) => continue,
                None => return ReadOutcome::Eof,
            }
        }
    }

    fn last_doc_id(&self) -> DocId {
        self.last_doc_id
    }

    fn has_next(&self) -> bool {
        !self.eof
    }

    fn score_ordered(&self) -> bool {
        self.score_index.is_some()
    }
}

fn load_skip_index(
    store: &Arc<dyn BlobStore>,
    index: &str,
    term: &str,
) -> Result<Option<SkipIndex>> {
    let Some(mut buf) =
        ByteBuffer::store_read(store.clone(), &keys::skip_index_key(index, term))?
    else {
        return Ok(None);
    };
    match SkipIndex::from_buffer(&mut buf) {
        Ok(skip) if !skip.is_empty() => Ok(Some(skip)),
        Ok(_) => Ok(None),
        Err(err) => {
            warn!("unreadable skip index for '{}': {}", term, err);
            Ok(None)
        }
    }
}

fn load_score_index(
    store: &Arc<dyn BlobStore>,
    index: &str,
    term: &str,
) -> Result<Option<ScoreIndex>> {
    let Some(mut buf) =
        ByteBuffer::store_read(store.clone(), &keys::score_index_key(index, term))?
    else {
        return Ok(None);
    };
    match ScoreIndex::from_buffer(&mut buf) {
        Ok(score) if !score.is_empty() => Ok(Some(score)),
        Ok(_) => Ok(None),
        Err(err) => {
            warn!("unreadable score index for '{}': {}", term, err);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FIELD_MASK_ALL;
    use crate::index::offsets::OffsetVector;
    use crate::index::posting::Posting;
    use crate::storage::store::MemoryStore;

    fn seed_postings(
        store: &Arc<dyn BlobStore>,
        index: &str,
        term: &str,
        postings: &[(u32, u8, f32)],
    ) {
        let mut buf = ByteBuffer::store_write(store.clone(), &keys::term_key(index, term)).unwrap();
        let mut prev = DocId(0);
        for &(doc_id, field_mask, total_freq) in postings {
            let posting = Posting {
                doc_id: DocId(doc_id),
                flags: 0,
                field_mask,
                total_freq,
                offsets: OffsetVector::encode(&[doc_id]),
            };
            PostingCodec::encode(&mut buf, &posting, prev).unwrap();
            prev = posting.doc_id;
        }
        buf.truncate(0).unwrap();
    }

    fn open(
        store: &Arc<dyn BlobStore>,
        term: &str,
        field_mask: u8,
        single_word: bool,
    ) -> IndexReader {
        IndexReader::open(store.clone(), "idx", term, field_mask, single_word)
            .unwrap()
            .unwrap()
    }

    fn drain(reader: &mut IndexReader) -> Vec<u32> {
        let mut hit = IndexHit::new();
        let mut ids = Vec::new();
        while reader.read(&mut hit) == ReadOutcome::Ok {
            ids.push(hit.doc_id.0);
        }
        ids
    }

    #[test]
    fn test_sequential_read_is_ascending() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        seed_postings(&store, "idx", "w", &[(1, 1, 1.0), (4, 1, 1.0), (9, 1, 2.0)]);

        let mut reader = open(&store, "w", FIELD_MASK_ALL, false);
        assert_eq!(drain(&mut reader), vec![1, 4, 9]);
        assert!(!reader.has_next());
    }

    #[test]
    fn test_missing_term_is_none() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        assert!(
            IndexReader::open(store, "idx", "nope", FIELD_MASK_ALL, false)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_field_mask_filters_postings() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        seed_postings(&store, "idx", "w", &[(1, 0x01, 1.0), (2, 0x02, 1.0), (3, 0x03, 1.0)]);

        let mut reader = open(&store, "w", 0x02, false);
        assert_eq!(drain(&mut reader), vec![2, 3]);
    }

    #[test]
    fn test_skip_to_without_skip_index() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        seed_postings(&store, "idx", "w", &[(2, 1, 1.0), (5, 1, 1.0), (8, 1, 1.0)]);

        let mut reader = open(&store, "w", FIELD_MASK_ALL, false);
        let mut hit = IndexHit::new();

        assert_eq!(reader.skip_to(DocId(5), &mut hit), ReadOutcome::Ok);
        assert_eq!(hit.doc_id, DocId(5));

        assert_eq!(reader.skip_to(DocId(6), &mut hit), ReadOutcome::NotFound);
        assert_eq!(reader.last_doc_id(), DocId(8));

        assert_eq!(reader.skip_to(DocId(9), &mut hit), ReadOutcome::Eof);
    }

    #[test]
    fn test_corrupt_tail_surfaces_as_eof() {
        let _ = env_logger::builder().is_test(true).try_init();
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        seed_postings(&store, "idx", "w", &[(1, 1, 1.0), (2, 1, 1.0)]);

        // chop bytes off the end, cutting the second posting mid-record
        let blob = store.get("idx/w").unwrap().unwrap();
        store.set("idx/w", &blob[..blob.len() - 3]).unwrap();

        let mut reader = open(&store, "w", FIELD_MASK_ALL, false);
        let ids = drain(&mut reader);
        assert_eq!(ids, vec![1]);
        assert!(!reader.has_next());
    }

    #[test]
    fn test_single_word_mode_reads_by_score() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());

        // postings at known offsets, score index written by hand
        let postings = [(1u32, 1u8, 1.0f32), (2, 1, 9.0), (3, 1, 4.0)];
        let mut offsets = Vec::new();
        {
            let mut buf =
                ByteBuffer::store_write(store.clone(), &keys::term_key("idx", "w")).unwrap();
            let mut prev = DocId(0);
            for &(doc_id, field_mask, total_freq) in &postings {
                offsets.push(buf.offset() as u32);
                let posting = Posting {
                    doc_id: DocId(doc_id),
                    flags: 0,
                    field_mask,
                    total_freq,
                    offsets: OffsetVector::empty(),
                };
                PostingCodec::encode(&mut buf, &posting, prev).unwrap();
                prev = posting.doc_id;
            }
            buf.truncate(0).unwrap();
        }
        {
            let score = ScoreIndex::new(
                postings
                    .iter()
                    .zip(&offsets)
                    .map(|(&(doc_id, _, total_freq), &byte_offset)| {
                        crate::index::score::ScoreIndexEntry {
                            doc_id: DocId(doc_id),
                            total_freq,
                            byte_offset,
                        }
                    })
                    .collect(),
            );
            let mut buf =
                ByteBuffer::store_write(store.clone(), &keys::score_index_key("idx", "w"))
                    .unwrap();
            score.write(&mut buf).unwrap();
            buf.truncate(0).unwrap();
        }

        let mut reader = open(&store, "w", FIELD_MASK_ALL, true);
        let mut hit = IndexHit::new();
        let mut seen = Vec::new();
        while reader.read(&mut hit) == ReadOutcome::Ok {
            seen.push((hit.doc_id.0, hit.total_freq));
        }
        assert_eq!(seen, vec![(2, 9.0), (3, 4.0), (1, 1.0)]);
    }
}
