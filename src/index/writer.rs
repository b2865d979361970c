use std::sync::Arc;

use log::warn;

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::posting::{Posting, PostingCodec};
use crate::index::score::{ScoreIndex, ScoreIndexEntry};
use crate::index::skip::{SkipEntry, SkipIndex};
use crate::storage::buffer::ByteBuffer;
use crate::storage::keys;
use crate::storage::store::BlobStore;

/// Append-only writer for one term: the posting blob plus its skip and
/// score directories.
///
/// Reopening an existing list rescans the blob (a varint walk, offsets
/// skipped) to recover the delta base, the doc count and both directories,
/// so close can always rewrite them consistently - including rebuilding a
/// score index that an earlier close deleted below the threshold.
pub struct IndexWriter {
    index: String,
    term: String,
    store: Arc<dyn BlobStore>,
    buf: ByteBuffer,
    last_doc_id: DocId,
    ndocs: usize,
    skip_entries: Vec<SkipEntry>,
    score_entries: Vec<ScoreIndexEntry>,
    skip_interval: usize,
    score_delete_threshold: usize,
}

impl IndexWriter {
    pub fn open(
        store: Arc<dyn BlobStore>,
        index: &str,
        term: &str,
        config: &Config,
    ) -> Result<IndexWriter> {
        let mut buf = ByteBuffer::store_write(store.clone(), &keys::term_key(index, term))?;

        let mut writer = IndexWriter {
            index: index.to_string(),
            term: term.to_string(),
            store,
            buf: ByteBuffer::memory(0), // replaced below
            last_doc_id: DocId(0),
            ndocs: 0,
            skip_entries: Vec::new(),
            score_entries: Vec::new(),
            skip_interval: config.skip_index_interval.max(1),
            score_delete_threshold: config.score_index_delete_threshold,
        };

        // rescan whatever is already there
        buf.seek(0);
        let mut prev = DocId(0);
        let mut last_good = 0usize;
        loop {
            let boundary = buf.offset();
            match PostingCodec::skip_one(&mut buf, prev) {
                Ok(Some((doc_id, total_freq))) => {
                    writer.ndocs += 1;
                    writer.score_entries.push(ScoreIndexEntry {
                        doc_id,
                        total_freq,
                        byte_offset: boundary as u32,
                    });
                    if writer.ndocs % writer.skip_interval == 0 {
                        writer.skip_entries.push(SkipEntry {
                            doc_id,
                            byte_offset: buf.offset() as u32,
                        });
                    }
                    prev = doc_id;
                    last_good = buf.offset();
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(
                        "dropping corrupt tail of posting list for '{}': {}",
                        term, err
                    );
                    buf.seek(last_good);
                    buf.truncate(last_good)?;
                    break;
                }
            }
        }
        writer.last_doc_id = prev;
        buf.seek_end();
        writer.buf = buf;
        Ok(writer)
    }

    pub fn ndocs(&self) -> usize {
        self.ndocs
    }

    pub fn last_doc_id(&self) -> DocId {
        self.last_doc_id
    }

    /// Append one posting. Doc ids must arrive strictly ascending.
    pub fn write_entry(&mut self, posting: &Posting) -> Result<()> {
        if posting.doc_id <= self.last_doc_id {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "doc id {} not above last written {}",
                    posting.doc_id, self.last_doc_id
                ),
            ));
        }

        let boundary = self.buf.offset();
        self.score_entries.push(ScoreIndexEntry {
            doc_id: posting.doc_id,
            total_freq: posting.total_freq,
            byte_offset: boundary as u32,
        });

        PostingCodec::encode(&mut self.buf, posting, self.last_doc_id)?;
        self.ndocs += 1;
        self.last_doc_id = posting.doc_id;

        if self.ndocs % self.skip_interval == 0 {
            self.skip_entries.push(SkipEntry {
                doc_id: posting.doc_id,
                byte_offset: self.buf.offset() as u32,
            });
        }
        Ok(())
    }

    /// Trim the posting blob to its written length, rewrite the skip
    /// directory and rewrite or delete the score directory. Each step is
    /// independent and idempotent.
    pub fn close(mut self) -> Result<()> {
        self.buf.truncate(0)?;

        let skip_key = keys::skip_index_key(&self.index, &self.term);
        let mut skip_buf = ByteBuffer::store_write(self.store.clone(), &skip_key)?;
        SkipIndex::new(std::mem::take(&mut self.skip_entries)).write(&mut skip_buf)?;
        skip_buf.truncate(0)?;

        let score_key = keys::score_index_key(&self.index, &self.term);
        if self.ndocs < self.score_delete_threshold {
            self.store.delete(&score_key)?;
        } else {
            let mut score_buf = ByteBuffer::store_write(self.store.clone(), &score_key)?;
            ScoreIndex::new(std::mem::take(&mut self.score_entries)).write(&mut score_buf)?;
            score_buf.truncate(0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FIELD_MASK_ALL, IndexHit};
    use crate::index::iterator::{IndexIterator, ReadOutcome};
    use crate::index::offsets::OffsetVector;
    use crate::index::reader::IndexReader;
    use crate::storage::store::MemoryStore;

    fn config(skip_interval: usize, threshold: usize) -> Config {
        Config {
            skip_index_interval: skip_interval,
            score_index_delete_threshold: threshold,
            ..Config::default()
        }
    }

    fn posting(doc_id: u32, total_freq: f32) -> Posting {
        Posting {
            doc_id: DocId(doc_id),
            flags: 0,
            field_mask: 0x01,
            total_freq,
            offsets: OffsetVector::encode(&[doc_id]),
        }
    }

    fn write_docs(store: &Arc<dyn BlobStore>, cfg: &Config, ids: &[u32]) {
        let mut writer = IndexWriter::open(store.clone(), "idx", "w", cfg).unwrap();
        for &id in ids {
            writer.write_entry(&posting(id, id as f32)).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_written_list_reads_back() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(2, 1000);
        write_docs(&store, &cfg, &[1, 3, 7, 20]);

        let mut reader = IndexReader::open(store, "idx", "w", FIELD_MASK_ALL, false)
            .unwrap()
            .unwrap();
        let mut hit = IndexHit::new();
        let mut ids = Vec::new();
        while reader.read(&mut hit) == ReadOutcome::Ok {
            ids.push(hit.doc_id.0);
        }
        assert_eq!(ids, vec![1, 3, 7, 20]);
    }

    #[test]
    fn test_ascending_doc_ids_enforced() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(100, 1000);
        let mut writer = IndexWriter::open(store, "idx", "w", &cfg).unwrap();
        writer.write_entry(&posting(5, 1.0)).unwrap();
        assert!(writer.write_entry(&posting(5, 1.0)).is_err());
        assert!(writer.write_entry(&posting(4, 1.0)).is_err());
        writer.write_entry(&posting(6, 1.0)).unwrap();
    }

    #[test]
    fn test_reopen_resumes_delta_base_and_count() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(2, 1000);
        write_docs(&store, &cfg, &[1, 3]);

        let writer = IndexWriter::open(store.clone(), "idx", "w", &cfg).unwrap();
        assert_eq!(writer.ndocs(), 2);
        assert_eq!(writer.last_doc_id(), DocId(3));
        drop(writer);

        write_docs(&store, &cfg, &[10, 11]);
        let mut reader = IndexReader::open(store, "idx", "w", FIELD_MASK_ALL, false)
            .unwrap()
            .unwrap();
        let mut hit = IndexHit::new();
        let mut ids = Vec::new();
        while reader.read(&mut hit) == ReadOutcome::Ok {
            ids.push(hit.doc_id.0);
        }
        assert_eq!(ids, vec![1, 3, 10, 11]);
    }

    #[test]
    fn test_skip_index_sampled_at_interval() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(2, 1000);
        write_docs(&store, &cfg, &[1, 2, 3, 4, 5]);

        let mut buf = ByteBuffer::store_read(store, "si:idx/w").unwrap().unwrap();
        let skip = SkipIndex::from_buffer(&mut buf).unwrap();
        let sampled: Vec<u32> = skip.entries.iter().map(|e| e.doc_id.0).collect();
        assert_eq!(sampled, vec![2, 4]);
    }

    #[test]
    fn test_small_list_score_index_deleted() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(100, 3);
        write_docs(&store, &cfg, &[1, 2]);
        assert!(store.get("ss:idx/w").unwrap().is_none());

        // growing past the threshold brings it back
        write_docs(&store, &cfg, &[3, 4]);
        let mut buf = ByteBuffer::store_read(store, "ss:idx/w").unwrap().unwrap();
        let score = ScoreIndex::from_buffer(&mut buf).unwrap();
        assert_eq!(score.len(), 4);
    }

    #[test]
    fn test_skip_to_through_written_skip_index() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(2, 1000);
        let ids: Vec<u32> = (1..=40).map(|i| i * 3).collect();
        write_docs(&store, &cfg, &ids);

        let mut reader = IndexReader::open(store, "idx", "w", FIELD_MASK_ALL, false)
            .unwrap()
            .unwrap();
        let mut hit = IndexHit::new();
        assert_eq!(reader.skip_to(DocId(60), &mut hit), ReadOutcome::Ok);
        assert_eq!(hit.doc_id, DocId(60));
        assert_eq!(reader.skip_to(DocId(61), &mut hit), ReadOutcome::NotFound);
        assert_eq!(reader.last_doc_id(), DocId(63));
        assert_eq!(reader.skip_to(DocId(120), &mut hit), ReadOutcome::Ok);
        assert_eq!(reader.skip_to(DocId(121), &mut hit), ReadOutcome::Eof);
    }

    #[test]
    fn test_corrupt_tail_dropped_on_reopen() {
        let _ = env_logger::builder().is_test(true).try_init();
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cfg = config(100, 1000);
        write_docs(&store, &cfg, &[1, 2, 3]);

        let blob = store.get("idx/w").unwrap().unwrap();
        store.set("idx/w", &blob[..blob.len() - 2]).unwrap();

        let writer = IndexWriter::open(store.clone(), "idx", "w", &cfg).unwrap();
        assert_eq!(writer.ndocs(), 2);
        assert_eq!(writer.last_doc_id(), DocId(2));
    }
}
