//! In-memory iterator over fixed hits, for exercising combinators without a
//! backing store.

use crate::core::types::{DocId, HitType, IndexHit};
use crate::index::iterator::{IndexIterator, ReadOutcome};
use crate::index::offsets::OffsetVector;

pub struct VecIterator {
    hits: Vec<IndexHit>,
    pos: usize,
    last_doc_id: DocId,
    eof: bool,
}

impl VecIterator {
    pub fn new(hits: Vec<IndexHit>) -> Self {
        VecIterator {
            hits,
            pos: 0,
            last_doc_id: DocId(0),
            eof: false,
        }
    }

    /// Hits with unit frequency, full field mask and no positions.
    pub fn from_ids(ids: &[u32]) -> Self {
        Self::new(ids.iter().map(|&id| plain_hit(id)).collect())
    }

    /// Hits carrying one offset vector with the given positions.
    pub fn with_positions(entries: &[(u32, &[u32])]) -> Self {
        Self::new(
            entries
                .iter()
                .map(|&(id, positions)| {
                    let mut hit = plain_hit(id);
                    hit.offsets = vec![OffsetVector::encode(positions)];
                    hit
                })
                .collect(),
        )
    }

    /// Hits with explicit (doc id, field mask, total freq).
    pub fn with_fields(entries: &[(u32, u8, f32)]) -> Self {
        Self::new(
            entries
                .iter()
                .map(|&(id, field_mask, total_freq)| {
                    let mut hit = plain_hit(id);
                    hit.field_mask = field_mask;
                    hit.total_freq = total_freq;
                    hit
                })
                .collect(),
        )
    }
}

fn plain_hit(id: u32) -> IndexHit {
    let mut hit = IndexHit::new();
    hit.doc_id = DocId(id);
    hit.field_mask = 0xFF;
    hit.total_freq = 1.0;
    hit.hit_type = HitType::Raw;
    hit
}

impl IndexIterator for VecIterator {
    fn read(&mut self, hit: &mut IndexHit) -> ReadOutcome {
        if self.pos >= self.hits.len() {
            self.eof = true;
            return ReadOutcome::Eof;
        }
        *hit = self.hits[self.pos].clone();
        self.last_doc_id = hit.doc_id;
        self.pos += 1;
        ReadOutcome::Ok
    }

    fn skip_to(&mut self, target: DocId, hit: &mut IndexHit) -> ReadOutcome {
        while self.pos < self.hits.len() && self.hits[self.pos].doc_id < target {
            self.pos += 1;
        }
        if self.pos >= self.hits.len() {
            self.eof = true;
            return ReadOutcome::Eof;
        }
        *hit = self.hits[self.pos].clone();
        self.last_doc_id = hit.doc_id;
        self.pos += 1;
        if hit.doc_id == target {
            ReadOutcome::Ok
        } else {
            ReadOutcome::NotFound
        }
    }

    fn last_doc_id(&self) -> DocId {
        self.last_doc_id
    }

    fn has_next(&self) -> bool {
        !self.eof
    }
}
