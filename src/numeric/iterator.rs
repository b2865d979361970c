use crate::core::types::{DocId, HitType, IndexHit};
use crate::index::iterator::{IndexIterator, ReadOutcome};
use crate::numeric::filter::NumericFilter;
use crate::numeric::index::NumericRangeTree;

/// Range iterator over a numeric field, yielding ascending doc ids whose
/// score satisfies the filter. Hits carry wildcard flags and field mask, no
/// frequency and no positions, so they intersect cleanly with text streams
/// without disturbing scoring.
pub struct NumericIterator {
    docs: Vec<DocId>,
    pos: usize,
    last_doc_id: DocId,
    eof: bool,
}

impl NumericIterator {
    pub fn new(filter: &NumericFilter, tree: &NumericRangeTree) -> Self {
        NumericIterator {
            docs: tree.matching_docs(filter),
            pos: 0,
            last_doc_id: DocId(0),
            eof: false,
        }
    }

    fn fill_hit(&self, hit: &mut IndexHit, doc_id: DocId) {
        hit.init();
        hit.doc_id = doc_id;
        hit.flags = 0xFF;
        hit.field_mask = 0xFF;
        hit.total_freq = 0.0;
        hit.hit_type = HitType::Raw;
    }
}

impl IndexIterator for NumericIterator {
    fn read(&mut self, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        if self.pos >= self.docs.len() {
            self.eof = true;
            return ReadOutcome::Eof;
        }
        let doc_id = self.docs[self.pos];
        self.pos += 1;
        self.fill_hit(hit, doc_id);
        self.last_doc_id = doc_id;
        ReadOutcome::Ok
    }

    fn skip_to(&mut self, target: DocId, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }

        while self.last_doc_id < target {
            if self.pos >= self.docs.len() {
                self.eof = true;
                return ReadOutcome::Eof;
            }
            self.last_doc_id = self.docs[self.pos];
            self.pos += 1;
        }

        self.fill_hit(hit, self.last_doc_id);
        if self.last_doc_id == target {
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
