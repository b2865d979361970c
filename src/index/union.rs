use crate::core::types::{DocId, HitType, IndexHit};
use crate::index::iterator::{IndexIterator, ReadOutcome};

/// Distinct union of child iterators.
///
/// Each child keeps a front hit; a read emits the smallest front across the
/// live children, merging every child sitting on that doc: field masks OR
/// together, frequencies add, offset vectors concatenate. A doc id is
/// emitted exactly once no matter how many children carry it.
pub struct UnionIterator {
    children: Vec<Box<dyn IndexIterator>>,
    fronts: Vec<Option<IndexHit>>,
    last_doc_id: DocId,
    initialized: bool,
    eof: bool,
}

impl UnionIterator {
    pub fn new(children: Vec<Box<dyn IndexIterator>>) -> Self {
        let fronts = children.iter().map(|_| None).collect();
        UnionIterator {
            children,
            fronts,
            last_doc_id: DocId(0),
            initialized: false,
            eof: false,
        }
    }

    fn init_fronts(&mut self) {
        for (child, front) in self.children.iter_mut().zip(self.fronts.iter_mut()) {
            let mut hit = IndexHit::new();
            *front = match child.read(&mut hit) {
                ReadOutcome::Ok => Some(hit),
                _ => None,
            };
        }
        self.initialized = true;
    }

    fn min_front(&self) -> Option<DocId> {
        self.fronts
            .iter()
            .flatten()
            .map(|front| front.doc_id)
            .min()
    }
}

impl IndexIterator for UnionIterator {
    fn read(&mut self, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        if !self.initialized {
            self.init_fronts();
        }

        let doc_id = match self.min_front() {
            Some(doc_id) => doc_id,
            None => {
                self.eof = true;
                return ReadOutcome::Eof;
            }
        };

        hit.init();
        hit.doc_id = doc_id;
        hit.hit_type = HitType::Raw;
        for i in 0..self.children.len() {
            let matches = self.fronts[i]
                .as_ref()
                .map(|front| front.doc_id == doc_id)
                .unwrap_or(false);
            if !matches {
                continue;
            }
            if let Some(front) = &self.fronts[i] {
                hit.flags |= front.flags;
                hit.field_mask |= front.field_mask;
                hit.total_freq += front.total_freq;
                hit.offsets.extend(front.offsets.iter().cloned());
            }
            // advance every child that contributed this doc
            let mut next = IndexHit::new();
            self.fronts[i] = match self.children[i].read(&mut next) {
                ReadOutcome::Ok => Some(next),
                _ => None,
            };
        }

        self.last_doc_id = doc_id;
        ReadOutcome::Ok
    }

    fn skip_to(&mut self, target: DocId, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        if !self.initialized {
            self.init_fronts();
        }

        for i in 0..self.children.len() {
            let behind = self.fronts[i]
                .as_ref()
                .map(|front| front.doc_id < target)
                .unwrap_or(false);
            if !behind {
                continue;
            }
            let mut landed = IndexHit::new();
            self.fronts[i] = match self.children[i].skip_to(target, &mut landed) {
                ReadOutcome::Ok | ReadOutcome::NotFound => Some(landed),
                ReadOutcome::Eof => None,
            };
        }

        match self.read(hit) {
            ReadOutcome::Eof => ReadOutcome::Eof,
            _ if hit.doc_id == target => ReadOutcome::Ok,
            _ => ReadOutcome::NotFound,
        }
    }

    fn last_doc_id(&self) -> DocId {
        self.last_doc_id
    }

    fn has_next(&self) -> bool {
        !self.eof
    }
}
