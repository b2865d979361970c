use crate::core::types::{DocId, HitType, IndexHit};
use crate::index::iterator::{IndexIterator, ReadOutcome};
use crate::index::offsets;

/// Intersection of an ordered list of child iterators.
///
/// Children advance in lockstep on a shared candidate doc id: the laggard is
/// skipped forward, a miss lifts the candidate, and any child hitting EOF
/// ends the whole intersection. An aligned doc is emitted only when the
/// AND of the children's field masks survives the query mask and, in exact
/// mode, the children's positions form a contiguous phrase in child order.
pub struct IntersectIterator {
    children: Vec<Box<dyn IndexIterator>>,
    fronts: Vec<IndexHit>,
    exact: bool,
    field_mask: u8,
    last_doc_id: DocId,
    initialized: bool,
    eof: bool,
}

impl IntersectIterator {
    pub fn new(children: Vec<Box<dyn IndexIterator>>, exact: bool, field_mask: u8) -> Self {
        debug_assert!(children.len() >= 2, "an intersection needs two children");
        let fronts = children.iter().map(|_| IndexHit::new()).collect();
        IntersectIterator {
            children,
            fronts,
            exact,
            field_mask,
            last_doc_id: DocId(0),
            initialized: false,
            eof: false,
        }
    }

    fn init_fronts(&mut self) -> bool {
        for (child, front) in self.children.iter_mut().zip(self.fronts.iter_mut()) {
            if child.read(front) == ReadOutcome::Eof {
                self.eof = true;
                return false;
            }
        }
        self.initialized = true;
        true
    }

    /// Align every child on one doc id >= `floor`. Returns the aligned doc,
    /// or none when a child ran out.
    fn align(&mut self, floor: DocId) -> Option<DocId> {
        let mut candidate = self
            .fronts
            .iter()
            .map(|f| f.doc_id)
            .max()
            .unwrap_or(DocId(0))
            .max(floor);

        'outer: loop {
            for i in 0..self.children.len() {
                if self.fronts[i].doc_id == candidate {
                    continue;
                }
                if self.fronts[i].doc_id > candidate {
                    candidate = self.fronts[i].doc_id;
                    continue 'outer;
                }
                match self.children[i].skip_to(candidate, &mut self.fronts[i]) {
                    ReadOutcome::Eof => {
                        self.eof = true;
                        return None;
                    }
                    ReadOutcome::Ok => {}
                    ReadOutcome::NotFound => {
                        candidate = self.children[i].last_doc_id();
                        self.fronts[i].doc_id = candidate;
                        continue 'outer;
                    }
                }
            }
            return Some(candidate);
        }
    }

    /// AND the children's masks under the query mask; zero means the terms
    /// never share a permitted field for this doc.
    fn combined_mask(&self) -> u8 {
        self.fronts
            .iter()
            .fold(0xFFu8, |mask, front| mask & front.field_mask)
            & self.field_mask
    }

    fn passes_phrase(&self) -> bool {
        if !self.exact {
            return true;
        }
        let vectors: Vec<_> = self
            .fronts
            .iter()
            .flat_map(|front| front.offsets.iter().cloned())
            .collect();
        offsets::is_contiguous_phrase(&vectors)
    }

    fn emit(&mut self, candidate: DocId, hit: &mut IndexHit) {
        hit.init();
        hit.doc_id = candidate;
        hit.field_mask = self.combined_mask();
        hit.hit_type = if self.exact {
            HitType::Exact
        } else {
            HitType::Raw
        };
        for front in &self.fronts {
            hit.flags |= front.flags;
            hit.total_freq += front.total_freq;
            hit.offsets.extend(front.offsets.iter().cloned());
        }
        self.last_doc_id = candidate;
    }

    /// Move child 0 off the current candidate so the next alignment makes
    /// progress.
    fn advance_first(&mut self) -> bool {
        if self.children[0].read(&mut self.fronts[0]) == ReadOutcome::Eof {
            self.eof = true;
            return false;
        }
        true
    }

    /// Next aligned doc at or above `floor` that survives the mask and
    /// phrase checks.
    fn next_match(&mut self, floor: DocId, hit: &mut IndexHit) -> Option<DocId> {
        let mut floor = floor;
        loop {
            let candidate = self.align(floor)?;
            if self.combined_mask() != 0 && self.passes_phrase() {
                self.emit(candidate, hit);
                self.advance_first();
                return Some(candidate);
            }
            if !self.advance_first() {
                return None;
            }
            floor = candidate;
        }
    }
}

impl IndexIterator for IntersectIterator {
    fn read(&mut self, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        if !self.initialized && !self.init_fronts() {
            return ReadOutcome::Eof;
        }

        match self.next_match(DocId(0), hit) {
            Some(_) => ReadOutcome::Ok,
            None => ReadOutcome::Eof,
        }
    }

    fn skip_to(&mut self, target: DocId, hit: &mut IndexHit) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        if !self.initialized && !self.init_fronts() {
            return ReadOutcome::Eof;
        }

        match self.next_match(target, hit) {
            Some(doc_id) if doc_id == target => ReadOutcome::Ok,
            Some(_) => ReadOutcome::NotFound,
            None => ReadOutcome::Eof,
        }
    }

    fn last_doc_id(&self) -> DocId {
        self.last_doc_id
    }

    fn has_next(&self) -> bool {
        !self.eof
    }
}
