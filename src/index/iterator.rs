use crate::core::types::{DocId, IndexHit};

/// Outcome of a `read` or `skip_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The iterator landed on a matching doc and populated the hit.
    Ok,
    /// `skip_to` passed the target; `last_doc_id` reflects the landing
    /// point.
    NotFound,
    /// The stream is exhausted.
    Eof,
}

/// Uniform contract shared by every iterator in the tree: posting-list
/// leaves, intersections, unions and numeric range iterators.
pub trait IndexIterator {
    /// Advance to the next matching doc id and populate `hit`.
    fn read(&mut self, hit: &mut IndexHit) -> ReadOutcome;

    /// Advance to the first doc id >= `target`. `Ok` when the landing doc
    /// equals the target, `NotFound` when it overshot.
    fn skip_to(&mut self, target: DocId, hit: &mut IndexHit) -> ReadOutcome;

    /// Doc id of the last successful read, 0 before the first.
    fn last_doc_id(&self) -> DocId;

    /// False once EOF has been observed.
    fn has_next(&self) -> bool;

    /// True when hits arrive in descending total-frequency order instead of
    /// doc id order, which licenses early termination in the executor.
    fn score_ordered(&self) -> bool {
        false
    }
}

/// Iterator over nothing. Stands in for terms with no posting list inside
/// composite stages.
#[derive(Debug, Default)]
pub struct EmptyIterator {
    eof: bool,
}

impl EmptyIterator {
    pub fn new() -> Self {
        EmptyIterator { eof: false }
    }
}

impl IndexIterator for EmptyIterator {
    fn read(&mut self, _hit: &mut IndexHit) -> ReadOutcome {
        self.eof = true;
        ReadOutcome::Eof
    }

    fn skip_to(&mut self, _target: DocId, _hit: &mut IndexHit) -> ReadOutcome {
        self.eof = true;
        ReadOutcome::Eof
    }

    fn last_doc_id(&self) -> DocId {
        DocId(0)
    }

    fn has_next(&self) -> bool {
        !self.eof
    }
}
