use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{HitType, IndexHit};
use crate::index::intersect::IntersectIterator;
use crate::index::iterator::{EmptyIterator, IndexIterator, ReadOutcome};
use crate::index::offsets;
use crate::index::reader::IndexReader;
use crate::index::union::UnionIterator;
use crate::numeric::index::NumericIndexRegistry;
use crate::numeric::iterator::NumericIterator;
use crate::query::planner::Query;
use crate::query::stage::QueryStage;
use crate::search::results::{QueryResult, ScoredHit};
use crate::storage::doc_table::DocTable;
use crate::storage::store::BlobStore;

/// Stateless query execution service: materializes the stage tree into an
/// iterator tree, drains it through a bounded min-heap of `offset + limit`
/// candidates and returns the window best-first.
pub struct QueryExecutor {
    store: Arc<dyn BlobStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        QueryExecutor { store }
    }

    /// Evaluate one stage. A term with no posting list becomes an
    /// immediately-exhausted iterator, so an intersection over it is empty
    /// rather than an error; `None` only comes back for a composite with no
    /// children at all.
    fn eval_stage(
        &self,
        index: &str,
        registry: &NumericIndexRegistry,
        query: &Query,
        stage: &QueryStage,
    ) -> Result<Option<Box<dyn IndexIterator>>> {
        match stage {
            QueryStage::Load(term) => {
                let reader = IndexReader::open(
                    self.store.clone(),
                    index,
                    term,
                    query.field_mask,
                    query.is_single_word(),
                )?;
                Ok(Some(match reader {
                    Some(reader) => Box::new(reader),
                    None => Box::new(EmptyIterator::new()),
                }))
            }
            QueryStage::Intersect(children) => {
                self.eval_group(index, registry, query, children, false)
            }
            QueryStage::Exact(children) => {
                self.eval_group(index, registry, query, children, true)
            }
            QueryStage::Union(children) => {
                if children.is_empty() {
                    return Ok(None);
                }
                if children.len() == 1 {
                    return self.eval_stage(index, registry, query, &children[0]);
                }
                let mut iterators = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(it) = self.eval_stage(index, registry, query, child)? {
                        iterators.push(it);
                    }
                }
                Ok(Some(Box::new(UnionIterator::new(iterators))))
            }
            QueryStage::Numeric(filter) => {
                let tree = registry.get_or_load(self.store.as_ref(), index, &filter.field)?;
                Ok(Some(Box::new(NumericIterator::new(filter, &tree))))
            }
        }
    }

    fn eval_group(
        &self,
        index: &str,
        registry: &NumericIndexRegistry,
        query: &Query,
        children: &[QueryStage],
        exact: bool,
    ) -> Result<Option<Box<dyn IndexIterator>>> {
        if children.is_empty() {
            return Ok(None);
        }
        if children.len() == 1 {
            return self.eval_stage(index, registry, query, &children[0]);
        }

        let mut iterators = Vec::with_capacity(children.len());
        for child in children {
            if let Some(it) = self.eval_stage(index, registry, query, child)? {
                iterators.push(it);
            }
        }
        Ok(Some(Box::new(IntersectIterator::new(
            iterators,
            exact,
            query.field_mask,
        ))))
    }

    /// Term-frequency over squared proximity, multiplied by the document's
    /// static score when one is present. Exact hits count as distance 1.
    fn score_hit(hit: &IndexHit, doc_table: &DocTable) -> f32 {
        let min_dist = if hit.hit_type == HitType::Exact {
            1
        } else {
            offsets::min_distance(&hit.offsets)
        };
        let mut score = hit.total_freq / (min_dist.max(1) as f32).powi(2);
        if let Ok(Some(md)) = doc_table.get_metadata(hit.doc_id) {
            if md.score > 0.0 {
                score *= md.score;
            }
        }
        score
    }

    pub fn execute(
        &self,
        index: &str,
        registry: &NumericIndexRegistry,
        query: &Query,
    ) -> Result<QueryResult> {
        let mut root = self
            .eval_stage(index, registry, query, &query.root)?
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Internal,
                    "query evaluated to no iterator".to_string(),
                )
            })?;

        let doc_table = DocTable::new(self.store.clone(), index);
        let capacity = query.offset + query.limit;
        let mut heap: BinaryHeap<ScoredHit> = BinaryHeap::with_capacity(capacity + 1);
        let score_ordered = root.score_ordered();

        let mut total_results = 0usize;
        // one pooled hit reused across the whole drain
        let mut pooled = IndexHit::new();
        loop {
            pooled.init();
            match root.read(&mut pooled) {
                ReadOutcome::Eof => break,
                ReadOutcome::NotFound => continue,
                ReadOutcome::Ok => {}
            }

            let score = Self::score_hit(&pooled, &doc_table);
            total_results += 1;
            let entry = ScoredHit {
                doc_id: pooled.doc_id,
                score,
            };

            if capacity == 0 {
                continue;
            }
            if heap.len() < capacity {
                heap.push(entry);
            } else if let Some(&worst) = heap.peek() {
                if entry < worst {
                    // the new hit outranks the worst kept candidate
                    heap.pop();
                    heap.push(entry);
                } else if score_ordered && pooled.total_freq < worst.score {
                    // frequencies arrive descending and document scores are
                    // normalized to at most 1, so nothing further can improve
                    break;
                }
            }
        }

        // pop the window: the heap holds the best `offset + limit` hits with
        // the worst on top, so the last `kept - offset` polls, reversed, are
        // the slice the caller asked for
        let kept = heap.len();
        let take = kept.saturating_sub(query.offset);
        let mut window = Vec::with_capacity(take);
        for _ in 0..take {
            if let Some(hit) = heap.pop() {
                window.push(hit);
            }
        }

        let mut ids = Vec::with_capacity(take);
        for hit in window.into_iter().rev() {
            match doc_table.get_doc_key(hit.doc_id)? {
                Some(key) => ids.push(key),
                None => ids.push(hit.doc_id.to_string()),
            }
        }

        Ok(QueryResult { ids, total_results })
    }
}
