use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::numeric::filter::NumericFilter;
use crate::storage::keys;
use crate::storage::store::BlobStore;

/// Writer side of a numeric field: each indexed value lands in the store's
/// sorted set for that field, keyed by doc id.
pub struct NumericIndex<'a> {
    store: &'a dyn BlobStore,
    key: String,
}

impl<'a> NumericIndex<'a> {
    pub fn open(store: &'a dyn BlobStore, index: &str, field: &str) -> Self {
        NumericIndex {
            store,
            key: keys::numeric_index_key(index, field),
        }
    }

    pub fn add(&self, doc_id: DocId, score: f64) -> Result<()> {
        self.store.zadd(&self.key, &doc_id.to_string(), score)
    }
}

/// In-memory image of one field's numeric index, rebuilt lazily from the
/// store's score-range scan. Iteration order is ascending doc id, which is
/// what the iterator contract demands.
pub struct NumericRangeTree {
    entries: BTreeMap<DocId, f64>,
}

impl NumericRangeTree {
    pub fn load(store: &dyn BlobStore, index: &str, field: &str) -> Result<NumericRangeTree> {
        let key = keys::numeric_index_key(index, field);
        let mut entries = BTreeMap::new();
        for (member, score) in
            store.zrange_by_score(&key, f64::NEG_INFINITY, f64::INFINITY)?
        {
            // a member that is not a doc id is foreign data; skip it
            if let Ok(id) = member.parse::<u32>() {
                entries.insert(DocId(id), score);
            }
        }
        Ok(NumericRangeTree { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ascending doc ids whose score satisfies the filter.
    pub fn matching_docs(&self, filter: &NumericFilter) -> Vec<DocId> {
        self.entries
            .iter()
            .filter(|&(_, &score)| filter.matches(score))
            .map(|(&doc_id, _)| doc_id)
            .collect()
    }
}

/// Shared cache of loaded range trees, one per `(index, field)`. Trees are
/// built on first use, shared read-only afterwards, and dropped when a write
/// touches the field.
pub struct NumericIndexRegistry {
    trees: RwLock<HashMap<(String, String), Arc<NumericRangeTree>>>,
}

impl NumericIndexRegistry {
    pub fn new() -> Self {
        NumericIndexRegistry {
            trees: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_load(
        &self,
        store: &dyn BlobStore,
        index: &str,
        field: &str,
    ) -> Result<Arc<NumericRangeTree>> {
        let cache_key = (index.to_string(), field.to_string());
        if let Some(tree) = self.trees.read().get(&cache_key) {
            return Ok(tree.clone());
        }

        let mut trees = self.trees.write();
        // another loader may have won the race while we were unlocked
        if let Some(tree) = trees.get(&cache_key) {
            return Ok(tree.clone());
        }
        let tree = Arc::new(NumericRangeTree::load(store, index, field)?);
        trees.insert(cache_key, tree.clone());
        Ok(tree)
    }

    pub fn invalidate(&self, index: &str, field: &str) {
        self.trees
            .write()
            .remove(&(index.to_string(), field.to_string()));
    }

    pub fn invalidate_index(&self, index: &str) {
        self.trees.write().retain(|(idx, _), _| idx != index);
    }
}

impl Default for NumericIndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}
