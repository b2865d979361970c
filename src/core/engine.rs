use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::debug;
use rayon::prelude::*;

use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::EngineStats;
use crate::core::types::{DocId, Document, FieldValue, MAX_FIELDS};
use crate::index::offsets::OffsetVector;
use crate::index::posting::Posting;
use crate::index::reader::IndexReader;
use crate::index::writer::IndexWriter;
use crate::numeric::filter::NumericFilter;
use crate::numeric::index::{NumericIndex, NumericIndexRegistry};
use crate::query::cache::{QueryCache, QueryKey};
use crate::query::planner::Query;
use crate::search::executor::QueryExecutor;
use crate::search::results::QueryResult;
use crate::storage::doc_table::DocTable;
use crate::storage::keys;
use crate::storage::store::BlobStore;

/// Per-document analysis output: term accumulators plus numeric field
/// values, ready to be written once a doc id is known.
struct AnalyzedDocument {
    doc_id: DocId,
    flags: u8,
    terms: BTreeMap<String, TermEntry>,
    numerics: Vec<(String, f64)>,
}

#[derive(Default)]
struct TermEntry {
    field_mask: u8,
    total_freq: f32,
    positions: Vec<u32>,
}

/// Search engine over one backing store: ingest, query, maintenance.
pub struct SearchEngine {
    store: Arc<dyn BlobStore>,
    config: Config,
    analyzer: Analyzer,
    registry: NumericIndexRegistry,
    cache: QueryCache,
    indexing_pool: Option<rayon::ThreadPool>,
    generation: AtomicU64,
    query_count: AtomicU64,
    write_count: AtomicU64,
    started_at: DateTime<Utc>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: Arc<dyn BlobStore>, config: Config) -> Self {
        let cache = QueryCache::new(config.query_cache_entries);
        let threads = config.indexing_threads.unwrap_or_else(num_cpus::get);
        let indexing_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .ok();
        SearchEngine {
            store,
            config,
            analyzer: Analyzer::standard_english(),
            registry: NumericIndexRegistry::new(),
            cache,
            indexing_pool,
            generation: AtomicU64::new(0),
            query_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest one document. The key must not have been indexed before.
    pub fn add_document(&self, index: &str, document: &Document) -> Result<DocId> {
        let ids = self.add_documents(index, std::slice::from_ref(document))?;
        Ok(ids[0])
    }

    /// Ingest a batch: ids are minted in submission order, analysis fans
    /// out across threads, writes stay serialized per term so posting lists
    /// remain ascending.
    pub fn add_documents(&self, index: &str, documents: &[Document]) -> Result<Vec<DocId>> {
        let doc_table = DocTable::new(self.store.clone(), index);

        let mut doc_ids = Vec::with_capacity(documents.len());
        for document in documents {
            let (doc_id, is_new) = doc_table.get_doc_id(&document.key)?;
            if !is_new {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("document '{}' is already indexed", document.key),
                ));
            }
            doc_ids.push(doc_id);
        }

        let analyze_batch = || -> Result<Vec<AnalyzedDocument>> {
            documents
                .par_iter()
                .zip(doc_ids.par_iter())
                .map(|(document, &doc_id)| self.analyze_document(document, doc_id))
                .collect()
        };
        let analyzed = match &self.indexing_pool {
            Some(pool) => pool.install(analyze_batch)?,
            None => analyze_batch()?,
        };

        // merge the batch into one ascending posting run per term
        let mut by_term: BTreeMap<&str, Vec<(&AnalyzedDocument, &TermEntry)>> = BTreeMap::new();
        for doc in &analyzed {
            for (term, entry) in &doc.terms {
                by_term.entry(term.as_str()).or_default().push((doc, entry));
            }
        }

        for (term, postings) in by_term {
            let mut writer = IndexWriter::open(self.store.clone(), index, term, &self.config)?;
            for (doc, entry) in postings {
                writer.write_entry(&Posting {
                    doc_id: doc.doc_id,
                    flags: doc.flags,
                    field_mask: entry.field_mask,
                    total_freq: entry.total_freq,
                    offsets: OffsetVector::encode(&entry.positions),
                })?;
            }
            writer.close()?;
        }

        for (document, doc) in documents.iter().zip(&analyzed) {
            doc_table.put_document(doc.doc_id, document.score, document.flags as u16)?;
            for (field, value) in &doc.numerics {
                NumericIndex::open(self.store.as_ref(), index, field).add(doc.doc_id, *value)?;
                self.registry.invalidate(index, field);
            }
        }

        self.write_count
            .fetch_add(documents.len() as u64, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(doc_ids)
    }

    fn analyze_document(&self, document: &Document, doc_id: DocId) -> Result<AnalyzedDocument> {
        if document.fields.len() > MAX_FIELDS {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "document '{}' has {} fields, the mask holds {}",
                    document.key,
                    document.fields.len(),
                    MAX_FIELDS
                ),
            ));
        }

        let mut terms: BTreeMap<String, TermEntry> = BTreeMap::new();
        let mut numerics = Vec::new();
        // positions continue across fields, with a gap so a phrase can
        // never straddle a field boundary
        let mut position_base = 0u32;

        for (field_index, field) in document.fields.iter().enumerate() {
            match &field.value {
                FieldValue::Text(text) => {
                    let tokens = self.analyzer.analyze(text);
                    let mut max_position = 0u32;
                    for token in &tokens {
                        let entry = terms.entry(token.text.clone()).or_default();
                        entry.field_mask |= 1u8 << field_index;
                        entry.total_freq += 1.0;
                        entry.positions.push(position_base + token.position);
                        max_position = max_position.max(token.position);
                    }
                    position_base += max_position + 2;
                }
                FieldValue::Number(value) => {
                    numerics.push((field.name.clone(), *value));
                }
                FieldValue::Date(when) => {
                    numerics.push((field.name.clone(), when.timestamp() as f64));
                }
                FieldValue::Boolean(flag) => {
                    numerics.push((field.name.clone(), if *flag { 1.0 } else { 0.0 }));
                }
            }
        }

        // positions must ascend for the offset delta coding
        for entry in terms.values_mut() {
            entry.positions.sort_unstable();
        }

        Ok(AnalyzedDocument {
            doc_id,
            flags: document.flags,
            terms,
            numerics,
        })
    }

    /// Run a query and return the ranked window of doc keys.
    pub fn query(
        &self,
        index: &str,
        text: &str,
        offset: usize,
        limit: usize,
        field_mask: u8,
        filters: &[NumericFilter],
    ) -> Result<QueryResult> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let key = QueryKey {
            index: index.to_string(),
            query: text.to_string(),
            offset,
            limit,
            field_mask,
            filters: render_filters(filters),
            generation: self.generation.load(Ordering::Relaxed),
        };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let query = Query::parse(
            text,
            offset,
            limit,
            field_mask,
            filters,
            self.config.max_query_tokens,
        );
        let result =
            QueryExecutor::new(self.store.clone()).execute(index, &self.registry, &query)?;

        self.cache.put(key, result.clone());
        Ok(result)
    }

    /// Open a leaf reader for a term, as the query evaluator does.
    pub fn open_reader(
        &self,
        index: &str,
        term: &str,
        field_mask: u8,
        single_word: bool,
    ) -> Result<Option<IndexReader>> {
        IndexReader::open(self.store.clone(), index, term, field_mask, single_word)
    }

    pub fn open_writer(&self, index: &str, term: &str) -> Result<IndexWriter> {
        IndexWriter::open(self.store.clone(), index, term, &self.config)
    }

    pub fn close_writer(&self, writer: IndexWriter) -> Result<()> {
        self.generation.fetch_add(1, Ordering::Relaxed);
        writer.close()
    }

    pub fn parse_numeric_filter(&self, argv: &[&str]) -> Result<NumericFilter> {
        NumericFilter::parse(argv)
    }

    /// Walk every term of an index and apply the close-time trims: posting
    /// blob to written length, score index deleted under the threshold,
    /// skip index rewritten. Returns the number of terms touched.
    pub fn optimize_index(&self, index: &str) -> Result<usize> {
        let prefix = keys::term_key(index, "");
        let term_keys = self.store.scan_prefix(&prefix)?;

        let mut optimized = 0usize;
        for key in &term_keys {
            let term = &key[prefix.len()..];
            let writer = IndexWriter::open(self.store.clone(), index, term, &self.config)?;
            writer.close()?;
            optimized += 1;
        }
        debug!("optimized {} terms of index '{}'", optimized, index);

        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(optimized)
    }

    /// Delete every blob belonging to an index: posting lists with their
    /// auxiliaries and numeric sets, plus the doc table, the key maps and
    /// the id counter when `delete_documents` is set.
    pub fn drop_index(&self, index: &str, delete_documents: bool) -> Result<()> {
        let prefix = keys::term_key(index, "");
        for key in self.store.scan_prefix(&prefix)? {
            let term = &key[prefix.len()..];
            self.store.delete(&key)?;
            self.store.delete(&keys::skip_index_key(index, term))?;
            self.store.delete(&keys::score_index_key(index, term))?;
        }

        let numeric_prefix = format!("num:{}/", index);
        for key in self.store.scan_prefix(&numeric_prefix)? {
            self.store.delete(&key)?;
        }
        self.registry.invalidate_index(index);

        if delete_documents {
            self.store.delete(&keys::doc_table_key(index))?;
            self.store.delete(keys::DOC_KEY_MAP)?;
            self.store.delete(keys::DOC_ID_MAP)?;
            self.store.delete(keys::DOC_ID_COUNTER)?;
        }

        self.generation.fetch_add(1, Ordering::Relaxed);
        self.cache.clear();
        Ok(())
    }

    pub fn stats(&self) -> EngineStats {
        let uptime = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
        EngineStats {
            started_at: self.started_at,
            uptime_secs: uptime,
            query_count: self.query_count.load(Ordering::Relaxed),
            write_count: self.write_count.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }
}

fn render_filters(filters: &[NumericFilter]) -> String {
    let bound = |value: f64, inclusive: bool| {
        format!("{}{}", if inclusive { "" } else { "(" }, value)
    };
    filters
        .iter()
        .map(|f| {
            let min = if f.min_neg_inf {
                "-inf".to_string()
            } else {
                bound(f.min, f.inclusive_min)
            };
            let max = if f.max_pos_inf {
                "+inf".to_string()
            } else {
                bound(f.max, f.inclusive_max)
            };
            format!("{}:{}..{}", f.field, min, max)
        })
        .collect::<Vec<_>>()
        .join(";")
}
