pub mod analysis;
pub mod compression;
pub mod core;
pub mod index;
pub mod numeric;
pub mod query;
pub mod search;
pub mod storage;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                         SYNDEX ARCHITECTURE                               │
└──────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── ENGINE LAYER ──────────────────────────────┐
│                                                                           │
│  struct SearchEngine                                                      │
│    store: Arc<dyn BlobStore>        // pluggable byte-blob backing        │
│    config: Config                   // skip interval, thresholds          │
│    analyzer: Analyzer               // ingest tokenization pipeline       │
│    registry: NumericIndexRegistry   // lazily loaded range trees          │
│    cache: QueryCache                // LRU keyed by query + generation    │
│    generation / counters: AtomicU64                                       │
│                                                                           │
│  add_document(s) ── analyze ──> per-term postings ──> IndexWriter         │
│  query ── Query::parse ──> stage tree ──> QueryExecutor ──> QueryResult   │
│  drop_index / optimize_index ── prefix scan over term keys                │
└───────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── QUERY LAYER ───────────────────────────────┐
│                                                                           │
│  enum QueryStage          struct Query              QueryExecutor          │
│   • Load(term)             • root: QueryStage        • eval stage tree     │
│   • Intersect(children)    • offset / limit          • bounded min-heap    │
│   • Exact(children)        • field_mask              • pooled IndexHit     │
│   • Union(children)        • num_tokens              • TF × 1/dist²        │
│   • Numeric(filter)                                                       │
└───────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────── ITERATOR ALGEBRA ────────────────────────────┐
│                                                                           │
│  trait IndexIterator { read, skip_to, last_doc_id, has_next }             │
│                                                                           │
│  IndexReader ──── posting list + SkipIndex | ScoreIndex (single word)     │
│  IntersectIterator ── lockstep alignment, mask AND, phrase (Exact) mode   │
│  UnionIterator ────── min-front merge, mask OR, offsets concatenated      │
│  NumericIterator ──── range tree scan filtered by NumericFilter           │
└───────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── INDEX LAYER ───────────────────────────────┐
│                                                                           │
│  Posting { doc_id Δvarint, flags, field_mask, freq f32le, offsets }       │
│  SkipIndex  { len u32, (doc_id, byte_offset)* }   ascending doc id        │
│  ScoreIndex { len u32, (doc_id, freq, offset)* }  descending freq         │
│  OffsetVector: varint Δ positions; min_distance + phrase contiguity       │
└───────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────── STORAGE LAYER ──────────────────────────────┐
│                                                                           │
│  trait BlobStore: blob get/set/append/truncate/delete,                    │
│                   zset score-range scan, hash, counter, prefix scan       │
│  MemoryStore: in-process reference implementation                         │
│  ByteBuffer:  seekable buffer, memory- or store-backed                    │
│  DocTable:    doc-key <-> doc-id maps, 6-byte {score,flags} metadata      │
│                                                                           │
│  keys:  {index}/{term}   si:… ss:…   num:{index}/{field}   dt:{index}     │
└───────────────────────────────────────────────────────────────────────────┘
*/
