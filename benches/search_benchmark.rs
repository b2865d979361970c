use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::Rng;
use std::sync::Arc;

use syndex::core::engine::SearchEngine;
use syndex::core::types::{DocId, Document};
use syndex::index::offsets::OffsetVector;
use syndex::index::posting::{Posting, PostingCodec};
use syndex::numeric::index::NumericIndexRegistry;
use syndex::query::planner::Query;
use syndex::search::executor::QueryExecutor;
use syndex::storage::buffer::ByteBuffer;
use syndex::storage::store::{BlobStore, MemoryStore};

fn random_words(rng: &mut impl Rng, count: usize) -> String {
    let words = [
        "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "search", "engine",
        "index", "query", "token", "phrase", "score",
    ];
    (0..count)
        .map(|_| words[rng.gen_range(0..words.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn encode_list(count: u32) -> Vec<u8> {
    let mut buf = ByteBuffer::memory(1024);
    let mut prev = DocId(0);
    for i in 1..=count {
        let posting = Posting {
            doc_id: DocId(i * 3),
            flags: 0,
            field_mask: 0x01,
            total_freq: (i % 7) as f32,
            offsets: OffsetVector::encode(&[i, i + 2, i + 9]),
        };
        PostingCodec::encode(&mut buf, &posting, prev).unwrap();
        prev = posting.doc_id;
    }
    buf.truncate(0).unwrap();
    buf.seek(0);
    buf.read(buf.len()).unwrap().to_vec()
}

/// Benchmark decoding a full posting list
fn bench_codec_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("posting_decode");
    for size in [100u32, 1_000, 10_000].iter() {
        let encoded = encode_list(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut buf = ByteBuffer::from_vec(encoded.clone());
                let mut prev = DocId(0);
                let mut count = 0;
                while let Some(posting) = PostingCodec::decode_one(&mut buf, prev).unwrap() {
                    prev = posting.doc_id;
                    count += 1;
                }
                black_box(count)
            });
        });
    }
    group.finish();
}

/// Benchmark end-to-end ingest of small documents
fn bench_ingest(c: &mut Criterion) {
    c.bench_function("ingest_document", |b| {
        let engine = SearchEngine::new(Arc::new(MemoryStore::new()));
        let mut rng = rand::thread_rng();
        let mut id = 0u64;
        b.iter(|| {
            let doc = Document::new(format!("doc:{}", id), 1.0)
                .add_text("body", random_words(&mut rng, 30));
            engine.add_document("bench", &doc).unwrap();
            id += 1;
        });
    });
}

/// Benchmark intersection queries against a prebuilt index, driving the
/// executor directly so the result cache stays out of the measurement
fn bench_query(c: &mut Criterion) {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
    let engine = SearchEngine::new(store.clone());
    let mut rng = rand::thread_rng();
    let docs: Vec<Document> = (0..2_000)
        .map(|i| {
            Document::new(format!("doc:{}", i), 1.0)
                .add_text("body", random_words(&mut rng, 40))
        })
        .collect();
    engine.add_documents("bench", &docs).unwrap();

    let registry = NumericIndexRegistry::new();
    let executor = QueryExecutor::new(store.clone());

    c.bench_function("query_two_terms", |b| {
        let query = Query::parse("quick fox", 0, 10, 0xFF, &[], 1024);
        b.iter(|| {
            let result = executor.execute("bench", &registry, &query).unwrap();
            black_box(result.total_results)
        });
    });

    c.bench_function("query_phrase", |b| {
        let query = Query::parse("\"quick brown\"", 0, 10, 0xFF, &[], 1024);
        b.iter(|| {
            let result = executor.execute("bench", &registry, &query).unwrap();
            black_box(result.total_results)
        });
    });
}

criterion_group!(benches, bench_codec_decode, bench_ingest, bench_query);
criterion_main!(benches);
