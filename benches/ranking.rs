//! Ranking and indexing benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ranklab::analyzers::{Analyzer, FeatureMap, FilterChain, NgramWordAnalyzer};
use ranklab::cache::CachePolicy;
use ranklab::index::{BuildConfig, Document, IndexBuilder, InvertedIndex};
use ranklab::query::{RankerConfig, Searcher};
use tempfile::TempDir;

const WORDS: &[&str] = &[
    "index", "rank", "query", "term", "document", "posting", "cache", "score", "vector", "label",
    "merge", "sort", "buffer", "model", "corpus", "token", "smooth", "prior", "length", "weight",
];

fn synthetic_corpus(docs: usize) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..docs)
        .map(|_| {
            let mut features = FeatureMap::new();
            for _ in 0..60 {
                let word = WORDS[rng.random_range(0..WORDS.len())];
                features.increment(word, 1);
            }
            Document::new(features)
        })
        .collect()
}

fn create_benchmark_index(docs: usize) -> (TempDir, InvertedIndex) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("idx");
    IndexBuilder::build(&path, BuildConfig::default(), synthetic_corpus(docs))
        .expect("Failed to build index");
    let index = InvertedIndex::open_with_policy(&path, &CachePolicy::default())
        .expect("Failed to open index");
    (temp_dir, index)
}

fn bench_analyzer(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog. It was not amused! ".repeat(50);

    let mut group = c.benchmark_group("analyzer");
    for n in [1, 2, 3] {
        let analyzer = NgramWordAnalyzer::new(n, FilterChain::default_chain()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, t| {
            b.iter(|| analyzer.analyze(black_box(t)))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    group.bench_function("2k_docs", |b| {
        b.iter(|| {
            let temp_dir = TempDir::new().unwrap();
            let docs = synthetic_corpus(2000);
            IndexBuilder::build(&temp_dir.path().join("idx"), BuildConfig::default(), docs).unwrap()
        })
    });

    group.bench_function("2k_docs_small_runs", |b| {
        let config = BuildConfig {
            max_buffer_bytes: 64 * 1024,
            parallel_sort: true,
        };
        b.iter(|| {
            let temp_dir = TempDir::new().unwrap();
            let docs = synthetic_corpus(2000);
            IndexBuilder::build(&temp_dir.path().join("idx"), config, docs).unwrap()
        })
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let (_temp_dir, index) = create_benchmark_index(10_000);
    let query = ["rank", "cache", "prior"];

    let rankers = [
        RankerConfig::default(),
        RankerConfig::AbsoluteDiscount { delta: 0.7 },
        RankerConfig::DirichletPrior { mu: 2000.0 },
        RankerConfig::PivotedLength { s: 0.2 },
    ];

    let mut group = c.benchmark_group("search");
    for config in rankers {
        let ranker = config.build().unwrap();
        group.bench_function(ranker.name(), |b| {
            let searcher = Searcher::new(&index, ranker.as_ref());
            b.iter(|| searcher.search(black_box(&query), 10).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyzer, bench_build, bench_search);
criterion_main!(benches);
