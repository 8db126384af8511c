//! Shared corpus helpers for integration tests

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ranklab::analyzers::FeatureMap;
use ranklab::index::{BuildConfig, BuildSummary, Document, IndexBuilder};
use std::path::Path;

/// Deterministic synthetic corpus: `docs` documents over a `vocab`-word vocabulary
pub fn synthetic_docs(docs: usize, vocab: usize, seed: u64) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..docs)
        .map(|i| {
            let len = rng.random_range(1..=40);
            let mut features = FeatureMap::new();
            for _ in 0..len {
                // Skew toward low ids so some terms are frequent
                let a = rng.random_range(0..vocab);
                let b = rng.random_range(0..vocab);
                features.increment(&format!("w{}", a.min(b)), 1);
            }
            let label = if i % 3 == 0 { "even" } else { "odd" };
            Document::new(features).with_label(label)
        })
        .collect()
}

pub fn doc(terms: &[(&str, u32)]) -> Document {
    Document::new(terms.iter().copied().collect())
}

/// The five-document corpus used by the ranking tests; "apple" occurs in docs 0, 2 and 4
pub fn build_fruit(path: &Path) -> BuildSummary {
    let docs = vec![
        doc(&[("apple", 2), ("banana", 1)]),
        doc(&[("banana", 3), ("cherry", 1)]),
        doc(&[("apple", 1), ("cherry", 2), ("date", 1)]),
        doc(&[("date", 4)]),
        doc(&[("apple", 3), ("elderberry", 1)]),
    ];
    IndexBuilder::build(path, BuildConfig::default(), docs).unwrap()
}
