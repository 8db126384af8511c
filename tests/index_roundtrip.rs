//! Build → reopen round trips over the on-disk index.

mod common;

use common::synthetic_docs;
use ranklab::cache::CachePolicy;
use ranklab::index::{BuildConfig, ForwardIndex, IndexBuilder, InvertedIndex, TermId};
use ranklab::Error;
use std::fs;

#[test]
fn reload_matches_build_statistics() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("idx");
    let summary =
        IndexBuilder::build(&path, BuildConfig::default(), synthetic_docs(300, 200, 7)).unwrap();

    let index = InvertedIndex::open_with_policy(&path, &CachePolicy::default()).unwrap();
    assert_eq!(index.corpus_stats(), summary.stats);
    assert_eq!(index.vocab_size() as usize, summary.term_stats.len());
    for (term_id, expected) in summary.term_stats.iter().enumerate() {
        assert_eq!(index.term_stats(term_id as TermId), Some(*expected));
    }

    let total: u64 = (0..index.num_docs()).map(|d| index.doc_size(d).unwrap()).sum();
    assert_eq!(total, summary.stats.total_terms);
}

#[test]
fn multi_run_build_matches_single_run() {
    let tmp = tempfile::tempdir().unwrap();
    let small = tmp.path().join("small");
    let large = tmp.path().join("large");

    let tiny_buffer = BuildConfig {
        max_buffer_bytes: 256,
        parallel_sort: true,
    };
    let multi = IndexBuilder::build(&small, tiny_buffer, synthetic_docs(200, 150, 11)).unwrap();
    let single =
        IndexBuilder::build(&large, BuildConfig::default(), synthetic_docs(200, 150, 11)).unwrap();
    assert!(multi.runs > 1, "expected several runs, got {}", multi.runs);
    assert_eq!(multi.stats, single.stats);

    let a = InvertedIndex::open_with_policy(&small, &CachePolicy::NoEvict).unwrap();
    let b = InvertedIndex::open_with_policy(&large, &CachePolicy::NoEvict).unwrap();
    for term_id in 0..a.vocab_size() {
        let list = a.postings(term_id).unwrap().unwrap();
        assert!(
            list.postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id),
            "postings for term {term_id} not strictly ascending"
        );
        assert_eq!(list.postings, b.postings(term_id).unwrap().unwrap().postings);
    }
}

#[test]
fn run_files_are_removed_after_seal() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("idx");
    let config = BuildConfig {
        max_buffer_bytes: 128,
        parallel_sort: false,
    };
    IndexBuilder::build(&path, config, synthetic_docs(50, 40, 3)).unwrap();
    assert!(!path.join(ranklab::index::CHUNKS_DIR).exists());
}

#[test]
fn forward_vectors_agree_with_postings() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("idx");
    IndexBuilder::build(&path, BuildConfig::default(), synthetic_docs(120, 80, 5)).unwrap();

    let inverted = InvertedIndex::open_with_policy(&path, &CachePolicy::NoEvict).unwrap();
    let forward =
        ForwardIndex::open_with_policy(&path, &CachePolicy::Lru { capacity: 16 }).unwrap();
    let dataset = forward.dataset();
    assert_eq!(dataset.len(), 120);
    assert_eq!(dataset.labels(), &["even".to_string(), "odd".to_string()]);

    for instance in &dataset {
        let instance = instance.unwrap();
        assert_eq!(
            instance.label,
            Some(if instance.doc_id % 3 == 0 { "even" } else { "odd" })
        );
        for term in &instance.vector.terms {
            let list = inverted.postings(term.term_id).unwrap().unwrap();
            assert_eq!(list.count_for(instance.doc_id), term.count);
        }
    }
}

#[test]
fn unsealed_directory_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("idx");
    IndexBuilder::build(&path, BuildConfig::default(), synthetic_docs(10, 10, 1)).unwrap();
    fs::remove_file(path.join(ranklab::index::META_FILE)).unwrap();

    let result = InvertedIndex::open_with_policy(&path, &CachePolicy::default());
    assert!(matches!(result, Err(Error::IndexCorrupt { .. })));
}

#[test]
fn reopening_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("idx");
    IndexBuilder::build(&path, BuildConfig::default(), synthetic_docs(40, 30, 9)).unwrap();

    let first = InvertedIndex::open_with_policy(&path, &CachePolicy::default()).unwrap();
    let second = InvertedIndex::open_with_policy(&path, &CachePolicy::default()).unwrap();
    assert_eq!(first.generation(), second.generation());
    assert_eq!(first.corpus_stats(), second.corpus_stats());
}
