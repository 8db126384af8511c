//! # ranklab - Index storage and ranking for text retrieval
//!
//! ranklab builds a disk-resident inverted index and forward index from a
//! stream of analyzed documents, serves postings and term vectors through
//! pluggable caches, and ranks documents with interchangeable scoring
//! functions.
//!
//! ## Architecture
//!
//! - [`analyzers`] - Text → term-count feature maps (word n-grams)
//! - [`index`] - Index building, sealed readers, dataset views
//! - [`cache`] - Single-flight caches (no-evict, LRU) shared by readers
//! - [`query`] - Rankers and the top-k searcher
//! - [`config`] - JSON engine configuration
//! - [`error`] - Library error type
//!
//! ## Quick Start
//!
//! ```ignore
//! use ranklab::cache::CachePolicy;
//! use ranklab::index::InvertedIndex;
//! use ranklab::query::{RankerConfig, Searcher};
//! use std::path::Path;
//!
//! let index = InvertedIndex::open_with_policy(Path::new("idx"), &CachePolicy::default())?;
//! let ranker = RankerConfig::default().build()?;
//! let searcher = Searcher::new(&index, ranker.as_ref());
//!
//! for hit in searcher.search(&["rust", "index"], 10)? {
//!     println!("{} {:.4}", hit.doc_id, hit.score);
//! }
//! ```

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod utils;

pub use error::{Error, Result};
