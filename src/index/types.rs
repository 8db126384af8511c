use serde::{Deserialize, Serialize};

use crate::analyzers::FeatureMap;

/// Unique identifier for a document in the index (dense, starting at 0)
pub type DocId = u32;

/// Identifier assigned to a term the first time it is observed
pub type TermId = u32;

/// Index format version written to meta.json
pub const INDEX_VERSION: u32 = 1;

pub const META_FILE: &str = "meta.json";
pub const VOCAB_FILE: &str = "vocab.bin";
pub const POSTINGS_FILE: &str = "postings.bin";
pub const DOCS_FILE: &str = "docs.bin";
pub const FORWARD_FILE: &str = "forward.bin";
pub const CHUNKS_DIR: &str = "chunks";

/// Label slot value for unlabeled documents in docs.bin
pub const NO_LABEL: u32 = u32::MAX;

/// A document handed to the builder
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Caller-supplied id; must equal the next id if present
    pub id: Option<DocId>,
    /// Class label for supervised consumers
    pub label: Option<String>,
    pub features: FeatureMap,
}

impl Document {
    pub fn new(features: FeatureMap) -> Self {
        Self {
            id: None,
            label: None,
            features,
        }
    }

    pub fn with_id(mut self, id: DocId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Posting entry - a document containing a term and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub count: u32,
}

/// Decoded postings list for one term, ascending by doc id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingsList {
    pub term_id: TermId,
    pub postings: Vec<Posting>,
}

impl PostingsList {
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Count for a document, 0 when absent
    pub fn count_for(&self, doc_id: DocId) -> u32 {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .map(|i| self.postings[i].count)
            .unwrap_or(0)
    }
}

/// Forward entry - a term occurring in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCount {
    pub term_id: TermId,
    pub count: u32,
}

/// Decoded forward vector for one document, in build insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocVector {
    pub doc_id: DocId,
    pub terms: Vec<TermCount>,
}

impl DocVector {
    pub fn length(&self) -> u64 {
        self.terms.iter().map(|t| t.count as u64).sum()
    }
}

/// Document table entry shared by both indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocEntry {
    pub doc_id: DocId,
    /// Total number of tokens
    pub length: u64,
    pub unique_terms: u32,
    /// Index into `IndexMeta::labels`, or [`NO_LABEL`]
    pub label: u32,
    pub forward_offset: u64,
    pub forward_len: u32,
}

impl DocEntry {
    /// Size of a document entry in bytes (fixed-size for validation)
    pub const SIZE: usize = 4 + 8 + 4 + 4 + 8 + 4; // 32 bytes
}

/// Vocabulary entry: term text plus where its postings live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term: String,
    pub offset: u64,
    pub length: u32,
    pub doc_freq: u32,
    pub total_term_freq: u64,
}

/// Per-term statistics, comparable across build and reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TermStats {
    pub doc_freq: u32,
    pub total_term_freq: u64,
}

/// Corpus-level statistics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub num_docs: u32,
    pub total_terms: u64,
    pub avg_doc_length: f64,
    pub vocab_size: u32,
}

/// Index metadata stored in meta.json; its presence marks a sealed index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    /// Distinguishes one build from another in cache keys
    pub generation: u64,
    pub stats: CorpusStats,
    pub labels: Vec<String>,
    pub created_at: u64,
}

impl Default for IndexMeta {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            generation: 0,
            stats: CorpusStats::default(),
            labels: Vec::new(),
            created_at: 0,
        }
    }
}

/// Configuration for the index builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Postings buffer size that triggers a sorted run flush
    pub max_buffer_bytes: usize,
    /// Sort runs with rayon's parallel sort
    pub parallel_sort: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 64 * 1024 * 1024,
            parallel_sort: true,
        }
    }
}
