use crate::cache::{Cache, CacheKey, CachePolicy, CacheStats};
use crate::error::{Error, Result};
use crate::index::dir::IndexDir;
use crate::index::reader::{check_layout, read_documents, read_vocab, FileBytes};
use crate::index::types::*;
use crate::utils::decode_postings;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Postings cache shared behind the inverted index
pub type PostingsCache = Arc<dyn Cache<CacheKey, PostingsList>>;

/// Sealed, read-only inverted index: term → postings plus corpus statistics.
///
/// Postings are served from a memory map and decoded through the injected
/// cache. The structure itself holds no locks and can be shared freely
/// across threads.
pub struct InvertedIndex {
    dir: IndexDir,
    meta: IndexMeta,
    vocab: Vec<TermEntry>,
    term_ids: FxHashMap<String, TermId>,
    documents: Vec<DocEntry>,
    postings: FileBytes,
    cache: PostingsCache,
}

impl InvertedIndex {
    /// Open a sealed index with the given postings cache
    pub fn open(path: &Path, cache: PostingsCache) -> Result<Self> {
        let dir = IndexDir::open(path)?;
        let meta = dir.read_meta()?;

        let (vocab, (documents, postings)) = rayon::join(
            || read_vocab(&dir, &meta),
            || {
                (
                    read_documents(&dir, &meta),
                    FileBytes::open(&dir.file(POSTINGS_FILE)),
                )
            },
        );
        let vocab = vocab?;
        let documents = documents?;
        let postings = postings?;

        let postings_path = dir.file(POSTINGS_FILE);
        check_layout(
            &postings_path,
            "postings",
            vocab.iter().map(|entry| (entry.offset, entry.length)),
            postings.len(),
        )?;
        let mut total_terms = 0u64;
        for (term_id, entry) in vocab.iter().enumerate() {
            if entry.doc_freq == 0 || entry.doc_freq > meta.stats.num_docs {
                return Err(Error::corrupt(
                    &postings_path,
                    format!("term {term_id} has document frequency {}", entry.doc_freq),
                ));
            }
            total_terms += entry.total_term_freq;
        }
        if total_terms != meta.stats.total_terms {
            return Err(Error::corrupt(
                dir.path(),
                format!(
                    "term frequencies sum to {total_terms}, meta says {}",
                    meta.stats.total_terms
                ),
            ));
        }

        let term_ids: FxHashMap<String, TermId> = vocab
            .iter()
            .enumerate()
            .map(|(id, e)| (e.term.clone(), id as TermId))
            .collect();
        if term_ids.len() != vocab.len() {
            return Err(Error::corrupt(dir.path(), "vocabulary has duplicate terms"));
        }

        tracing::info!(
            "Opened inverted index at {} ({} documents, {} terms, {} cache)",
            path.display(),
            meta.stats.num_docs,
            meta.stats.vocab_size,
            cache.name()
        );

        Ok(Self {
            dir,
            meta,
            vocab,
            term_ids,
            documents,
            postings,
            cache,
        })
    }

    /// Open with a cache built from a policy
    pub fn open_with_policy(path: &Path, policy: &CachePolicy) -> Result<Self> {
        Self::open(path, policy.build()?)
    }

    pub fn term_to_id(&self, term: &str) -> Option<TermId> {
        self.term_ids.get(term).copied()
    }

    pub fn term_text(&self, term_id: TermId) -> Option<&str> {
        self.vocab.get(term_id as usize).map(|e| e.term.as_str())
    }

    /// Postings for a term, ascending by doc id; `None` for unknown ids
    pub fn postings(&self, term_id: TermId) -> Result<Option<Arc<PostingsList>>> {
        let Some(entry) = self.vocab.get(term_id as usize) else {
            return Ok(None);
        };
        let key = CacheKey::new(self.meta.generation, term_id);
        let list = self
            .cache
            .get_or_load(&key, &mut || self.load_postings(term_id, entry))?;
        Ok(Some(list))
    }

    /// Postings looked up by term text
    pub fn postings_for(&self, term: &str) -> Result<Option<Arc<PostingsList>>> {
        match self.term_to_id(term) {
            Some(id) => self.postings(id),
            None => Ok(None),
        }
    }

    fn load_postings(&self, term_id: TermId, entry: &TermEntry) -> Result<PostingsList> {
        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        let path = self.dir.file(POSTINGS_FILE);

        let postings = decode_postings(&self.postings[start..end]).ok_or_else(|| {
            Error::corrupt(&path, format!("undecodable postings for term {term_id}"))
        })?;

        if postings.len() != entry.doc_freq as usize {
            return Err(Error::corrupt(
                &path,
                format!(
                    "term {term_id} has {} postings, vocabulary says {}",
                    postings.len(),
                    entry.doc_freq
                ),
            ));
        }
        let ordered = postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id);
        let in_range = postings
            .iter()
            .all(|p| p.count > 0 && p.doc_id < self.meta.stats.num_docs);
        if !ordered || !in_range {
            return Err(Error::corrupt(
                &path,
                format!("postings for term {term_id} are out of order or out of range"),
            ));
        }

        Ok(PostingsList { term_id, postings })
    }

    /// Number of documents containing the term (0 if unknown)
    pub fn doc_freq(&self, term_id: TermId) -> u32 {
        self.vocab
            .get(term_id as usize)
            .map(|e| e.doc_freq)
            .unwrap_or(0)
    }

    /// Occurrences of the term across the corpus (0 if unknown)
    pub fn total_term_freq(&self, term_id: TermId) -> u64 {
        self.vocab
            .get(term_id as usize)
            .map(|e| e.total_term_freq)
            .unwrap_or(0)
    }

    pub fn term_stats(&self, term_id: TermId) -> Option<TermStats> {
        self.vocab.get(term_id as usize).map(|e| TermStats {
            doc_freq: e.doc_freq,
            total_term_freq: e.total_term_freq,
        })
    }

    pub fn corpus_stats(&self) -> CorpusStats {
        self.meta.stats
    }

    pub fn num_docs(&self) -> u32 {
        self.meta.stats.num_docs
    }

    pub fn vocab_size(&self) -> u32 {
        self.meta.stats.vocab_size
    }

    /// Document length in tokens
    pub fn doc_size(&self, doc_id: DocId) -> Option<u64> {
        self.documents.get(doc_id as usize).map(|d| d.length)
    }

    pub fn unique_terms(&self, doc_id: DocId) -> Option<u32> {
        self.documents.get(doc_id as usize).map(|d| d.unique_terms)
    }

    pub fn label(&self, doc_id: DocId) -> Option<&str> {
        let doc = self.documents.get(doc_id as usize)?;
        self.meta.labels.get(doc.label as usize).map(String::as_str)
    }

    pub fn generation(&self) -> u64 {
        self.meta.generation
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
