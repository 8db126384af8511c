use crate::cache::{Cache, CacheKey, CachePolicy, CacheStats};
use crate::error::{Error, Result};
use crate::index::dir::IndexDir;
use crate::index::reader::{check_layout, read_documents, FileBytes};
use crate::index::types::*;
use crate::utils::decode_vector;
use std::path::Path;
use std::sync::Arc;

/// Document vector cache shared behind the forward index
pub type VectorCache = Arc<dyn Cache<CacheKey, DocVector>>;

/// Sealed, read-only forward index: doc id → (term id, count) vector
pub struct ForwardIndex {
    dir: IndexDir,
    meta: IndexMeta,
    documents: Vec<DocEntry>,
    vectors: FileBytes,
    cache: VectorCache,
}

impl ForwardIndex {
    pub fn open(path: &Path, cache: VectorCache) -> Result<Self> {
        let dir = IndexDir::open(path)?;
        let meta = dir.read_meta()?;
        let documents = read_documents(&dir, &meta)?;
        let vectors = FileBytes::open(&dir.file(FORWARD_FILE))?;

        check_layout(
            &dir.file(FORWARD_FILE),
            "vector",
            documents.iter().map(|doc| (doc.forward_offset, doc.forward_len)),
            vectors.len(),
        )?;

        tracing::info!(
            "Opened forward index at {} ({} documents, {} labels, {} cache)",
            path.display(),
            meta.stats.num_docs,
            meta.labels.len(),
            cache.name()
        );

        Ok(Self {
            dir,
            meta,
            documents,
            vectors,
            cache,
        })
    }

    pub fn open_with_policy(path: &Path, policy: &CachePolicy) -> Result<Self> {
        Self::open(path, policy.build()?)
    }

    /// Term vector of a document in build insertion order; `None` past the last doc
    pub fn doc_vector(&self, doc_id: DocId) -> Result<Option<Arc<DocVector>>> {
        let Some(doc) = self.documents.get(doc_id as usize) else {
            return Ok(None);
        };
        let key = CacheKey::new(self.meta.generation, doc_id);
        let vector = self
            .cache
            .get_or_load(&key, &mut || self.load_vector(doc))?;
        Ok(Some(vector))
    }

    fn load_vector(&self, doc: &DocEntry) -> Result<DocVector> {
        let start = doc.forward_offset as usize;
        let end = start + doc.forward_len as usize;
        let path = self.dir.file(FORWARD_FILE);

        let terms = decode_vector(&self.vectors[start..end]).ok_or_else(|| {
            Error::corrupt(&path, format!("undecodable vector for doc {}", doc.doc_id))
        })?;

        let vector = DocVector {
            doc_id: doc.doc_id,
            terms,
        };
        if vector.terms.len() != doc.unique_terms as usize || vector.length() != doc.length {
            return Err(Error::corrupt(
                &path,
                format!("vector for doc {} disagrees with the document table", doc.doc_id),
            ));
        }
        if vector.terms.iter().any(|t| t.term_id >= self.meta.stats.vocab_size) {
            return Err(Error::corrupt(
                &path,
                format!("vector for doc {} references an unknown term", doc.doc_id),
            ));
        }
        Ok(vector)
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u64> {
        self.documents.get(doc_id as usize).map(|d| d.length)
    }

    pub fn unique_terms(&self, doc_id: DocId) -> Option<u32> {
        self.documents.get(doc_id as usize).map(|d| d.unique_terms)
    }

    pub fn num_docs(&self) -> u32 {
        self.meta.stats.num_docs
    }

    /// Class label of a document, if it has one
    pub fn label(&self, doc_id: DocId) -> Option<&str> {
        let doc = self.documents.get(doc_id as usize)?;
        self.meta.labels.get(doc.label as usize).map(String::as_str)
    }

    /// Every distinct label, in first-seen order
    pub fn labels(&self) -> &[String] {
        &self.meta.labels
    }

    pub fn corpus_stats(&self) -> CorpusStats {
        self.meta.stats
    }

    pub fn generation(&self) -> u64 {
        self.meta.generation
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Dataset view over all documents, for classifier training and evaluation
    pub fn dataset(&self) -> DatasetView<'_> {
        DatasetView { index: self }
    }
}

/// One labeled feature vector
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    pub doc_id: DocId,
    pub label: Option<&'a str>,
    pub vector: Arc<DocVector>,
}

/// Finite, restartable, doc-id-ascending view of a forward index
#[derive(Clone, Copy)]
pub struct DatasetView<'a> {
    index: &'a ForwardIndex,
}

impl<'a> DatasetView<'a> {
    pub fn len(&self) -> usize {
        self.index.num_docs() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn labels(&self) -> &'a [String] {
        self.index.labels()
    }

    /// Start a fresh pass from the first document
    pub fn iter(&self) -> DatasetIter<'a> {
        DatasetIter {
            index: self.index,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &DatasetView<'a> {
    type Item = Result<Instance<'a>>;
    type IntoIter = DatasetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct DatasetIter<'a> {
    index: &'a ForwardIndex,
    next: DocId,
}

impl<'a> Iterator for DatasetIter<'a> {
    type Item = Result<Instance<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let doc_id = self.next;
        let vector = match self.index.doc_vector(doc_id) {
            Ok(Some(vector)) => vector,
            Ok(None) => return None,
            Err(e) => {
                // Stop after reporting the failure once
                self.next = self.index.num_docs();
                return Some(Err(e));
            }
        };
        self.next += 1;
        Some(Ok(Instance {
            doc_id,
            label: self.index.label(doc_id),
            vector,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.index.num_docs().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}
