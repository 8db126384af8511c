use crate::error::{Error, Result};
use crate::index::dir::IndexDir;
use crate::index::types::*;
use crate::utils::{
    encode_postings, encode_vector, read_u32_le, read_u64_le, write_u16_le, write_u32_le,
    write_u64_le,
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Buffered (term, doc, count) triple awaiting a sorted flush
type Triple = (TermId, DocId, u32);

const TRIPLE_SIZE: usize = std::mem::size_of::<Triple>();

/// What a finished build produced, computed in memory during the build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub path: PathBuf,
    pub stats: CorpusStats,
    /// Per-term statistics indexed by term id
    pub term_stats: Vec<TermStats>,
    /// Number of sorted runs merged into the final postings
    pub runs: usize,
}

/// Builds a sealed inverted + forward index from a stream of documents.
///
/// Term vectors stream straight into the forward file. Postings triples
/// collect in a buffer that is sorted and flushed as a run whenever it
/// exceeds [`BuildConfig::max_buffer_bytes`]; [`IndexBuilder::finish`]
/// merges the runs into the final postings and seals the directory.
pub struct IndexBuilder {
    dir: IndexDir,
    config: BuildConfig,
    term_ids: FxHashMap<String, TermId>,
    terms: Vec<String>,
    /// Maintained incrementally as documents arrive
    term_stats: Vec<TermStats>,
    label_ids: FxHashMap<String, u32>,
    labels: Vec<String>,
    documents: Vec<DocEntry>,
    total_terms: u64,
    forward: BufWriter<File>,
    forward_offset: u64,
    buffer: Vec<Triple>,
    runs: Vec<PathBuf>,
    scratch: Vec<u8>,
}

impl IndexBuilder {
    /// Start a build in a fresh directory
    pub fn create(path: &Path, config: BuildConfig) -> Result<Self> {
        Self::create_inner(path, config).map_err(Error::into_build_abort)
    }

    fn create_inner(path: &Path, config: BuildConfig) -> Result<Self> {
        let dir = IndexDir::create(path)?;
        fs::create_dir_all(dir.file(CHUNKS_DIR))?;
        let forward = BufWriter::new(File::create(dir.file(FORWARD_FILE))?);

        tracing::info!("Building index at {}", path.display());

        Ok(Self {
            dir,
            config,
            term_ids: FxHashMap::default(),
            terms: Vec::new(),
            term_stats: Vec::new(),
            label_ids: FxHashMap::default(),
            labels: Vec::new(),
            documents: Vec::new(),
            total_terms: 0,
            forward,
            forward_offset: 0,
            buffer: Vec::new(),
            runs: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Build a whole corpus in one call
    pub fn build<I>(path: &Path, config: BuildConfig, documents: I) -> Result<BuildSummary>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut builder = Self::create(path, config)?;
        for doc in documents {
            builder.add_document(doc)?;
        }
        builder.finish()
    }

    /// Add a document, returning its id
    pub fn add_document(&mut self, doc: Document) -> Result<DocId> {
        self.add_document_inner(doc).map_err(Error::into_build_abort)
    }

    fn add_document_inner(&mut self, doc: Document) -> Result<DocId> {
        let doc_id = DocId::try_from(self.documents.len())
            .map_err(|_| Error::build("document id space exhausted"))?;
        if let Some(requested) = doc.id {
            if requested != doc_id {
                return Err(Error::build(format!(
                    "document id {requested} out of order; expected {doc_id}"
                )));
            }
        }

        let mut vector = Vec::with_capacity(doc.features.len());
        for (term, count) in doc.features.iter() {
            let term_id = self.intern_term(term)?;
            let stats = &mut self.term_stats[term_id as usize];
            stats.doc_freq += 1;
            stats.total_term_freq += count as u64;

            vector.push(TermCount { term_id, count });
            self.buffer.push((term_id, doc_id, count));
        }

        self.scratch.clear();
        encode_vector(&vector, &mut self.scratch);
        self.forward.write_all(&self.scratch)?;

        let length = doc.features.total();
        self.total_terms += length;

        let label = match doc.label {
            Some(label) => self.intern_label(label),
            None => NO_LABEL,
        };

        self.documents.push(DocEntry {
            doc_id,
            length,
            unique_terms: vector.len() as u32,
            label,
            forward_offset: self.forward_offset,
            forward_len: self.scratch.len() as u32,
        });
        self.forward_offset += self.scratch.len() as u64;

        if self.buffer.len() * TRIPLE_SIZE >= self.config.max_buffer_bytes {
            self.flush_run()?;
        }

        Ok(doc_id)
    }

    fn intern_term(&mut self, term: &str) -> Result<TermId> {
        if let Some(&id) = self.term_ids.get(term) {
            return Ok(id);
        }
        if term.len() > u16::MAX as usize {
            return Err(Error::build(format!(
                "term of {} bytes exceeds the vocabulary limit",
                term.len()
            )));
        }

        let id = self.terms.len() as TermId;
        self.terms.push(term.to_string());
        self.term_ids.insert(term.to_string(), id);
        self.term_stats.push(TermStats::default());
        Ok(id)
    }

    fn intern_label(&mut self, label: String) -> u32 {
        if let Some(&id) = self.label_ids.get(&label) {
            return id;
        }
        let id = self.labels.len() as u32;
        self.label_ids.insert(label.clone(), id);
        self.labels.push(label);
        id
    }

    /// Number of documents added so far
    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    /// Sort the postings buffer and write it out as a run
    fn flush_run(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        // (term, doc) order; doc ids are unique per term within a run
        if self.config.parallel_sort {
            self.buffer.par_sort_unstable();
        } else {
            self.buffer.sort_unstable();
        }

        let run_path = self
            .dir
            .file(CHUNKS_DIR)
            .join(format!("run_{:04}.bin", self.runs.len()));
        let mut file = BufWriter::new(File::create(&run_path)?);

        write_u64_le(&mut file, self.buffer.len() as u64)?;
        for &(term_id, doc_id, count) in &self.buffer {
            write_u32_le(&mut file, term_id)?;
            write_u32_le(&mut file, doc_id)?;
            write_u32_le(&mut file, count)?;
        }
        file.flush()?;

        tracing::debug!(
            "Flushed run {} ({} postings)",
            self.runs.len(),
            self.buffer.len()
        );

        self.runs.push(run_path);
        self.buffer.clear();
        Ok(())
    }

    /// Merge runs, write vocabulary, document table and metadata, then seal
    pub fn finish(self) -> Result<BuildSummary> {
        self.finish_inner().map_err(Error::into_build_abort)
    }

    fn finish_inner(mut self) -> Result<BuildSummary> {
        self.flush_run()?;
        self.forward.flush()?;

        let vocab = self.merge_runs()?;
        self.write_vocab(&vocab)?;
        self.write_documents()?;

        fs::remove_dir_all(self.dir.file(CHUNKS_DIR))?;

        let num_docs = self.documents.len() as u32;
        let stats = CorpusStats {
            num_docs,
            total_terms: self.total_terms,
            avg_doc_length: if num_docs == 0 {
                0.0
            } else {
                self.total_terms as f64 / num_docs as f64
            },
            vocab_size: self.terms.len() as u32,
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let meta = IndexMeta {
            version: INDEX_VERSION,
            generation: now.as_nanos() as u64,
            stats,
            labels: self.labels.clone(),
            created_at: now.as_secs(),
        };
        self.dir.write_meta(&meta)?;

        tracing::info!(
            "Sealed index: {} documents, {} terms, {} tokens from {} runs",
            stats.num_docs,
            stats.vocab_size,
            stats.total_terms,
            self.runs.len()
        );

        Ok(BuildSummary {
            path: self.dir.path().to_path_buf(),
            stats,
            term_stats: self.term_stats,
            runs: self.runs.len(),
        })
    }

    /// K-way merge of all runs into postings.bin, returning the vocabulary
    fn merge_runs(&self) -> Result<Vec<TermEntry>> {
        let mut readers = self
            .runs
            .iter()
            .map(|p| RunReader::open(p))
            .collect::<Result<Vec<_>>>()?;

        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (idx, reader) in readers.iter_mut().enumerate() {
            if let Some((term_id, doc_id, count)) = reader.next_triple()? {
                heap.push(Reverse((term_id, doc_id, count, idx)));
            }
        }

        let mut merger = TermMerger::new(&self.dir, &self.terms, &self.term_stats)?;

        while let Some(Reverse((term_id, doc_id, count, idx))) = heap.pop() {
            merger.push(term_id, doc_id, count)?;
            if let Some((t, d, c)) = readers[idx].next_triple()? {
                heap.push(Reverse((t, d, c, idx)));
            }
        }

        merger.finish()
    }

    fn write_vocab(&self, vocab: &[TermEntry]) -> Result<()> {
        let mut file = BufWriter::new(File::create(self.dir.file(VOCAB_FILE))?);

        write_u32_le(&mut file, vocab.len() as u32)?;
        for entry in vocab {
            let bytes = entry.term.as_bytes();
            write_u16_le(&mut file, bytes.len() as u16)?;
            file.write_all(bytes)?;
            write_u64_le(&mut file, entry.offset)?;
            write_u32_le(&mut file, entry.length)?;
            write_u32_le(&mut file, entry.doc_freq)?;
            write_u64_le(&mut file, entry.total_term_freq)?;
        }

        file.flush()?;
        Ok(())
    }

    fn write_documents(&self) -> Result<()> {
        let mut file = BufWriter::new(File::create(self.dir.file(DOCS_FILE))?);

        write_u32_le(&mut file, self.documents.len() as u32)?;
        for doc in &self.documents {
            write_u32_le(&mut file, doc.doc_id)?;
            write_u64_le(&mut file, doc.length)?;
            write_u32_le(&mut file, doc.unique_terms)?;
            write_u32_le(&mut file, doc.label)?;
            write_u64_le(&mut file, doc.forward_offset)?;
            write_u32_le(&mut file, doc.forward_len)?;
        }

        file.flush()?;
        Ok(())
    }
}

/// Sequential reader over one sorted run file
struct RunReader {
    file: BufReader<File>,
    remaining: u64,
}

impl RunReader {
    fn open(path: &Path) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        let remaining = read_u64_le(&mut file)?;
        Ok(Self { file, remaining })
    }

    fn next_triple(&mut self) -> Result<Option<Triple>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let term_id = read_u32_le(&mut self.file)?;
        let doc_id = read_u32_le(&mut self.file)?;
        let count = read_u32_le(&mut self.file)?;
        Ok(Some((term_id, doc_id, count)))
    }
}

/// Groups the merged triple stream by term and writes each postings list
struct TermMerger<'a> {
    postings_file: BufWriter<File>,
    offset: u64,
    terms: &'a [String],
    expected: &'a [TermStats],
    current: Option<TermId>,
    postings: Vec<Posting>,
    vocab: Vec<TermEntry>,
    encoded: Vec<u8>,
}

impl<'a> TermMerger<'a> {
    fn new(dir: &IndexDir, terms: &'a [String], expected: &'a [TermStats]) -> Result<Self> {
        Ok(Self {
            postings_file: BufWriter::new(File::create(dir.file(POSTINGS_FILE))?),
            offset: 0,
            terms,
            expected,
            current: None,
            postings: Vec::new(),
            vocab: Vec::with_capacity(terms.len()),
            encoded: Vec::new(),
        })
    }

    fn push(&mut self, term_id: TermId, doc_id: DocId, count: u32) -> Result<()> {
        if self.current != Some(term_id) {
            self.emit()?;
            self.current = Some(term_id);
        }

        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.count = last.count.saturating_add(count);
            }
            Some(last) if last.doc_id > doc_id => {
                return Err(Error::build(format!(
                    "merge produced doc {doc_id} after {} for term {term_id}",
                    last.doc_id
                )));
            }
            _ => self.postings.push(Posting { doc_id, count }),
        }
        Ok(())
    }

    /// Write out the postings collected for the current term
    fn emit(&mut self) -> Result<()> {
        let Some(term_id) = self.current.take() else {
            return Ok(());
        };

        // Term ids come out of the merge densely and in order
        if term_id as usize != self.vocab.len() {
            return Err(Error::build(format!(
                "merge skipped term ids: got {term_id}, expected {}",
                self.vocab.len()
            )));
        }

        let stats = TermStats {
            doc_freq: self.postings.len() as u32,
            total_term_freq: self.postings.iter().map(|p| p.count as u64).sum(),
        };
        if stats != self.expected[term_id as usize] {
            return Err(Error::build(format!(
                "merged statistics for '{}' disagree with build counts",
                self.terms[term_id as usize]
            )));
        }

        self.encoded.clear();
        encode_postings(&self.postings, &mut self.encoded);
        self.postings_file.write_all(&self.encoded)?;

        self.vocab.push(TermEntry {
            term: self.terms[term_id as usize].clone(),
            offset: self.offset,
            length: self.encoded.len() as u32,
            doc_freq: stats.doc_freq,
            total_term_freq: stats.total_term_freq,
        });
        self.offset += self.encoded.len() as u64;
        self.postings.clear();
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<TermEntry>> {
        self.emit()?;
        self.postings_file.flush()?;

        if self.vocab.len() != self.terms.len() {
            return Err(Error::build(format!(
                "merge wrote {} of {} terms",
                self.vocab.len(),
                self.terms.len()
            )));
        }
        Ok(self.vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::FeatureMap;

    fn doc(terms: &[(&str, u32)]) -> Document {
        Document::new(terms.iter().copied().collect::<FeatureMap>())
    }

    #[test]
    fn test_out_of_order_id_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder =
            IndexBuilder::create(&tmp.path().join("idx"), BuildConfig::default()).unwrap();
        builder.add_document(doc(&[("a", 1)])).unwrap();
        let err = builder.add_document(doc(&[("b", 1)]).with_id(5)).unwrap_err();
        assert!(matches!(err, Error::BuildAborted { .. }));
    }

    #[test]
    fn test_small_buffer_produces_many_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            max_buffer_bytes: TRIPLE_SIZE * 2,
            parallel_sort: false,
        };
        let docs = (0..10).map(|i| {
            let side = if i % 2 == 0 { "even" } else { "odd" };
            doc(&[("shared", 1), (side, i + 1)])
        });
        let summary = IndexBuilder::build(&tmp.path().join("idx"), config, docs).unwrap();

        assert!(summary.runs >= 5);
        assert_eq!(summary.stats.num_docs, 10);
        assert_eq!(summary.stats.vocab_size, 3);
        assert_eq!(summary.term_stats[0], TermStats { doc_freq: 10, total_term_freq: 10 });
        assert!(!tmp.path().join("idx").join(CHUNKS_DIR).exists());
    }

    #[test]
    fn test_empty_document_gets_an_id() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = vec![doc(&[("x", 2)]), doc(&[]), doc(&[("x", 1)])];
        let summary =
            IndexBuilder::build(&tmp.path().join("idx"), BuildConfig::default(), docs).unwrap();
        assert_eq!(summary.stats.num_docs, 3);
        assert_eq!(summary.stats.total_terms, 3);
        assert!((summary.stats.avg_doc_length - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_corpus_seals() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("idx");
        let summary = IndexBuilder::build(&path, BuildConfig::default(), Vec::new()).unwrap();
        assert_eq!(summary.stats, CorpusStats::default());
        assert!(IndexDir::exists(&path));
    }
}
