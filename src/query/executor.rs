use crate::analyzers::FeatureMap;
use crate::error::{Error, Result};
use crate::index::inverted::InvertedIndex;
use crate::index::types::{DocId, PostingsList, TermStats};
use crate::query::scorer::{Ranker, ScoreData};
use crate::query::topk::{SearchResult, TopKHeap};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Knobs for query evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Score every document, not just those sharing a term with the query
    pub include_unmatched: bool,
}

/// A query term resolved against the index
struct QueryTerm {
    weight: f64,
    stats: TermStats,
    postings: Arc<PostingsList>,
}

/// Ranked retrieval over an inverted index.
///
/// A searcher borrows the index and the ranker; both are read-only, so any
/// number of searchers may run concurrently.
pub struct Searcher<'a> {
    index: &'a InvertedIndex,
    ranker: &'a dyn Ranker,
    options: SearchOptions,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a InvertedIndex, ranker: &'a dyn Ranker) -> Self {
        Self {
            index,
            ranker,
            options: SearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Top `k` documents for a bag of query terms.
    ///
    /// Repeated terms raise the query term weight. Terms missing from the
    /// vocabulary are ignored.
    pub fn search(&self, terms: &[&str], k: usize) -> Result<Vec<SearchResult>> {
        let query: FeatureMap = terms.iter().map(|t| (*t, 1u32)).collect();
        self.search_features(&query, k)
    }

    /// Top `k` documents for an analyzed query
    pub fn search_features(&self, query: &FeatureMap, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let terms = self.resolve(query)?;
        if terms.is_empty() {
            tracing::debug!("No query term is in the vocabulary");
            return Ok(Vec::new());
        }
        let query_length = query.total() as f64;

        let mut top_k = TopKHeap::new(k);
        let mut cursors = vec![0usize; terms.len()];

        if self.options.include_unmatched {
            for doc_id in 0..self.index.num_docs() {
                let score = self.score_doc(doc_id, &terms, &mut cursors, query_length)?;
                top_k.try_insert(SearchResult { doc_id, score });
            }
        } else {
            while let Some(doc_id) = next_doc(&terms, &cursors) {
                let score = self.score_doc(doc_id, &terms, &mut cursors, query_length)?;
                top_k.try_insert(SearchResult { doc_id, score });
            }
        }

        let results = top_k.into_sorted_vec();
        tracing::debug!(
            "Ranked {} results with {} for {} query terms",
            results.len(),
            self.ranker.name(),
            terms.len()
        );
        Ok(results)
    }

    /// Run independent queries in parallel; results are in input order
    pub fn search_batch<Q>(&self, queries: &[Q], k: usize) -> Result<Vec<Vec<SearchResult>>>
    where
        Q: AsRef<[String]> + Sync,
    {
        queries
            .par_iter()
            .map(|q| {
                let terms: Vec<&str> = q.as_ref().iter().map(String::as_str).collect();
                self.search(&terms, k)
            })
            .collect()
    }

    fn resolve(&self, query: &FeatureMap) -> Result<Vec<QueryTerm>> {
        let mut terms = Vec::with_capacity(query.len());
        for (term, weight) in query.iter() {
            let Some(term_id) = self.index.term_to_id(term) else {
                tracing::trace!("Skipping unknown term {:?}", term);
                continue;
            };
            let (Some(stats), Some(postings)) =
                (self.index.term_stats(term_id), self.index.postings(term_id)?)
            else {
                continue;
            };
            terms.push(QueryTerm {
                weight: weight as f64,
                stats,
                postings,
            });
        }
        Ok(terms)
    }

    /// Score one document, advancing every cursor that sits on it.
    ///
    /// Documents must be visited in ascending id order.
    fn score_doc(
        &self,
        doc_id: DocId,
        terms: &[QueryTerm],
        cursors: &mut [usize],
        query_length: f64,
    ) -> Result<f64> {
        let missing = || Error::corrupt(self.index.path(), format!("doc {doc_id} has no entry"));
        let corpus = self.index.corpus_stats();
        let mut sd = ScoreData {
            doc_id,
            doc_size: self.index.doc_size(doc_id).ok_or_else(missing)?,
            doc_unique_terms: self.index.unique_terms(doc_id).ok_or_else(missing)?,
            num_docs: corpus.num_docs,
            total_terms: corpus.total_terms,
            avg_doc_length: corpus.avg_doc_length,
            query_length,
            ..Default::default()
        };

        let mut score = self.ranker.initial_score(&sd);
        for (term, cursor) in terms.iter().zip(cursors.iter_mut()) {
            let postings = &term.postings.postings;
            let count = match postings.get(*cursor) {
                Some(p) if p.doc_id == doc_id => {
                    *cursor += 1;
                    p.count
                }
                _ => 0,
            };
            sd.doc_term_count = count;
            sd.doc_count = term.stats.doc_freq;
            sd.corpus_term_count = term.stats.total_term_freq;
            sd.query_term_weight = term.weight;
            score += self.ranker.score_one(&sd);
        }
        Ok(score)
    }
}

/// Smallest doc id under any cursor
fn next_doc(terms: &[QueryTerm], cursors: &[usize]) -> Option<DocId> {
    terms
        .iter()
        .zip(cursors)
        .filter_map(|(term, &pos)| term.postings.postings.get(pos).map(|p| p.doc_id))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::index::types::{BuildConfig, Document};
    use crate::index::writer::IndexBuilder;
    use crate::query::frequency::OkapiBm25;
    use crate::query::language_model::AbsoluteDiscount;
    use std::path::Path;

    fn doc(terms: &[(&str, u32)]) -> Document {
        Document::new(terms.iter().copied().collect())
    }

    fn build(path: &Path) -> InvertedIndex {
        let docs = vec![
            doc(&[("cat", 2), ("dog", 1)]),
            doc(&[("bird", 4)]),
            doc(&[("cat", 1), ("bird", 1)]),
            doc(&[("fish", 3)]),
            doc(&[("cat", 5), ("dog", 2), ("fish", 1)]),
        ];
        IndexBuilder::build(path, BuildConfig::default(), docs).unwrap();
        InvertedIndex::open_with_policy(path, &CachePolicy::default()).unwrap()
    }

    #[test]
    fn test_single_term_returns_containing_docs() {
        let tmp = tempfile::tempdir().unwrap();
        let index = build(&tmp.path().join("idx"));
        let ranker = AbsoluteDiscount::default();
        let searcher = Searcher::new(&index, &ranker);

        let results = searcher.search(&["cat"], 10).unwrap();
        let mut ids: Vec<DocId> = results.iter().map(|r| r.doc_id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 2, 4]);
    }

    #[test]
    fn test_results_sorted_and_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let index = build(&tmp.path().join("idx"));
        let ranker = OkapiBm25::default();
        let searcher = Searcher::new(&index, &ranker);

        let results = searcher.search(&["cat", "dog"], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        let mut ids: Vec<DocId> = results.iter().map(|r| r.doc_id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 4]);
    }

    #[test]
    fn test_unknown_terms_and_zero_k() {
        let tmp = tempfile::tempdir().unwrap();
        let index = build(&tmp.path().join("idx"));
        let ranker = OkapiBm25::default();
        let searcher = Searcher::new(&index, &ranker);

        assert!(searcher.search(&["zebra"], 5).unwrap().is_empty());
        assert!(searcher.search(&["cat"], 0).unwrap().is_empty());
        let with_unknown = searcher.search(&["cat", "zebra"], 5).unwrap();
        let without = searcher.search(&["cat"], 5).unwrap();
        assert_eq!(with_unknown, without);
    }

    #[test]
    fn test_repeated_term_raises_weight() {
        let tmp = tempfile::tempdir().unwrap();
        let index = build(&tmp.path().join("idx"));
        let ranker = OkapiBm25::default();
        let searcher = Searcher::new(&index, &ranker);

        let once = searcher.search(&["fish"], 1).unwrap();
        let twice = searcher.search(&["fish", "fish"], 1).unwrap();
        assert_eq!(once[0].doc_id, twice[0].doc_id);
        assert!(twice[0].score > once[0].score);
    }

    #[test]
    fn test_include_unmatched_scores_every_doc() {
        let tmp = tempfile::tempdir().unwrap();
        let index = build(&tmp.path().join("idx"));
        let ranker = AbsoluteDiscount::default();
        let searcher = Searcher::new(&index, &ranker).with_options(SearchOptions {
            include_unmatched: true,
        });

        let results = searcher.search(&["dog"], 10).unwrap();
        assert_eq!(results.len(), 5);
        let top: Vec<DocId> = results[..2].iter().map(|r| r.doc_id).collect();
        assert!(top.contains(&0) && top.contains(&4));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let tmp = tempfile::tempdir().unwrap();
        let index = build(&tmp.path().join("idx"));
        let ranker = OkapiBm25::default();
        let searcher = Searcher::new(&index, &ranker);

        let queries = vec![
            vec!["cat".to_string()],
            vec!["bird".to_string(), "fish".to_string()],
        ];
        let batch = searcher.search_batch(&queries, 3).unwrap();
        assert_eq!(batch[0], searcher.search(&["cat"], 3).unwrap());
        assert_eq!(batch[1], searcher.search(&["bird", "fish"], 3).unwrap());
    }
}
