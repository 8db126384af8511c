//! Scoring framework.
//!
//! A [`Ranker`] sees the index only through [`ScoreData`], one bundle per
//! (query term, document) pair. A document's score is
//!
//! ```text
//! doc_constant(d) + Σ_t score_one(t, d)
//! ```
//!
//! where, for language-model rankers, `score_one = qtf × ln(smoothed_prob)`.
//! Frequency-based rankers override `score_one` with their own formula.

use crate::error::{Error, Result};
use crate::index::types::DocId;
use crate::query::frequency::{OkapiBm25, PivotedLength};
use crate::query::language_model::{AbsoluteDiscount, DirichletPrior, JelinekMercer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics for one (query term, document) pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreData {
    pub doc_id: DocId,
    /// Occurrences of the term in the document
    pub doc_term_count: u32,
    /// Document length in tokens
    pub doc_size: u64,
    pub doc_unique_terms: u32,
    /// Number of documents containing the term
    pub doc_count: u32,
    /// Occurrences of the term in the whole corpus
    pub corpus_term_count: u64,
    pub num_docs: u32,
    pub total_terms: u64,
    pub avg_doc_length: f64,
    /// Occurrences of the term in the query
    pub query_term_weight: f64,
    /// Total weight of all query terms
    pub query_length: f64,
}

impl ScoreData {
    /// Corpus-wide probability of the term
    pub fn background_prob(&self) -> f64 {
        if self.total_terms == 0 {
            0.0
        } else {
            self.corpus_term_count as f64 / self.total_terms as f64
        }
    }
}

/// A scoring function over [`ScoreData`]
pub trait Ranker: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Probability (or probability-like score) of the term under the
    /// document's model, in `[0, 1]`
    fn smoothed_prob(&self, sd: &ScoreData) -> f64;

    /// Query-independent per-document term, added once per scored document
    fn doc_constant(&self, sd: &ScoreData) -> f64;

    /// Contribution of one query term to a document's score
    fn score_one(&self, sd: &ScoreData) -> f64 {
        sd.query_term_weight * self.smoothed_prob(sd).ln()
    }

    /// Starting score for a document before any term is added
    fn initial_score(&self, sd: &ScoreData) -> f64 {
        self.doc_constant(sd)
    }
}

/// Ranker selection by name plus its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum RankerConfig {
    AbsoluteDiscount {
        #[serde(default = "default_delta")]
        delta: f64,
    },
    JelinekMercer {
        #[serde(default = "default_lambda")]
        lambda: f64,
    },
    DirichletPrior {
        #[serde(default = "default_mu")]
        mu: f64,
    },
    OkapiBm25 {
        #[serde(default = "default_k1")]
        k1: f64,
        #[serde(default = "default_b")]
        b: f64,
        #[serde(default = "default_k3")]
        k3: f64,
    },
    PivotedLength {
        #[serde(default = "default_s")]
        s: f64,
    },
}

pub(crate) fn default_delta() -> f64 {
    0.7
}

pub(crate) fn default_lambda() -> f64 {
    0.7
}

pub(crate) fn default_mu() -> f64 {
    2000.0
}

pub(crate) fn default_k1() -> f64 {
    1.2
}

pub(crate) fn default_b() -> f64 {
    0.75
}

pub(crate) fn default_k3() -> f64 {
    500.0
}

pub(crate) fn default_s() -> f64 {
    0.2
}

impl Default for RankerConfig {
    fn default() -> Self {
        RankerConfig::OkapiBm25 {
            k1: default_k1(),
            b: default_b(),
            k3: default_k3(),
        }
    }
}

impl RankerConfig {
    /// Validate parameters and construct the ranker
    pub fn build(&self) -> Result<Box<dyn Ranker>> {
        let ranker: Box<dyn Ranker> = match *self {
            RankerConfig::AbsoluteDiscount { delta } => Box::new(AbsoluteDiscount::new(delta)?),
            RankerConfig::JelinekMercer { lambda } => Box::new(JelinekMercer::new(lambda)?),
            RankerConfig::DirichletPrior { mu } => Box::new(DirichletPrior::new(mu)?),
            RankerConfig::OkapiBm25 { k1, b, k3 } => Box::new(OkapiBm25::new(k1, b, k3)?),
            RankerConfig::PivotedLength { s } => Box::new(PivotedLength::new(s)?),
        };
        tracing::debug!("Using ranker {:?}", ranker);
        Ok(ranker)
    }
}

/// Reject a parameter outside `[low, high]` (bounds optionally exclusive)
pub(crate) fn check_range(
    key: &str,
    value: f64,
    low: f64,
    low_inclusive: bool,
    high: f64,
    high_inclusive: bool,
) -> Result<f64> {
    let above = if low_inclusive { value >= low } else { value > low };
    let below = if high_inclusive { value <= high } else { value < high };
    if value.is_finite() && above && below {
        return Ok(value);
    }
    Err(Error::config(
        key,
        format!(
            "{value} is outside {}{low}, {high}{}",
            if low_inclusive { '[' } else { '(' },
            if high_inclusive { ']' } else { ')' },
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_prob_handles_empty_corpus() {
        let sd = ScoreData::default();
        assert_eq!(sd.background_prob(), 0.0);
    }

    #[test]
    fn test_config_by_name() {
        let config: RankerConfig =
            serde_json::from_str(r#"{"method":"absolute-discount","delta":0.5}"#).unwrap();
        assert_eq!(config, RankerConfig::AbsoluteDiscount { delta: 0.5 });
        assert_eq!(config.build().unwrap().name(), "absolute-discount");
    }

    #[test]
    fn test_config_defaults_fill_parameters() {
        let config: RankerConfig = serde_json::from_str(r#"{"method":"okapi-bm25"}"#).unwrap();
        assert_eq!(config, RankerConfig::default());
    }

    #[test]
    fn test_out_of_range_fails_build() {
        let bad = [
            RankerConfig::AbsoluteDiscount { delta: 0.0 },
            RankerConfig::AbsoluteDiscount { delta: 1.5 },
            RankerConfig::JelinekMercer { lambda: 1.0 },
            RankerConfig::DirichletPrior { mu: -1.0 },
            RankerConfig::OkapiBm25 { k1: 1.2, b: 2.0, k3: 500.0 },
            RankerConfig::PivotedLength { s: f64::NAN },
        ];
        for config in bad {
            assert!(
                matches!(config.build(), Err(Error::Config { .. })),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(serde_json::from_str::<RankerConfig>(r#"{"method":"tf-idf"}"#).is_err());
    }
}
