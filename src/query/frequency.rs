//! Term-frequency rankers.
//!
//! These score a document directly from saturated term frequency, length
//! normalization and inverse document frequency. A term with zero count in
//! the document contributes nothing. `smoothed_prob` maps the same
//! quantities into `[0, 1)` so the rankers can still be compared by
//! probability-style callers.

use crate::error::Result;
use crate::query::scorer::{
    check_range, default_b, default_k1, default_k3, default_s, Ranker, ScoreData,
};

/// Document length relative to the corpus average; 1 when the corpus is empty
#[inline]
fn relative_length(sd: &ScoreData) -> f64 {
    if sd.avg_doc_length > 0.0 {
        sd.doc_size as f64 / sd.avg_doc_length
    } else {
        1.0
    }
}

/// Okapi BM25
#[derive(Debug, Clone, Copy)]
pub struct OkapiBm25 {
    k1: f64,
    b: f64,
    k3: f64,
}

impl OkapiBm25 {
    pub fn new(k1: f64, b: f64, k3: f64) -> Result<Self> {
        Ok(Self {
            k1: check_range("k1", k1, 0.0, true, f64::MAX, true)?,
            b: check_range("b", b, 0.0, true, 1.0, true)?,
            k3: check_range("k3", k3, 0.0, true, f64::MAX, true)?,
        })
    }

    fn idf(&self, sd: &ScoreData) -> f64 {
        let n = sd.num_docs as f64;
        let df = sd.doc_count as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn tf(&self, sd: &ScoreData) -> f64 {
        let c = sd.doc_term_count as f64;
        let norm = (1.0 - self.b) + self.b * relative_length(sd);
        (self.k1 + 1.0) * c / (self.k1 * norm + c)
    }

    fn qtf(&self, sd: &ScoreData) -> f64 {
        let q = sd.query_term_weight;
        (self.k3 + 1.0) * q / (self.k3 + q)
    }
}

impl Default for OkapiBm25 {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            k3: default_k3(),
        }
    }
}

impl Ranker for OkapiBm25 {
    fn name(&self) -> &'static str {
        "okapi-bm25"
    }

    fn smoothed_prob(&self, sd: &ScoreData) -> f64 {
        if sd.doc_term_count == 0 {
            return 0.0;
        }
        self.tf(sd) / (self.k1 + 1.0)
    }

    fn doc_constant(&self, _sd: &ScoreData) -> f64 {
        0.0
    }

    fn score_one(&self, sd: &ScoreData) -> f64 {
        if sd.doc_term_count == 0 {
            return 0.0;
        }
        self.tf(sd) * self.idf(sd) * self.qtf(sd)
    }
}

/// Pivoted length normalization
#[derive(Debug, Clone, Copy)]
pub struct PivotedLength {
    s: f64,
}

impl PivotedLength {
    pub fn new(s: f64) -> Result<Self> {
        let s = check_range("s", s, 0.0, true, 1.0, true)?;
        Ok(Self { s })
    }

    /// Sublinear tf over the pivoted length norm
    fn normalized_tf(&self, sd: &ScoreData) -> f64 {
        let tf = 1.0 + (1.0 + (sd.doc_term_count as f64).ln()).ln();
        let norm = (1.0 - self.s) + self.s * relative_length(sd);
        tf / norm
    }
}

impl Default for PivotedLength {
    fn default() -> Self {
        Self { s: default_s() }
    }
}

impl Ranker for PivotedLength {
    fn name(&self) -> &'static str {
        "pivoted-length"
    }

    fn smoothed_prob(&self, sd: &ScoreData) -> f64 {
        if sd.doc_term_count == 0 {
            return 0.0;
        }
        let x = self.normalized_tf(sd);
        x / (1.0 + x)
    }

    fn doc_constant(&self, _sd: &ScoreData) -> f64 {
        0.0
    }

    fn score_one(&self, sd: &ScoreData) -> f64 {
        if sd.doc_term_count == 0 {
            return 0.0;
        }
        let idf = ((sd.num_docs as f64 + 1.0) / (0.5 + sd.doc_count as f64)).ln();
        sd.query_term_weight * self.normalized_tf(sd) * idf
    }
}
