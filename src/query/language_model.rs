//! Language-model rankers.
//!
//! Each ranker smooths the document's maximum-likelihood estimate
//! `c(t, d) / |d|` toward the background model `p(t | C)` and scores a
//! document by the query log-likelihood. An empty document has no
//! evidence of its own and falls back to the background probability.

use crate::error::Result;
use crate::query::scorer::{
    check_range, default_delta, default_lambda, default_mu, Ranker, ScoreData,
};

/// Absolute discounting: subtract `delta` from every observed count and
/// hand the freed mass to the background model.
///
/// ```text
/// p(t|d) = max(c − δ, 0) / |d| + (δ · u_d / |d|) · p(t|C)
/// ```
///
/// With `0 < δ ≤ 1` and every stored count ≥ 1, the discounted mass is
/// exactly `δ · u_d / |d|`, so the probabilities over the vocabulary sum
/// to one.
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteDiscount {
    delta: f64,
}

impl AbsoluteDiscount {
    pub fn new(delta: f64) -> Result<Self> {
        let delta = check_range("delta", delta, 0.0, false, 1.0, true)?;
        Ok(Self { delta })
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Mass moved to the background model for this document
    pub fn background_weight(&self, sd: &ScoreData) -> f64 {
        if sd.doc_size == 0 {
            return 1.0;
        }
        self.delta * sd.doc_unique_terms as f64 / sd.doc_size as f64
    }
}

impl Default for AbsoluteDiscount {
    fn default() -> Self {
        Self {
            delta: default_delta(),
        }
    }
}

impl Ranker for AbsoluteDiscount {
    fn name(&self) -> &'static str {
        "absolute-discount"
    }

    fn smoothed_prob(&self, sd: &ScoreData) -> f64 {
        let background = sd.background_prob();
        if sd.doc_size == 0 {
            return background;
        }
        let discounted = (sd.doc_term_count as f64 - self.delta).max(0.0) / sd.doc_size as f64;
        discounted + self.background_weight(sd) * background
    }

    fn doc_constant(&self, _sd: &ScoreData) -> f64 {
        0.0
    }
}

/// Jelinek-Mercer: fixed linear interpolation with weight `lambda` on the background.
#[derive(Debug, Clone, Copy)]
pub struct JelinekMercer {
    lambda: f64,
}

impl JelinekMercer {
    pub fn new(lambda: f64) -> Result<Self> {
        let lambda = check_range("lambda", lambda, 0.0, false, 1.0, false)?;
        Ok(Self { lambda })
    }
}

impl Default for JelinekMercer {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
        }
    }
}

impl Ranker for JelinekMercer {
    fn name(&self) -> &'static str {
        "jelinek-mercer"
    }

    fn smoothed_prob(&self, sd: &ScoreData) -> f64 {
        let background = sd.background_prob();
        if sd.doc_size == 0 {
            return background;
        }
        let ml = sd.doc_term_count as f64 / sd.doc_size as f64;
        (1.0 - self.lambda) * ml + self.lambda * background
    }

    fn doc_constant(&self, _sd: &ScoreData) -> f64 {
        0.0
    }
}

/// Dirichlet prior: `mu` pseudo-counts drawn from the background model.
#[derive(Debug, Clone, Copy)]
pub struct DirichletPrior {
    mu: f64,
}

impl DirichletPrior {
    pub fn new(mu: f64) -> Result<Self> {
        let mu = check_range("mu", mu, 0.0, false, f64::MAX, true)?;
        Ok(Self { mu })
    }
}

impl Default for DirichletPrior {
    fn default() -> Self {
        Self { mu: default_mu() }
    }
}

impl Ranker for DirichletPrior {
    fn name(&self) -> &'static str {
        "dirichlet-prior"
    }

    fn smoothed_prob(&self, sd: &ScoreData) -> f64 {
        let background = sd.background_prob();
        (sd.doc_term_count as f64 + self.mu * background) / (sd.doc_size as f64 + self.mu)
    }

    fn doc_constant(&self, _sd: &ScoreData) -> f64 {
        0.0
    }
}
