use crate::analyzers::{Analyzer, FeatureMap, FilterChain};
use crate::error::{Error, Result};

/// Counts word n-grams over the output of a [`FilterChain`].
///
/// N-grams are joined with `_`, so the bigram of `two three` is `two_three`.
#[derive(Debug, Clone)]
pub struct NgramWordAnalyzer {
    n: usize,
    chain: FilterChain,
}

impl NgramWordAnalyzer {
    pub fn new(n: usize, chain: FilterChain) -> Result<Self> {
        if n == 0 {
            return Err(Error::config("ngram", "n-gram size must be at least 1"));
        }
        Ok(Self { n, chain })
    }

    pub fn n(&self) -> usize {
        self.n
    }
}

impl Analyzer for NgramWordAnalyzer {
    fn analyze(&self, text: &str) -> FeatureMap {
        let tokens = self.chain.apply(text);
        let mut counts = FeatureMap::new();

        if self.n == 1 {
            for token in &tokens {
                counts.increment(token, 1);
            }
            return counts;
        }

        for window in tokens.windows(self.n) {
            counts.increment(&window.join("_"), 1);
        }
        counts
    }
}
