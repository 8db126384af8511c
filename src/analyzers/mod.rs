//! Token source: turns raw text into term → count maps.
//!
//! The index builder only ever sees a [`FeatureMap`]; anything able to
//! produce one can feed it. [`NgramWordAnalyzer`] with the
//! [`FilterChain::default_chain`] is the stock implementation used by the CLI.

pub mod filters;
pub mod ngram;

pub use filters::*;
pub use ngram::*;

use rustc_hash::FxHashMap;

/// Anything that converts document text into term counts
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> FeatureMap;
}

/// Insertion-ordered term → count map.
///
/// Terms are deduplicated and zero counts are never stored, so the map can
/// be handed to the builder as-is.
#[derive(Debug, Clone, Default)]
pub struct FeatureMap {
    entries: Vec<(String, u32)>,
    positions: FxHashMap<String, usize>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `by` occurrences of a term
    pub fn increment(&mut self, term: &str, by: u32) {
        if by == 0 {
            return;
        }
        if let Some(&pos) = self.positions.get(term) {
            let slot = &mut self.entries[pos].1;
            *slot = slot.saturating_add(by);
        } else {
            self.positions.insert(term.to_string(), self.entries.len());
            self.entries.push((term.to_string(), by));
        }
    }

    pub fn get(&self, term: &str) -> u32 {
        self.positions
            .get(term)
            .map(|&pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    /// Number of distinct terms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c as u64).sum()
    }

    /// Iterate in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(t, c)| (t.as_str(), *c))
    }
}

impl<S: AsRef<str>> FromIterator<(S, u32)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut map = FeatureMap::new();
        for (term, count) in iter {
            map.increment(term.as_ref(), count);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_map_dedups_and_keeps_order() {
        let map: FeatureMap = [("b", 1), ("a", 2), ("b", 3), ("c", 0)]
            .into_iter()
            .collect();
        let terms: Vec<_> = map.iter().collect();
        assert_eq!(terms, vec![("b", 4), ("a", 2)]);
        assert_eq!(map.total(), 6);
        assert_eq!(map.get("c"), 0);
    }
}
