//! Bounded top-k selection over scored documents.

use crate::index::types::DocId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One scored document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f64,
}

/// Heap entry ordered so that the *worst* result compares greatest.
///
/// Worse means a lower score, or an equal score with a higher doc id. The
/// `BinaryHeap` top is therefore always the entry to evict next.
#[derive(Debug, Clone, Copy)]
struct Ranked(SearchResult);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .total_cmp(&self.0.score)
            .then(self.0.doc_id.cmp(&other.0.doc_id))
    }
}

/// Keeps the best `k` results seen so far
pub struct TopKHeap {
    heap: BinaryHeap<Ranked>,
    capacity: usize,
}

impl TopKHeap {
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1 << 16)),
            capacity: k,
        }
    }

    /// Offer a result; returns true if it is now among the best `k`
    pub fn try_insert(&mut self, result: SearchResult) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let entry = Ranked(result);
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if entry < *worst => {
                self.heap.pop();
                self.heap.push(entry);
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Results by score descending, ties broken by ascending doc id
    pub fn into_sorted_vec(self) -> Vec<SearchResult> {
        self.heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(doc_id: DocId, score: f64) -> SearchResult {
        SearchResult { doc_id, score }
    }

    #[test]
    fn test_top_k_heap_basic() {
        let mut heap = TopKHeap::new(3);
        assert!(!heap.is_full());

        heap.try_insert(result(1, 1.0));
        heap.try_insert(result(2, 3.0));
        heap.try_insert(result(3, 2.0));
        assert!(heap.is_full());

        assert!(!heap.try_insert(result(4, 0.5)));
        assert_eq!(heap.len(), 3);

        assert!(heap.try_insert(result(5, 4.0)));
        assert_eq!(heap.len(), 3);

        let scores: Vec<f64> = heap.into_sorted_vec().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_ties_prefer_lower_doc_id() {
        let mut heap = TopKHeap::new(2);
        for doc_id in [7, 3, 9, 1] {
            heap.try_insert(result(doc_id, 1.5));
        }
        let ids: Vec<DocId> = heap.into_sorted_vec().iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_negative_scores_order() {
        let mut heap = TopKHeap::new(3);
        heap.try_insert(result(0, -4.2));
        heap.try_insert(result(1, -0.3));
        heap.try_insert(result(2, -9.0));
        let ids: Vec<DocId> = heap.into_sorted_vec().iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut heap = TopKHeap::new(0);
        assert!(!heap.try_insert(result(0, 1.0)));
        assert!(heap.is_empty());
    }
}
