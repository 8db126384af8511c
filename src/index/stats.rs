use crate::cache::CachePolicy;
use crate::error::Result;
use crate::index::inverted::InvertedIndex;
use crate::index::types::TermId;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Terms listed under "Most frequent terms"
const TOP_TERMS: usize = 15;

/// Display index statistics
pub fn show_stats(index_path: &Path) -> Result<()> {
    let index = InvertedIndex::open_with_policy(index_path, &CachePolicy::NoEvict)?;
    let stats = index.corpus_stats();

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index location:   {}", index.path().display());
    println!("Generation:       {}", index.generation());
    println!("Documents:        {}", stats.num_docs);
    println!("Vocabulary:       {}", stats.vocab_size);
    println!("Total terms:      {}", stats.total_terms);
    println!("Avg doc length:   {:.2}", stats.avg_doc_length);

    let mut label_counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut unlabeled = 0usize;
    for doc_id in 0..stats.num_docs {
        match index.label(doc_id) {
            Some(label) => *label_counts.entry(label).or_insert(0) += 1,
            None => unlabeled += 1,
        }
    }
    if !label_counts.is_empty() {
        println!();
        println!("Documents by label:");
        let mut sorted: Vec<_> = label_counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (label, count) in &sorted {
            println!("  {:15} {}", label, count);
        }
        if unlabeled > 0 {
            println!("  {:15} {}", "(none)", unlabeled);
        }
    }

    let mut terms: Vec<TermId> = (0..stats.vocab_size).collect();
    terms.sort_by_key(|&t| std::cmp::Reverse(index.total_term_freq(t)));
    if !terms.is_empty() {
        println!();
        println!("Most frequent terms:");
        for &term_id in terms.iter().take(TOP_TERMS) {
            println!(
                "  {:20} {:>10} occurrences in {} docs",
                index.term_text(term_id).unwrap_or("?"),
                index.total_term_freq(term_id),
                index.doc_freq(term_id)
            );
        }
        if terms.len() > TOP_TERMS {
            println!("  ... and {} more", terms.len() - TOP_TERMS);
        }
    }

    if let Ok(size) = dir_size(index.path()) {
        println!();
        println!("Index size:       {}", format_size(size));
    }

    Ok(())
}

/// Calculate directory size recursively
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0;
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                size += entry.metadata()?.len();
            } else if path.is_dir() {
                size += dir_size(&path)?;
            }
        }
    }
    Ok(size)
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
