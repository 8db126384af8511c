//! Building an index from a line-oriented text corpus.
//!
//! Each line is one document. A line of the form `label<TAB>text` carries a
//! class label; any other line is unlabeled text. Blank lines still produce
//! (empty) documents so that doc ids match line numbers.

use crate::analyzers::Analyzer;
use crate::error::{Error, Result};
use crate::index::dir::{self, IndexDir};
use crate::index::types::{BuildConfig, Document};
use crate::index::writer::{BuildSummary, IndexBuilder};
use crate::utils::progress::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lines analyzed in parallel before being handed to the builder in order
const CHUNK_LINES: usize = 8192;

/// Split `label<TAB>text`; lines without a tab are unlabeled
pub fn parse_line(line: &str) -> (Option<&str>, &str) {
    match line.split_once('\t') {
        Some((label, text)) if !label.trim().is_empty() => (Some(label.trim()), text),
        Some((_, text)) => (None, text),
        None => (None, line),
    }
}

/// Build an index at `index_path` from the corpus file.
///
/// With `force`, an existing sealed index at the path is removed first. A
/// failed build removes the directory if this call created it.
pub fn build_from_corpus(
    corpus: &Path,
    index_path: &Path,
    analyzer: &dyn Analyzer,
    config: BuildConfig,
    force: bool,
    silent: bool,
) -> Result<BuildSummary> {
    if IndexDir::exists(index_path) {
        if !force {
            return Err(Error::build(format!(
                "an index already exists at {} (use --force to rebuild)",
                index_path.display()
            )));
        }
        dir::remove(index_path)?;
    }

    let fresh = !index_path.exists();
    let result = build_inner(corpus, index_path, analyzer, config, silent);
    if result.is_err() && fresh {
        if let Err(e) = dir::remove(index_path) {
            tracing::warn!("Could not clean up {}: {}", index_path.display(), e);
        }
    }
    result
}

fn build_inner(
    corpus: &Path,
    index_path: &Path,
    analyzer: &dyn Analyzer,
    config: BuildConfig,
    silent: bool,
) -> Result<BuildSummary> {
    let reader = BufReader::new(
        File::open(corpus)
            .map_err(|e| Error::build(format!("cannot open corpus {}: {e}", corpus.display())))?,
    );
    let mut builder = IndexBuilder::create(index_path, config)?;

    let spinner = if silent {
        None
    } else {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} documents {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message("analyzing...");
        Some(spinner)
    };

    tracing::info!("Indexing {} into {}", corpus.display(), index_path.display());

    let mut lines = reader.lines();
    let mut chunk: Vec<String> = Vec::with_capacity(CHUNK_LINES);
    loop {
        chunk.clear();
        for line in lines.by_ref().take(CHUNK_LINES) {
            chunk.push(line.map_err(|e| Error::build(format!("reading corpus: {e}")))?);
        }
        if chunk.is_empty() {
            break;
        }

        let documents: Vec<Document> = chunk
            .par_iter()
            .map(|line| {
                let (label, text) = parse_line(line);
                let doc = Document::new(analyzer.analyze(text));
                match label {
                    Some(label) => doc.with_label(label),
                    None => doc,
                }
            })
            .collect();

        for doc in documents {
            builder.add_document(doc)?;
        }
        if let Some(ref spinner) = spinner {
            spinner.inc(chunk.len() as u64);
        }
    }

    let summary = builder.finish()?;

    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!(
            "done: {} terms, {} runs",
            summary.stats.vocab_size, summary.runs
        ));
    }
    Ok(summary)
}
