use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ranklab::analyzers::{Analyzer, FeatureMap, SENTENCE_END, SENTENCE_START};
use ranklab::config::{EngineConfig, CONFIG_FILE};
use ranklab::index::build::build_from_corpus;
use ranklab::index::dir::remove as remove_index;
use ranklab::index::stats::show_stats;
use ranklab::index::InvertedIndex;
use ranklab::query::Searcher;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ranklab")]
#[command(about = "Build text indexes and rank documents against them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a corpus file (one document per line, optional `label<TAB>` prefix)
    Index {
        /// Corpus file
        corpus: PathBuf,

        /// Index directory to create
        #[arg(short, long)]
        index: PathBuf,

        /// Engine config (JSON); saved into the index for later queries
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Replace an existing index
        #[arg(short, long)]
        force: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// Rank documents against a query
    Query {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Engine config (JSON); defaults to the one stored with the index
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = 10)]
        top: usize,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,

        /// Query text
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Show index statistics
    Stats {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,
    },
    /// Remove an index
    Remove {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ranklab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            corpus,
            index,
            config,
            force,
            quiet,
        } => run_index(&corpus, &index, config.as_deref(), force, quiet)?,
        Commands::Query {
            index,
            config,
            top,
            json,
            query,
        } => run_query(&index, config.as_deref(), top, json, &query.join(" "))?,
        Commands::Stats { index } => {
            show_stats(&index)
                .with_context(|| format!("Failed to read index at {}", index.display()))?;
        }
        Commands::Remove { index } => {
            remove_index(&index)
                .with_context(|| format!("Failed to remove {}", index.display()))?;
            println!("Removed index: {}", index.display());
        }
    }

    Ok(())
}

fn run_index(
    corpus: &Path,
    index_path: &Path,
    config_path: Option<&Path>,
    force: bool,
    quiet: bool,
) -> Result<()> {
    let config = EngineConfig::load_or_default(config_path, None).context("Failed to load config")?;
    let analyzer = config.analyzer()?;

    let summary = build_from_corpus(
        corpus,
        index_path,
        &analyzer,
        config.build,
        force,
        quiet,
    )
    .with_context(|| format!("Failed to index {}", corpus.display()))?;

    config
        .save(&index_path.join(CONFIG_FILE))
        .context("Failed to store config with the index")?;

    println!(
        "Indexed {} documents ({} terms, {} distinct) into {}",
        summary.stats.num_docs,
        summary.stats.total_terms,
        summary.stats.vocab_size,
        index_path.display()
    );
    Ok(())
}

fn run_query(
    index_path: &Path,
    config_path: Option<&Path>,
    top: usize,
    json: bool,
    text: &str,
) -> Result<()> {
    let config = EngineConfig::load_or_default(config_path, Some(index_path))
        .context("Failed to load config")?;
    let ranker = config.ranker()?;
    let analyzer = config.analyzer()?;

    let index = InvertedIndex::open_with_policy(index_path, &config.cache)
        .with_context(|| format!("Failed to open index at {}", index_path.display()))?;

    // Bare sentence markers occur in every document
    let query: FeatureMap = analyzer
        .analyze(text)
        .iter()
        .filter(|(term, _)| *term != SENTENCE_START && *term != SENTENCE_END)
        .collect();
    let searcher = Searcher::new(&index, ranker.as_ref()).with_options(config.search);
    let results = searcher.search_features(&query, top)?;

    if results.is_empty() && !json {
        println!("No matching documents.");
        return Ok(());
    }

    for (rank, hit) in results.iter().enumerate() {
        let label = index.label(hit.doc_id);
        if json {
            let line = serde_json::json!({
                "rank": rank + 1,
                "doc_id": hit.doc_id,
                "score": hit.score,
                "label": label,
            });
            println!("{line}");
        } else {
            println!(
                "{:>4}. doc {:<8} {:>12.6}  {}",
                rank + 1,
                hit.doc_id,
                hit.score,
                label.unwrap_or("")
            );
        }
    }
    Ok(())
}
