//! Engine configuration.
//!
//! One JSON document selects the ranker, the cache policy, build and
//! analysis settings. Every field has a default, so `{}` is a valid config.

use crate::analyzers::{FilterChain, NgramWordAnalyzer};
use crate::cache::CachePolicy;
use crate::error::{Error, Result};
use crate::index::types::BuildConfig;
use crate::query::executor::SearchOptions;
use crate::query::scorer::{Ranker, RankerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file name looked up next to an index
pub const CONFIG_FILE: &str = "ranklab.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ranker: RankerConfig,
    pub cache: CachePolicy,
    pub build: BuildConfig,
    pub analyzer: AnalyzerConfig,
    pub search: SearchOptions,
}

/// Tokenization and n-gram settings applied to both documents and queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_ngram")]
    pub ngram: usize,

    /// Replacement stopword list; `None` keeps the built-in English list
    #[serde(default)]
    pub stopwords: Option<Vec<String>>,

    #[serde(default = "default_sentence_boundaries")]
    pub sentence_boundaries: bool,
}

fn default_ngram() -> usize {
    1
}

fn default_sentence_boundaries() -> bool {
    true
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ngram: default_ngram(),
            stopwords: None,
            sentence_boundaries: default_sentence_boundaries(),
        }
    }
}

impl AnalyzerConfig {
    pub fn build(&self) -> Result<NgramWordAnalyzer> {
        let mut chain =
            FilterChain::default_chain().with_sentence_boundaries(self.sentence_boundaries);
        if let Some(words) = &self.stopwords {
            chain = chain.with_stopwords(words.iter().cloned());
        }
        NgramWordAnalyzer::new(self.ngram, chain)
    }
}

impl EngineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else `<index>/ranklab.json` if present, else defaults
    pub fn load_or_default(path: Option<&Path>, index_dir: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match index_dir.map(|dir| dir.join(CONFIG_FILE)) {
            Some(candidate) if candidate.is_file() => Self::load(&candidate),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check every section without building anything expensive
    pub fn validate(&self) -> Result<()> {
        self.ranker.build()?;
        self.cache.validate()?;
        if self.build.max_buffer_bytes == 0 {
            return Err(Error::config(
                "build.max_buffer_bytes",
                "buffer size must be greater than zero",
            ));
        }
        if self.analyzer.ngram == 0 {
            return Err(Error::config("analyzer.ngram", "n-gram size must be at least 1"));
        }
        Ok(())
    }

    pub fn ranker(&self) -> Result<Box<dyn Ranker>> {
        self.ranker.build()
    }

    pub fn analyzer(&self) -> Result<NgramWordAnalyzer> {
        self.analyzer.build()
    }
}
