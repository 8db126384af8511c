//! Error types for ranklab.
//!
//! Lookups that miss (unknown term, out-of-range document) are not errors:
//! they are reported as `None` by the index APIs and folded into scoring
//! through the background model.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for index building, loading and ranking.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is missing or outside its valid range
    #[error("Invalid configuration for '{key}': {message}")]
    Config { key: String, message: String },

    /// On-disk index structures failed a consistency check
    #[error("Index at {path} is corrupt: {message}")]
    IndexCorrupt { path: PathBuf, message: String },

    /// The build could not complete; the target directory is not a valid index
    #[error("Index build aborted: {message}")]
    BuildAborted { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Error::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn corrupt<M: Into<String>>(path: &Path, message: M) -> Self {
        Error::IndexCorrupt {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn build<M: Into<String>>(message: M) -> Self {
        Error::BuildAborted {
            message: message.into(),
        }
    }

    /// Wrap any error raised while building so callers see a single failure kind
    pub(crate) fn into_build_abort(self) -> Self {
        match self {
            Error::BuildAborted { .. } => self,
            other => Error::build(other.to_string()),
        }
    }
}

/// Result type alias for ranklab operations.
pub type Result<T> = std::result::Result<T, Error>;
