//! On-disk index storage.
//!
//! A build writes one directory holding both the inverted index
//! (term → postings) and the forward index (doc → term vector). The
//! directory is sealed by writing `meta.json` last; readers refuse
//! anything unsealed.

pub mod build;
pub mod dir;
pub mod forward;
pub mod inverted;
pub(crate) mod reader;
pub mod stats;
pub mod types;
pub mod writer;

pub use dir::IndexDir;
pub use forward::{DatasetView, ForwardIndex, Instance};
pub use inverted::InvertedIndex;
pub use types::*;
pub use writer::{BuildSummary, IndexBuilder};
