//! Ranked retrieval.
//!
//! - [`scorer`] - The [`Ranker`] trait, [`ScoreData`] and config-driven construction
//! - [`language_model`] - Absolute discount, Jelinek-Mercer and Dirichlet smoothing
//! - [`frequency`] - Okapi BM25 and pivoted length normalization
//! - [`executor`] - Doc-at-a-time evaluation with bounded top-k selection

pub mod executor;
pub mod frequency;
pub mod language_model;
pub mod scorer;
pub mod topk;

pub use executor::{SearchOptions, Searcher};
pub use frequency::{OkapiBm25, PivotedLength};
pub use language_model::{AbsoluteDiscount, DirichletPrior, JelinekMercer};
pub use scorer::{Ranker, RankerConfig, ScoreData};
pub use topk::{SearchResult, TopKHeap};
