//! Shared helpers.
//!
//! - [`encoding`] - Varint and little-endian codecs for the on-disk files
//! - [`progress`] - Progress bars, no-ops when the `progress` feature is off

pub mod encoding;
pub mod progress;

pub use encoding::*;
