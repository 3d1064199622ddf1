#![warn(rust_2018_idioms)]

pub mod error;
/// Range expansion of lookup trees for query-time matching.
pub mod flatten;
pub mod font;
pub mod grid;
/// Decoded GSUB layout structures.
pub mod layout;
pub mod merge;
pub mod processor;
pub mod tag;
pub mod tree;
pub mod walk;
