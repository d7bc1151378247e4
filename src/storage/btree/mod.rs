#![forbid(unsafe_code)]

//! Single-file B+ tree over fixed-size pages.

mod cursor;
/// Diagnostics: rendering, height and integrity checks.
pub mod inspect;
/// Node byte layout accessors.
pub mod node;
mod stats;
mod tree;

pub use cursor::{Cursor, Scan};
pub use inspect::TreeSummary;
pub use stats::BTreeStats;
pub use tree::{BTree, Position};

#[cfg(test)]
mod tests;
