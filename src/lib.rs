//! Pageboy: a single-file table store on a disk-backed B+ tree.
//!
//! Rows of a fixed schema (`id`, `username`, `email`) live in 4 KiB pages,
//! one tree node per page, cached in memory and written back on close.

#![warn(missing_docs)]

pub mod cli;
pub mod logging;
pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{Row, Table, TableOptions};
pub use types::{PageId, PageboyError, Result};
