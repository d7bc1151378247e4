//! Low-level primitives for building the storage engine.
//!
//! Positioned file I/O and the page cache that sits on top of it.

/// I/O abstractions and utilities.
///
/// Interfaces for reading/writing data and file operations.
pub mod io;

/// Paging subsystem.
///
/// Maps page numbers to cached buffers backed by the table file.
pub mod pager;
