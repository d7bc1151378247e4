#![forbid(unsafe_code)]

//! Shared identifiers and the crate-wide error type.

use std::fmt;

pub mod page;

/// Zero-based page number inside the table file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct PageId(pub u32);

impl PageId {
    /// The page that always holds the tree root.
    pub const ROOT: PageId = PageId(0);

    /// Byte offset of this page within the backing file.
    pub fn offset(self) -> u64 {
        u64::from(self.0) * page::PAGE_SIZE as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PageId {
    fn from(value: u32) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u32 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

/// Errors raised by the storage engine.
#[derive(thiserror::Error, Debug)]
pub enum PageboyError {
    /// Underlying file operation failed.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// On-disk bytes do not describe a valid node or row.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// The file length is not a whole number of pages.
    #[error("corrupt file: length {len} is not a multiple of the page size")]
    CorruptFileLength {
        /// Observed file length in bytes.
        len: u64,
    },
    /// A page number at or beyond the configured page limit was requested.
    #[error("page {page} out of bounds (max pages {max_pages})")]
    PageOutOfBounds {
        /// Requested page.
        page: PageId,
        /// Configured page limit.
        max_pages: u32,
    },
    /// A flush targeted a page that was never loaded into the cache.
    #[error("page {0} is not loaded")]
    PageNotLoaded(PageId),
    /// Caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Insert of a key that is already present.
    #[error("duplicate key {0}")]
    DuplicateKey(u32),
    /// Insert would need more pages than the table may hold.
    #[error("table full (max pages {max_pages})")]
    TableFull {
        /// Configured page limit.
        max_pages: u32,
    },
}

impl PageboyError {
    /// True for errors that leave the table untouched and usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PageboyError::DuplicateKey(_) | PageboyError::TableFull { .. }
        )
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, PageboyError>;
