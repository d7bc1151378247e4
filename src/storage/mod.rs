//! Table storage: the fixed row schema and the B+ tree that holds it.

/// B+ tree over fixed-size pages.
///
/// Node layout, search, insertion with splits, cursors and diagnostics.
pub mod btree;

/// Fixed-width row value and its in-page encoding.
pub mod row;

/// Table handle tying a pager and a tree to one file.
pub mod table;

pub use row::{deserialize_row, serialize_row, Row, ROW_SIZE};
pub use table::{Table, TableOptions};
