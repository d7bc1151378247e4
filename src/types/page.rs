//! Fixed page geometry and node layout offsets.
//!
//! Every value here is derived at compile time from [`PAGE_SIZE`] and the
//! row schema, so the node accessors never compute offsets at runtime.

use core::ops::Range;

/// Size of every page, and therefore of every node, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Default upper bound on the number of pages a table may use.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Largest username, in bytes, excluding the terminator slot.
pub const COLUMN_USERNAME_MAX: usize = 32;
/// Largest email, in bytes, excluding the terminator slot.
pub const COLUMN_EMAIL_MAX: usize = 255;

/// Row field widths and offsets.
pub mod row {
    use super::{Range, COLUMN_EMAIL_MAX, COLUMN_USERNAME_MAX};

    /// Width of the key column.
    pub const ID_SIZE: usize = 4;
    /// Username column including its terminator.
    pub const USERNAME_SIZE: usize = COLUMN_USERNAME_MAX + 1;
    /// Email column including its terminator.
    pub const EMAIL_SIZE: usize = COLUMN_EMAIL_MAX + 1;

    /// Byte range of the id.
    pub const ID: Range<usize> = 0..ID_SIZE;
    /// Byte range of the username.
    pub const USERNAME: Range<usize> = ID.end..ID.end + USERNAME_SIZE;
    /// Byte range of the email.
    pub const EMAIL: Range<usize> = USERNAME.end..USERNAME.end + EMAIL_SIZE;

    /// Serialized row width.
    pub const ROW_SIZE: usize = EMAIL.end;
}

/// Header fields shared by leaf and internal nodes.
pub mod common {
    use super::Range;

    /// `0` internal, `1` leaf.
    pub const NODE_KIND: Range<usize> = 0..4;
    /// `1` on the root, `0` elsewhere.
    pub const IS_ROOT: Range<usize> = 4..8;
    /// Page number of the parent; unused on the root.
    pub const PARENT: Range<usize> = 8..12;

    /// Bytes before the kind-specific header.
    pub const HEADER_SIZE: usize = PARENT.end;
}

/// Leaf node layout.
pub mod leaf {
    use super::{common, row, Range, PAGE_SIZE};

    /// Number of occupied cells.
    pub const NUM_CELLS: Range<usize> = common::HEADER_SIZE..common::HEADER_SIZE + 4;
    /// Right sibling page, `0` on the last leaf.
    pub const NEXT_LEAF: Range<usize> = NUM_CELLS.end..NUM_CELLS.end + 4;
    /// Bytes before the first cell.
    pub const HEADER_SIZE: usize = NEXT_LEAF.end;

    /// Width of a cell key.
    pub const KEY_SIZE: usize = 4;
    /// Offset of the row within a cell.
    pub const VALUE_OFFSET: usize = KEY_SIZE;
    /// Key plus row.
    pub const CELL_SIZE: usize = KEY_SIZE + row::ROW_SIZE;
    /// Page bytes available to cells.
    pub const SPACE_FOR_CELLS: usize = PAGE_SIZE - HEADER_SIZE;
    /// Cells that fit in one leaf.
    pub const MAX_CELLS: usize = SPACE_FOR_CELLS / CELL_SIZE;

    /// Cells kept by the original leaf after a split.
    pub const LEFT_SPLIT_COUNT: usize = (MAX_CELLS + 1) - RIGHT_SPLIT_COUNT;
    /// Cells moved to the new leaf after a split.
    pub const RIGHT_SPLIT_COUNT: usize = (MAX_CELLS + 1) / 2;
}

/// Internal node layout.
pub mod internal {
    use super::{common, Range, PAGE_SIZE};

    /// Number of separator keys; children are one more.
    pub const NUM_KEYS: Range<usize> = common::HEADER_SIZE..common::HEADER_SIZE + 4;
    /// Child holding keys above the last separator.
    pub const RIGHT_CHILD: Range<usize> = NUM_KEYS.end..NUM_KEYS.end + 4;
    /// Bytes before the first cell.
    pub const HEADER_SIZE: usize = RIGHT_CHILD.end;

    /// Width of a child page number.
    pub const CHILD_SIZE: usize = 4;
    /// Width of a separator key.
    pub const KEY_SIZE: usize = 4;
    /// Child plus separator.
    pub const CELL_SIZE: usize = CHILD_SIZE + KEY_SIZE;
    /// Page bytes available to cells.
    pub const SPACE_FOR_CELLS: usize = PAGE_SIZE - HEADER_SIZE;
    /// Separators that fit in one internal node.
    pub const MAX_CELLS: usize = SPACE_FOR_CELLS / CELL_SIZE;
}
