//! Byte-level views over a page holding one B+ tree node.
//!
//! A page is interpreted either as a leaf (sorted key/row cells plus a
//! sibling pointer) or as an internal node (sorted child/separator cells plus
//! a rightmost child). Both share the common header: node kind, root flag and
//! parent page number. Read views validate the header when they are built, so
//! the per-cell accessors can index without further checks.

use std::ops::Range;

use crate::primitives::pager::PageBuf;
use crate::types::{
    page::{common, internal, leaf},
    PageId, PageboyError, Result,
};

/// Logical kind of a node page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Routing-only node of child pointers and separator keys.
    Internal = 0,
    /// Data-bearing node of key/row cells.
    Leaf = 1,
}

impl NodeKind {
    /// Converts an on-disk tag into a node kind.
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Internal),
            1 => Ok(Self::Leaf),
            _ => Err(PageboyError::Corruption("unknown node kind")),
        }
    }
}

/// Reads a little-endian `u32` field.
#[inline]
fn read_u32(page: &[u8], range: Range<usize>) -> u32 {
    let bytes: [u8; 4] = page[range].try_into().unwrap_or([0; 4]);
    u32::from_le_bytes(bytes)
}

#[inline]
fn write_u32(page: &mut [u8], range: Range<usize>, value: u32) {
    page[range].copy_from_slice(&value.to_le_bytes());
}

/// Returns the kind recorded in the common header.
pub fn node_kind(page: &PageBuf) -> Result<NodeKind> {
    NodeKind::from_u32(read_u32(page, common::NODE_KIND))
}

/// Writes the node kind.
pub fn set_node_kind(page: &mut PageBuf, kind: NodeKind) {
    write_u32(page, common::NODE_KIND, kind as u32);
}

/// Returns whether the page is flagged as the tree root.
pub fn is_root(page: &PageBuf) -> Result<bool> {
    match read_u32(page, common::IS_ROOT) {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(PageboyError::Corruption("root flag is neither 0 nor 1")),
    }
}

/// Sets or clears the root flag.
pub fn set_root(page: &mut PageBuf, root: bool) {
    write_u32(page, common::IS_ROOT, u32::from(root));
}

/// Returns the parent page number. Meaningless on the root.
pub fn parent(page: &PageBuf) -> PageId {
    PageId(read_u32(page, common::PARENT))
}

/// Sets the parent page number.
pub fn set_parent(page: &mut PageBuf, parent: PageId) {
    write_u32(page, common::PARENT, parent.0);
}

fn leaf_cell_range(idx: usize) -> Range<usize> {
    let start = leaf::HEADER_SIZE + idx * leaf::CELL_SIZE;
    start..start + leaf::CELL_SIZE
}

fn internal_cell_range(idx: usize) -> Range<usize> {
    let start = internal::HEADER_SIZE + idx * internal::CELL_SIZE;
    start..start + internal::CELL_SIZE
}

/// Validated read view of a leaf node.
#[derive(Clone, Copy)]
pub struct LeafNode<'a> {
    page: &'a PageBuf,
    num_cells: usize,
}

impl<'a> LeafNode<'a> {
    /// Interprets `page` as a leaf, checking its kind and cell count.
    pub fn parse(page: &'a PageBuf) -> Result<Self> {
        if node_kind(page)? != NodeKind::Leaf {
            return Err(PageboyError::Corruption("expected leaf node"));
        }
        let num_cells = read_u32(page, leaf::NUM_CELLS) as usize;
        if num_cells > leaf::MAX_CELLS {
            return Err(PageboyError::Corruption("leaf cell count exceeds capacity"));
        }
        Ok(Self { page, num_cells })
    }

    /// Number of occupied cells.
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// True when no further cell fits without a split.
    pub fn is_full(&self) -> bool {
        self.num_cells >= leaf::MAX_CELLS
    }

    /// Next leaf in key order, if any.
    pub fn next_leaf(&self) -> Option<PageId> {
        match read_u32(self.page, leaf::NEXT_LEAF) {
            0 => None,
            page => Some(PageId(page)),
        }
    }

    /// Raw bytes of cell `idx` (key followed by row).
    pub fn cell(&self, idx: usize) -> &'a [u8] {
        debug_assert!(idx < leaf::MAX_CELLS);
        &self.page[leaf_cell_range(idx)]
    }

    /// Key stored in cell `idx`.
    pub fn key(&self, idx: usize) -> u32 {
        let start = leaf_cell_range(idx).start;
        read_u32(self.page, start..start + leaf::KEY_SIZE)
    }

    /// Serialized row stored in cell `idx`.
    pub fn value(&self, idx: usize) -> &'a [u8] {
        &self.cell(idx)[leaf::VALUE_OFFSET..]
    }

    /// Key of the last cell.
    pub fn max_key(&self) -> Option<u32> {
        self.num_cells.checked_sub(1).map(|last| self.key(last))
    }

    /// Binary search for the first cell whose key is `>= key`.
    ///
    /// An exact match returns that cell's index; otherwise the returned index
    /// is where `key` would be inserted.
    pub fn find(&self, key: u32) -> usize {
        let mut lo = 0usize;
        let mut hi = self.num_cells;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let mid_key = self.key(mid);
            if mid_key == key {
                return mid;
            }
            if key < mid_key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

/// Mutable view of a leaf node.
pub struct LeafNodeMut<'a> {
    page: &'a mut PageBuf,
}

impl<'a> LeafNodeMut<'a> {
    /// Wraps a page already known to hold a leaf.
    pub fn new(page: &'a mut PageBuf) -> Self {
        Self { page }
    }

    /// Re-initialises `page` as an empty, non-root leaf without a sibling.
    pub fn init(page: &'a mut PageBuf) -> Self {
        set_node_kind(page, NodeKind::Leaf);
        set_root(page, false);
        write_u32(page, leaf::NUM_CELLS, 0);
        write_u32(page, leaf::NEXT_LEAF, 0);
        Self { page }
    }

    /// Sets the cell count.
    pub fn set_num_cells(&mut self, count: usize) {
        debug_assert!(count <= leaf::MAX_CELLS);
        write_u32(self.page, leaf::NUM_CELLS, count as u32);
    }

    /// Sets the next-leaf pointer; `None` is stored as page 0.
    pub fn set_next_leaf(&mut self, next: Option<PageId>) {
        write_u32(self.page, leaf::NEXT_LEAF, next.map_or(0, |p| p.0));
    }

    /// Mutable bytes of cell `idx`.
    pub fn cell_mut(&mut self, idx: usize) -> &mut [u8] {
        &mut self.page[leaf_cell_range(idx)]
    }

    /// Overwrites the key of cell `idx`.
    pub fn set_key(&mut self, idx: usize, key: u32) {
        let start = leaf_cell_range(idx).start;
        write_u32(self.page, start..start + leaf::KEY_SIZE, key);
    }

    /// Mutable serialized row of cell `idx`.
    pub fn value_mut(&mut self, idx: usize) -> &mut [u8] {
        &mut self.cell_mut(idx)[leaf::VALUE_OFFSET..]
    }

    /// Consumes the view, returning the row bytes of cell `idx` for the
    /// lifetime of the page borrow.
    pub fn into_value_mut(self, idx: usize) -> &'a mut [u8] {
        let range = leaf_cell_range(idx);
        &mut self.page[range.start + leaf::VALUE_OFFSET..range.end]
    }

    /// Moves cells `[from, count)` one slot to the right.
    pub fn shift_right(&mut self, from: usize, count: usize) {
        debug_assert!(count < leaf::MAX_CELLS);
        if from >= count {
            return;
        }
        let src = leaf_cell_range(from).start..leaf_cell_range(count - 1).end;
        let dst = leaf_cell_range(from + 1).start;
        self.page.copy_within(src, dst);
    }
}

/// Validated read view of an internal node.
#[derive(Clone, Copy)]
pub struct InternalNode<'a> {
    page: &'a PageBuf,
    num_keys: usize,
}

impl<'a> InternalNode<'a> {
    /// Interprets `page` as an internal node, checking its kind and key count.
    pub fn parse(page: &'a PageBuf) -> Result<Self> {
        if node_kind(page)? != NodeKind::Internal {
            return Err(PageboyError::Corruption("expected internal node"));
        }
        let num_keys = read_u32(page, internal::NUM_KEYS) as usize;
        if num_keys > internal::MAX_CELLS {
            return Err(PageboyError::Corruption(
                "internal key count exceeds capacity",
            ));
        }
        Ok(Self { page, num_keys })
    }

    /// Number of separator keys; the node has one more child than this.
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    /// Child that holds keys greater than every separator.
    pub fn right_child(&self) -> PageId {
        PageId(read_u32(self.page, internal::RIGHT_CHILD))
    }

    /// Child `idx`, where `idx == num_keys` names the rightmost child.
    pub fn child(&self, idx: usize) -> Result<PageId> {
        if idx > self.num_keys {
            return Err(PageboyError::Corruption(
                "internal child index beyond key count",
            ));
        }
        if idx == self.num_keys {
            return Ok(self.right_child());
        }
        let start = internal_cell_range(idx).start;
        Ok(PageId(read_u32(self.page, start..start + internal::CHILD_SIZE)))
    }

    /// Separator key `idx`, the maximum key reachable through child `idx`.
    pub fn key(&self, idx: usize) -> u32 {
        let start = internal_cell_range(idx).start + internal::CHILD_SIZE;
        read_u32(self.page, start..start + internal::KEY_SIZE)
    }

    /// All children in key order, the rightmost last.
    pub fn children(&self) -> Result<Vec<PageId>> {
        (0..=self.num_keys).map(|idx| self.child(idx)).collect()
    }

    /// Index of the child whose subtree should contain `key`.
    ///
    /// Binary search for the first separator `>= key`; keys above every
    /// separator route to the rightmost child (`num_keys`).
    pub fn find_child(&self, key: u32) -> usize {
        let mut lo = 0usize;
        let mut hi = self.num_keys;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.key(mid) >= key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// Position of `child` among this node's children.
    pub fn index_of_child(&self, child: PageId) -> Result<Option<usize>> {
        for idx in 0..=self.num_keys {
            if self.child(idx)? == child {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }
}

/// Mutable view of an internal node.
pub struct InternalNodeMut<'a> {
    page: &'a mut PageBuf,
}

impl<'a> InternalNodeMut<'a> {
    /// Wraps a page already known to hold an internal node.
    pub fn new(page: &'a mut PageBuf) -> Self {
        Self { page }
    }

    /// Re-initialises `page` as an empty, non-root internal node.
    pub fn init(page: &'a mut PageBuf) -> Self {
        set_node_kind(page, NodeKind::Internal);
        set_root(page, false);
        write_u32(page, internal::NUM_KEYS, 0);
        write_u32(page, internal::RIGHT_CHILD, 0);
        Self { page }
    }

    /// Sets the separator count.
    pub fn set_num_keys(&mut self, count: usize) {
        debug_assert!(count <= internal::MAX_CELLS);
        write_u32(self.page, internal::NUM_KEYS, count as u32);
    }

    /// Sets the rightmost child pointer.
    pub fn set_right_child(&mut self, child: PageId) {
        write_u32(self.page, internal::RIGHT_CHILD, child.0);
    }

    /// Sets the child pointer of cell `idx`.
    pub fn set_child(&mut self, idx: usize, child: PageId) {
        let start = internal_cell_range(idx).start;
        write_u32(self.page, start..start + internal::CHILD_SIZE, child.0);
    }

    /// Sets the separator key of cell `idx`.
    pub fn set_key(&mut self, idx: usize, key: u32) {
        let start = internal_cell_range(idx).start + internal::CHILD_SIZE;
        write_u32(self.page, start..start + internal::KEY_SIZE, key);
    }

    /// Moves cells `[from, count)` one slot to the right.
    pub fn shift_right(&mut self, from: usize, count: usize) {
        debug_assert!(count < internal::MAX_CELLS);
        if from >= count {
            return;
        }
        let src = internal_cell_range(from).start..internal_cell_range(count - 1).end;
        let dst = internal_cell_range(from + 1).start;
        self.page.copy_within(src, dst);
    }

    /// Rewrites the node from `(child, separator)` pairs plus a rightmost child.
    pub fn write_entries(&mut self, entries: &[(PageId, u32)], right_child: PageId) {
        for (idx, (child, key)) in entries.iter().enumerate() {
            self.set_child(idx, *child);
            self.set_key(idx, *key);
        }
        self.set_num_keys(entries.len());
        self.set_right_child(right_child);
    }
}
