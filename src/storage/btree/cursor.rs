use super::node::{node_kind, InternalNode, LeafNode, LeafNodeMut, NodeKind};
use super::tree::{BTree, Position};
use crate::storage::row::{deserialize_row, Row};
use crate::types::{PageId, PageboyError, Result};

/// A position in the leaf level of a [`BTree`].
///
/// Cursors are created per operation and hold the tree mutably, so only one
/// can exist at a time.
pub struct Cursor<'t> {
    tree: &'t mut BTree,
    page: PageId,
    cell: usize,
    end: bool,
}

impl<'t> Cursor<'t> {
    /// Positions at the first cell of the leftmost leaf.
    pub fn start(tree: &'t mut BTree) -> Result<Self> {
        let pos = tree.find(0)?;
        let num_cells = LeafNode::parse(tree.existing_page(pos.page)?)?.num_cells();
        Ok(Self {
            tree,
            page: pos.page,
            cell: pos.cell,
            end: num_cells == 0,
        })
    }

    /// Positions one past the last cell of the rightmost leaf.
    pub fn end_of_table(tree: &'t mut BTree) -> Result<Self> {
        let mut page_id = tree.root();
        for _ in 0..=tree.pager().num_pages() {
            let page = tree.existing_page(page_id)?;
            match node_kind(page)? {
                NodeKind::Leaf => {
                    let cell = LeafNode::parse(page)?.num_cells();
                    return Ok(Self {
                        tree,
                        page: page_id,
                        cell,
                        end: true,
                    });
                }
                NodeKind::Internal => page_id = InternalNode::parse(page)?.right_child(),
            }
        }
        Err(PageboyError::Corruption("tree contains a cycle"))
    }

    /// Positions at the cell holding `key`, or where it would be inserted.
    pub fn find(tree: &'t mut BTree, key: u32) -> Result<Self> {
        let pos = tree.find(key)?;
        let num_cells = LeafNode::parse(tree.existing_page(pos.page)?)?.num_cells();
        Ok(Self {
            tree,
            page: pos.page,
            cell: pos.cell,
            end: pos.cell >= num_cells,
        })
    }

    /// Current leaf page and cell index.
    pub fn position(&self) -> Position {
        Position {
            page: self.page,
            cell: self.cell,
        }
    }

    /// True once the cursor has moved past the last row.
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// Key of the current cell.
    pub fn key(&mut self) -> Result<u32> {
        let cell = self.current_cell()?;
        Ok(LeafNode::parse(self.tree.existing_page(self.page)?)?.key(cell))
    }

    /// Serialized row bytes of the current cell.
    pub fn value(&mut self) -> Result<&[u8]> {
        let cell = self.current_cell()?;
        Ok(LeafNode::parse(self.tree.existing_page(self.page)?)?.value(cell))
    }

    /// Mutable row bytes of the current cell; the leaf is marked dirty.
    pub fn value_mut(&mut self) -> Result<&mut [u8]> {
        let cell = self.current_cell()?;
        let page = self.tree.pager.page_mut(self.page)?;
        Ok(LeafNodeMut::new(page).into_value_mut(cell))
    }

    /// Decodes the row under the cursor.
    pub fn row(&mut self) -> Result<Row> {
        deserialize_row(self.value()?)
    }

    fn current_cell(&mut self) -> Result<usize> {
        let num_cells = LeafNode::parse(self.tree.existing_page(self.page)?)?.num_cells();
        if self.end || self.cell >= num_cells {
            return Err(PageboyError::Invalid("cursor is not positioned on a cell"));
        }
        Ok(self.cell)
    }

    /// Moves to the next cell, following the sibling chain across leaves.
    pub fn advance(&mut self) -> Result<()> {
        if self.end {
            return Ok(());
        }
        self.cell += 1;
        for _ in 0..=self.tree.pager().num_pages() {
            let leaf = LeafNode::parse(self.tree.existing_page(self.page)?)?;
            if self.cell < leaf.num_cells() {
                return Ok(());
            }
            match leaf.next_leaf() {
                Some(next) => {
                    self.page = next;
                    self.cell = 0;
                }
                None => {
                    self.end = true;
                    return Ok(());
                }
            }
        }
        Err(PageboyError::Corruption("leaf sibling chain contains a cycle"))
    }
}

/// Ordered, single-pass iterator over every row in the tree.
///
/// Stops after yielding the first error.
pub struct Scan<'t> {
    cursor: Cursor<'t>,
    failed: bool,
}

impl<'t> Scan<'t> {
    /// Starts a scan at the smallest key.
    pub fn new(tree: &'t mut BTree) -> Result<Self> {
        Ok(Self {
            cursor: Cursor::start(tree)?,
            failed: false,
        })
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_end() {
            return None;
        }
        let step = self
            .cursor
            .row()
            .and_then(|row| self.cursor.advance().map(|()| row));
        if step.is_err() {
            self.failed = true;
        }
        Some(step)
    }
}
