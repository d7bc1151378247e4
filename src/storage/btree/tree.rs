use std::cmp::Ordering;

use tracing::{debug, warn};

use super::node::{
    is_root, node_kind, parent, set_parent, set_root, InternalNode, InternalNodeMut, LeafNode,
    LeafNodeMut, NodeKind,
};
use super::stats::BTreeStats;
use crate::primitives::pager::{PageBuf, Pager};
use crate::storage::row::{serialize_row, Row};
use crate::types::{
    page::{internal, leaf},
    PageId, PageboyError, Result,
};

/// Location of a cell inside a leaf.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    /// Leaf page holding the cell.
    pub page: PageId,
    /// Cell index within the leaf; may equal the cell count.
    pub cell: usize,
}

/// Single-file B+ tree keyed by `u32`, one node per page.
///
/// The root always lives on page 0. When the root splits, its contents move
/// to a freshly allocated page and page 0 is rebuilt as an internal node, so
/// the root page number never changes.
pub struct BTree {
    pub(super) pager: Pager,
    root: PageId,
    internal_max_cells: usize,
    stats: BTreeStats,
}

impl BTree {
    /// Wraps `pager`, initialising page 0 as an empty root leaf when the
    /// file is empty.
    pub fn open(mut pager: Pager, internal_max_cells: usize) -> Result<Self> {
        if !(2..=internal::MAX_CELLS).contains(&internal_max_cells) {
            return Err(PageboyError::Invalid(
                "internal_max_cells must be between 2 and the page capacity",
            ));
        }
        let root = PageId::ROOT;
        if pager.num_pages() == 0 {
            let page = pager.page_mut(root)?;
            LeafNodeMut::init(page);
            set_root(page, true);
            debug!(page = %root, "btree.init_root");
        } else if !is_root(pager.page(root)?)? {
            return Err(PageboyError::Corruption("page 0 is not marked as root"));
        }
        Ok(Self {
            pager,
            root,
            internal_max_cells,
            stats: BTreeStats::default(),
        })
    }

    /// Page number of the root node.
    pub fn root(&self) -> PageId {
        self.root
    }

    /// Effective separator limit for internal nodes.
    pub fn internal_max_cells(&self) -> usize {
        self.internal_max_cells
    }

    /// Operation counters.
    pub fn stats(&self) -> BTreeStats {
        self.stats
    }

    /// Backing pager.
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Gives the pager back, typically to close it.
    pub fn into_pager(self) -> Pager {
        self.pager
    }

    /// Read access to a page that must already exist.
    pub(super) fn existing_page(&mut self, id: PageId) -> Result<&PageBuf> {
        if id.0 >= self.pager.num_pages() {
            return Err(PageboyError::Corruption("node references an unallocated page"));
        }
        self.pager.page(id)
    }

    /// Descends from the root to the leaf that holds, or would hold, `key`.
    pub fn find(&mut self, key: u32) -> Result<Position> {
        self.stats.searches += 1;
        let mut page_id = self.root;
        for _ in 0..=self.pager.num_pages() {
            let page = self.existing_page(page_id)?;
            match node_kind(page)? {
                NodeKind::Leaf => {
                    let leaf = LeafNode::parse(page)?;
                    return Ok(Position {
                        page: page_id,
                        cell: leaf.find(key),
                    });
                }
                NodeKind::Internal => {
                    let node = InternalNode::parse(page)?;
                    page_id = node.child(node.find_child(key))?;
                }
            }
        }
        Err(PageboyError::Corruption("tree contains a cycle"))
    }

    /// Maximum key stored under `id`: a leaf's last key, or recursively the
    /// maximum of an internal node's rightmost child.
    pub fn node_max_key(&mut self, id: PageId) -> Result<u32> {
        let mut page_id = id;
        for _ in 0..=self.pager.num_pages() {
            let page = self.existing_page(page_id)?;
            match node_kind(page)? {
                NodeKind::Leaf => {
                    return LeafNode::parse(page)?
                        .max_key()
                        .ok_or(PageboyError::Corruption("empty leaf below the root"));
                }
                NodeKind::Internal => page_id = InternalNode::parse(page)?.right_child(),
            }
        }
        Err(PageboyError::Corruption("tree contains a cycle"))
    }

    /// Inserts `row` under its id.
    ///
    /// Fails with [`PageboyError::DuplicateKey`] or [`PageboyError::TableFull`]
    /// without modifying any page.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        let key = row.id();
        let pos = self.find(key)?;
        let full = {
            let leaf = LeafNode::parse(self.pager.page(pos.page)?)?;
            if pos.cell < leaf.num_cells() && leaf.key(pos.cell) == key {
                warn!(key, "btree.insert.duplicate");
                return Err(PageboyError::DuplicateKey(key));
            }
            leaf.is_full()
        };
        if full {
            let needed = self.pages_needed_for_split(pos.page)?;
            if needed > self.pager.remaining_pages() {
                warn!(
                    key,
                    needed,
                    remaining = self.pager.remaining_pages(),
                    "btree.insert.table_full"
                );
                return Err(PageboyError::TableFull {
                    max_pages: self.pager.max_pages(),
                });
            }
            self.leaf_split_and_insert(pos, key, row)?;
        } else {
            self.leaf_insert(pos, key, row)?;
        }
        self.stats.inserts += 1;
        Ok(())
    }

    /// Pages a split of the full leaf `leaf_id` would allocate: the new leaf,
    /// one per full ancestor that splits in turn, and one more if the cascade
    /// reaches the root.
    fn pages_needed_for_split(&mut self, leaf_id: PageId) -> Result<u32> {
        let mut needed = 1;
        let mut node_id = leaf_id;
        for _ in 0..=self.pager.num_pages() {
            let page = self.existing_page(node_id)?;
            if is_root(page)? {
                return Ok(needed + 1);
            }
            let parent_id = parent(page);
            let parent_keys = InternalNode::parse(self.existing_page(parent_id)?)?.num_keys();
            if parent_keys < self.internal_max_cells {
                return Ok(needed);
            }
            needed += 1;
            node_id = parent_id;
        }
        Err(PageboyError::Corruption("tree contains a cycle"))
    }

    /// Inserts into a leaf with spare capacity, shifting later cells right.
    fn leaf_insert(&mut self, pos: Position, key: u32, row: &Row) -> Result<()> {
        let page = self.pager.page_mut(pos.page)?;
        let num_cells = LeafNode::parse(page)?.num_cells();
        let mut leaf = LeafNodeMut::new(page);
        leaf.shift_right(pos.cell, num_cells);
        leaf.set_key(pos.cell, key);
        serialize_row(row, leaf.value_mut(pos.cell))?;
        leaf.set_num_cells(num_cells + 1);
        Ok(())
    }

    /// Splits the full leaf at `pos.page` and inserts `row` into the half
    /// where it belongs.
    fn leaf_split_and_insert(&mut self, pos: Position, key: u32, row: &Row) -> Result<()> {
        let old_id = pos.page;
        let snapshot: Box<PageBuf> = Box::new(*self.pager.page(old_id)?);
        let old = LeafNode::parse(&snapshot)?;
        let was_root = is_root(&snapshot)?;
        let parent_id = parent(&snapshot);

        let mut new_cell = [0u8; leaf::CELL_SIZE];
        new_cell[..leaf::KEY_SIZE].copy_from_slice(&key.to_le_bytes());
        serialize_row(row, &mut new_cell[leaf::VALUE_OFFSET..])?;
        let merged = |idx: usize| merged_cell(&old, &new_cell, pos.cell, idx);
        let left_max = {
            let last = merged(leaf::LEFT_SPLIT_COUNT - 1);
            u32::from_le_bytes([last[0], last[1], last[2], last[3]])
        };

        let new_id = self.pager.get_unused_page_number();
        {
            let page = self.pager.page_mut(new_id)?;
            set_parent(page, parent_id);
            let mut right = LeafNodeMut::init(page);
            right.set_next_leaf(old.next_leaf());
            for idx in (leaf::LEFT_SPLIT_COUNT..=leaf::MAX_CELLS).rev() {
                right
                    .cell_mut(idx - leaf::LEFT_SPLIT_COUNT)
                    .copy_from_slice(merged(idx));
            }
            right.set_num_cells(leaf::RIGHT_SPLIT_COUNT);
        }
        {
            let mut left = LeafNodeMut::new(self.pager.page_mut(old_id)?);
            for idx in (0..leaf::LEFT_SPLIT_COUNT).rev() {
                left.cell_mut(idx).copy_from_slice(merged(idx));
            }
            left.set_num_cells(leaf::LEFT_SPLIT_COUNT);
            left.set_next_leaf(Some(new_id));
        }
        self.stats.leaf_splits += 1;
        debug!(old = %old_id, new = %new_id, key, left_max, "btree.leaf_split");

        if was_root {
            self.promote_root(new_id)
        } else {
            self.update_separator(parent_id, old_id, left_max)?;
            self.internal_insert(parent_id, new_id)
        }
    }

    /// Rewrites the separator that `parent_id` keeps for `child`.
    ///
    /// The rightmost child carries no separator, so updating it is a no-op.
    fn update_separator(&mut self, parent_id: PageId, child: PageId, key: u32) -> Result<()> {
        let (idx, num_keys) = {
            let node = InternalNode::parse(self.existing_page(parent_id)?)?;
            let idx = node
                .index_of_child(child)?
                .ok_or(PageboyError::Corruption("child missing from its parent"))?;
            (idx, node.num_keys())
        };
        if idx < num_keys {
            InternalNodeMut::new(self.pager.page_mut(parent_id)?).set_key(idx, key);
        }
        Ok(())
    }

    /// Points `child` at `parent_id`, touching the page only if it changes.
    fn set_parent_pointer(&mut self, child: PageId, parent_id: PageId) -> Result<()> {
        if parent(self.existing_page(child)?) != parent_id {
            set_parent(self.pager.page_mut(child)?, parent_id);
        }
        Ok(())
    }

    /// Adds `child_id` to the internal node `parent_id`, splitting it when it
    /// already holds the maximum number of separators.
    fn internal_insert(&mut self, parent_id: PageId, child_id: PageId) -> Result<()> {
        let child_max = self.node_max_key(child_id)?;
        let (num_keys, right_child, index) = {
            let node = InternalNode::parse(self.existing_page(parent_id)?)?;
            (node.num_keys(), node.right_child(), node.find_child(child_max))
        };
        if num_keys >= self.internal_max_cells {
            return self.internal_split_and_insert(parent_id, child_id);
        }
        let right_max = self.node_max_key(right_child)?;
        self.set_parent_pointer(child_id, parent_id)?;

        let mut node = InternalNodeMut::new(self.pager.page_mut(parent_id)?);
        if child_max > right_max {
            node.set_child(num_keys, right_child);
            node.set_key(num_keys, right_max);
            node.set_right_child(child_id);
        } else {
            node.shift_right(index, num_keys);
            node.set_child(index, child_id);
            node.set_key(index, child_max);
        }
        node.set_num_keys(num_keys + 1);
        Ok(())
    }

    /// Splits the full internal node `node_id` at its median child while
    /// adding `new_child`, then pushes the new right half into the parent.
    fn internal_split_and_insert(&mut self, node_id: PageId, new_child: PageId) -> Result<()> {
        let (mut children, right_child, root, parent_id) = {
            let page = self.existing_page(node_id)?;
            let node = InternalNode::parse(page)?;
            let entries = (0..node.num_keys())
                .map(|idx| -> Result<(PageId, u32)> { Ok((node.child(idx)?, node.key(idx))) })
                .collect::<Result<Vec<_>>>()?;
            (entries, node.right_child(), is_root(page)?, parent(page))
        };
        children.push((right_child, self.node_max_key(right_child)?));
        let new_max = self.node_max_key(new_child)?;
        let at = children.partition_point(|(_, max)| *max < new_max);
        children.insert(at, (new_child, new_max));

        let split = children.len() - children.len() / 2;
        let (left, right) = children.split_at(split);
        let (left_entries, left_last) = split_last(left)?;
        let (right_entries, right_last) = split_last(right)?;

        InternalNodeMut::new(self.pager.page_mut(node_id)?).write_entries(left_entries, left_last.0);
        let sibling_id = self.pager.get_unused_page_number();
        {
            let page = self.pager.page_mut(sibling_id)?;
            set_parent(page, parent_id);
            InternalNodeMut::init(page).write_entries(right_entries, right_last.0);
        }
        for (child, _) in left {
            self.set_parent_pointer(*child, node_id)?;
        }
        for (child, _) in right {
            self.set_parent_pointer(*child, sibling_id)?;
        }
        self.stats.internal_splits += 1;
        debug!(
            node = %node_id,
            sibling = %sibling_id,
            left = left.len(),
            right = right.len(),
            "btree.internal_split"
        );

        if root {
            self.promote_root(sibling_id)
        } else {
            self.update_separator(parent_id, node_id, left_last.1)?;
            self.internal_insert(parent_id, sibling_id)
        }
    }

    /// Grows the tree by one level after the root has split off `right_id`.
    ///
    /// The current root contents move to a new left page; page 0 becomes an
    /// internal node with that page and `right_id` as its two children.
    fn promote_root(&mut self, right_id: PageId) -> Result<()> {
        let root_id = self.root;
        let snapshot: Box<PageBuf> = Box::new(*self.pager.page(root_id)?);
        let left_id = self.pager.get_unused_page_number();
        {
            let page = self.pager.page_mut(left_id)?;
            *page = *snapshot;
            set_root(page, false);
            set_parent(page, root_id);
        }
        if node_kind(&snapshot)? == NodeKind::Internal {
            for child in InternalNode::parse(&snapshot)?.children()? {
                self.set_parent_pointer(child, left_id)?;
            }
        }
        let left_max = self.node_max_key(left_id)?;
        self.set_parent_pointer(right_id, root_id)?;
        {
            let page = self.pager.page_mut(root_id)?;
            InternalNodeMut::init(page).write_entries(&[(left_id, left_max)], right_id);
            set_root(page, true);
            set_parent(page, root_id);
        }
        self.stats.root_promotions += 1;
        debug!(left = %left_id, right = %right_id, separator = left_max, "btree.root_promote");
        Ok(())
    }
}

/// Cell `idx` of the sequence formed by inserting `new_cell` into `old` at
/// `insert_at`.
fn merged_cell<'a>(old: &LeafNode<'a>, new_cell: &'a [u8], insert_at: usize, idx: usize) -> &'a [u8] {
    match idx.cmp(&insert_at) {
        Ordering::Less => old.cell(idx),
        Ordering::Equal => new_cell,
        Ordering::Greater => old.cell(idx - 1),
    }
}

fn split_last(half: &[(PageId, u32)]) -> Result<(&[(PageId, u32)], (PageId, u32))> {
    match half.split_last() {
        Some((last, rest)) => Ok((rest, *last)),
        None => Err(PageboyError::Corruption("internal split produced an empty half")),
    }
}
