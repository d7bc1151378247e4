//! Read-only walks over the tree: rendering, height and integrity checks.

use std::collections::HashSet;

use super::node::{is_root, node_kind, parent, InternalNode, LeafNode, NodeKind};
use super::tree::BTree;
use crate::types::{
    page::{common, internal, leaf, row},
    PageId, PageboyError, Result,
};

/// Shape of a tree that passed [`verify`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TreeSummary {
    /// Levels from the root to the leaves, counting both.
    pub depth: usize,
    /// Number of leaf pages.
    pub leaves: usize,
    /// Number of internal pages.
    pub internal_nodes: usize,
    /// Number of rows across all leaves.
    pub rows: usize,
}

/// Height of the tree, following leftmost children down to a leaf.
pub fn depth(tree: &mut BTree) -> Result<usize> {
    let mut page_id = tree.root();
    for level in 1..=tree.pager().num_pages() as usize {
        let page = tree.existing_page(page_id)?;
        match node_kind(page)? {
            NodeKind::Leaf => return Ok(level),
            NodeKind::Internal => page_id = InternalNode::parse(page)?.child(0)?,
        }
    }
    Err(PageboyError::Corruption("tree contains a cycle"))
}

/// Renders every node, indented by depth, as used by `.btree`.
pub fn render_tree(tree: &mut BTree) -> Result<String> {
    let mut out = String::new();
    let root = tree.root();
    render_node(tree, root, 0, &mut out)?;
    Ok(out)
}

fn render_node(tree: &mut BTree, id: PageId, level: usize, out: &mut String) -> Result<()> {
    if level > tree.pager().num_pages() as usize {
        return Err(PageboyError::Corruption("tree contains a cycle"));
    }
    let pad = "  ".repeat(level);
    let page = tree.existing_page(id)?;
    match node_kind(page)? {
        NodeKind::Leaf => {
            let leaf = LeafNode::parse(page)?;
            out.push_str(&format!("{pad}- leaf page {id} (size {})\n", leaf.num_cells()));
            for idx in 0..leaf.num_cells() {
                out.push_str(&format!("{pad}  - {}\n", leaf.key(idx)));
            }
        }
        NodeKind::Internal => {
            let node = InternalNode::parse(page)?;
            let keys: Vec<u32> = (0..node.num_keys()).map(|idx| node.key(idx)).collect();
            let children = node.children()?;
            out.push_str(&format!("{pad}- internal page {id} (size {})\n", keys.len()));
            for (child, key) in children.iter().zip(&keys) {
                render_node(tree, *child, level + 1, out)?;
                out.push_str(&format!("{pad}  - key {key}\n"));
            }
            if let Some(right) = children.last() {
                render_node(tree, *right, level + 1, out)?;
            }
        }
    }
    Ok(())
}

/// Layout constants, as printed by `.constants`.
pub fn layout_summary() -> String {
    format!(
        "ROW_SIZE: {}\n\
         COMMON_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_CELL_SIZE: {}\n\
         LEAF_NODE_SPACE_FOR_CELLS: {}\n\
         LEAF_NODE_MAX_CELLS: {}\n\
         INTERNAL_NODE_MAX_CELLS: {}\n",
        row::ROW_SIZE,
        common::HEADER_SIZE,
        leaf::HEADER_SIZE,
        leaf::CELL_SIZE,
        leaf::SPACE_FOR_CELLS,
        leaf::MAX_CELLS,
        internal::MAX_CELLS,
    )
}

/// Walks the whole tree and checks its structural invariants.
///
/// Checked: exactly one root on page 0, every parent pointer, strictly
/// ascending keys within each node and across subtrees, separators equal to
/// their child's maximum key, equal leaf depth, and a sibling chain that
/// visits every leaf in key order.
pub fn verify(tree: &mut BTree) -> Result<TreeSummary> {
    let root = tree.root();
    if !is_root(tree.existing_page(root)?)? {
        return Err(PageboyError::Corruption("root page is not flagged as root"));
    }
    let mut walk = Walk::default();
    walk.visit(
        tree,
        Visit {
            id: root,
            parent: None,
            level: 1,
            lower: None,
            upper: None,
        },
    )?;

    for pair in walk.leaves.windows(2) {
        if pair[0].1 != Some(pair[1].0) {
            return Err(PageboyError::Corruption("leaf sibling chain skips a leaf"));
        }
    }
    if let Some((_, next)) = walk.leaves.last() {
        if next.is_some() {
            return Err(PageboyError::Corruption("last leaf has a sibling"));
        }
    }
    Ok(TreeSummary {
        depth: walk.leaf_depth.unwrap_or(1),
        leaves: walk.leaves.len(),
        internal_nodes: walk.internal_nodes,
        rows: walk.rows,
    })
}

struct Visit {
    id: PageId,
    parent: Option<PageId>,
    level: usize,
    /// Every key must be strictly greater than this.
    lower: Option<u32>,
    /// Every key must be at most this.
    upper: Option<u32>,
}

#[derive(Default)]
struct Walk {
    visited: HashSet<PageId>,
    /// Leaves in key order with their recorded sibling.
    leaves: Vec<(PageId, Option<PageId>)>,
    leaf_depth: Option<usize>,
    internal_nodes: usize,
    rows: usize,
}

impl Walk {
    /// Returns the maximum key under `at.id`, or `None` for an empty root leaf.
    fn visit(&mut self, tree: &mut BTree, at: Visit) -> Result<Option<u32>> {
        if !self.visited.insert(at.id) {
            return Err(PageboyError::Corruption("page reachable more than once"));
        }
        let page = tree.existing_page(at.id)?;
        if let Some(expected) = at.parent {
            if is_root(page)? {
                return Err(PageboyError::Corruption("non-root page flagged as root"));
            }
            if parent(page) != expected {
                return Err(PageboyError::Corruption("stale parent pointer"));
            }
        }
        let in_bounds = |key: u32| {
            at.lower.map_or(true, |lo| key > lo) && at.upper.map_or(true, |hi| key <= hi)
        };

        match node_kind(page)? {
            NodeKind::Leaf => {
                let leaf = LeafNode::parse(page)?;
                if leaf.num_cells() == 0 && at.parent.is_some() {
                    return Err(PageboyError::Corruption("empty leaf below the root"));
                }
                let keys: Vec<u32> = (0..leaf.num_cells()).map(|idx| leaf.key(idx)).collect();
                if keys.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(PageboyError::Corruption("leaf keys out of order"));
                }
                if !keys.iter().all(|key| in_bounds(*key)) {
                    return Err(PageboyError::Corruption("leaf key outside its separator range"));
                }
                match self.leaf_depth {
                    Some(depth) if depth != at.level => {
                        return Err(PageboyError::Corruption("leaves at unequal depth"));
                    }
                    _ => self.leaf_depth = Some(at.level),
                }
                self.leaves.push((at.id, leaf.next_leaf()));
                self.rows += keys.len();
                Ok(keys.last().copied())
            }
            NodeKind::Internal => {
                let node = InternalNode::parse(page)?;
                if node.num_keys() == 0 {
                    return Err(PageboyError::Corruption("internal node without separators"));
                }
                let keys: Vec<u32> = (0..node.num_keys()).map(|idx| node.key(idx)).collect();
                let children = node.children()?;
                if keys.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(PageboyError::Corruption("separators out of order"));
                }
                if !keys.iter().all(|key| in_bounds(*key)) {
                    return Err(PageboyError::Corruption("separator outside its parent range"));
                }
                self.internal_nodes += 1;

                let mut lower = at.lower;
                let mut max = None;
                for (idx, child) in children.iter().enumerate() {
                    let upper = keys.get(idx).copied().or(at.upper);
                    max = self.visit(
                        tree,
                        Visit {
                            id: *child,
                            parent: Some(at.id),
                            level: at.level + 1,
                            lower,
                            upper,
                        },
                    )?;
                    if let Some(separator) = keys.get(idx) {
                        if max != Some(*separator) {
                            return Err(PageboyError::Corruption(
                                "separator differs from child max key",
                            ));
                        }
                        lower = Some(*separator);
                    }
                }
                Ok(max)
            }
        }
    }
}
