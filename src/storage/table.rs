use std::path::{Path, PathBuf};

use tracing::info;

use super::btree::{inspect, BTree, BTreeStats, Cursor, Scan, TreeSummary};
use super::row::Row;
use crate::primitives::pager::{Pager, PagerOptions, PagerStats};
use crate::types::{
    page::{internal, DEFAULT_MAX_PAGES},
    PageboyError, Result,
};

/// Configuration options supplied when opening a [`Table`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableOptions {
    /// Upper bound on the number of pages the table file may hold
    pub max_pages: u32,
    /// Separators an internal node holds before it splits
    pub internal_max_cells: u32,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            internal_max_cells: internal::MAX_CELLS as u32,
        }
    }
}

impl TableOptions {
    /// Sets the page limit.
    pub fn max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages;
        self
    }

    /// Sets the internal node fan-out, in separators.
    pub fn internal_max_cells(mut self, cells: u32) -> Self {
        self.internal_max_cells = cells;
        self
    }

    /// Rejects option combinations the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(PageboyError::Invalid("max_pages must be at least 1"));
        }
        if self.internal_max_cells < 2 {
            return Err(PageboyError::Invalid("internal_max_cells must be at least 2"));
        }
        if self.internal_max_cells as usize > internal::MAX_CELLS {
            return Err(PageboyError::Invalid(
                "internal_max_cells exceeds what fits in a page",
            ));
        }
        Ok(())
    }
}

/// An open table file: a B+ tree of [`Row`]s keyed by id.
///
/// Changes live in the page cache until [`Table::close`]. Dropping a table
/// without closing it still flushes, but any write error is only logged.
pub struct Table {
    tree: BTree,
    path: PathBuf,
    options: TableOptions,
}

impl Table {
    /// Opens the table at `path` with default options, creating the file if
    /// it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, TableOptions::default())
    }

    /// Opens the table at `path` with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();
        let pager = Pager::open(
            &path,
            PagerOptions {
                max_pages: options.max_pages,
            },
        )?;
        let tree = BTree::open(pager, options.internal_max_cells as usize)?;
        info!(
            path = %path.display(),
            pages = tree.pager().num_pages(),
            "table.open"
        );
        Ok(Self {
            tree,
            path,
            options,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options the table was opened with.
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Inserts a row keyed by its id.
    ///
    /// Duplicate ids and inserts that would exceed the page limit fail with
    /// a recoverable error and leave the table unchanged.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        self.tree.insert(row)
    }

    /// Ordered scan over every row.
    pub fn scan(&mut self) -> Result<Scan<'_>> {
        Scan::new(&mut self.tree)
    }

    /// Looks up the row with the given id.
    pub fn find(&mut self, id: u32) -> Result<Option<Row>> {
        let mut cursor = Cursor::find(&mut self.tree, id)?;
        if cursor.is_end() || cursor.key()? != id {
            return Ok(None);
        }
        cursor.row().map(Some)
    }

    /// Number of rows, counted by walking the leaf chain.
    pub fn row_count(&mut self) -> Result<usize> {
        let mut cursor = Cursor::start(&mut self.tree)?;
        let mut count = 0;
        while !cursor.is_end() {
            count += 1;
            cursor.advance()?;
        }
        Ok(count)
    }

    /// Largest id in the table, if any.
    pub fn max_key(&mut self) -> Result<Option<u32>> {
        if Cursor::start(&mut self.tree)?.is_end() {
            return Ok(None);
        }
        let root = self.tree.root();
        self.tree.node_max_key(root).map(Some)
    }

    /// Levels from the root to the leaves.
    pub fn depth(&mut self) -> Result<usize> {
        inspect::depth(&mut self.tree)
    }

    /// Checks every structural invariant of the tree.
    pub fn verify(&mut self) -> Result<TreeSummary> {
        inspect::verify(&mut self.tree)
    }

    /// Indented dump of every node.
    pub fn render_tree(&mut self) -> Result<String> {
        inspect::render_tree(&mut self.tree)
    }

    /// B+ tree operation counters.
    pub fn stats(&self) -> BTreeStats {
        self.tree.stats()
    }

    /// Page cache counters.
    pub fn pager_stats(&self) -> PagerStats {
        self.tree.pager().stats()
    }

    /// Pages currently in use.
    pub fn num_pages(&self) -> u32 {
        self.tree.pager().num_pages()
    }

    /// Flushes every dirty page and releases the file.
    pub fn close(self) -> Result<()> {
        let stats = self.tree.stats();
        info!(path = %self.path.display(), stats = %stats, "table.close");
        self.tree.into_pager().close()
    }
}
