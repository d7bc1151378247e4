use std::fmt;

/// Counters for B+ tree operations since the table was opened.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct BTreeStats {
    /// Root-to-leaf searches performed
    pub searches: u64,
    /// Rows inserted
    pub inserts: u64,
    /// Leaf page splits performed
    pub leaf_splits: u64,
    /// Internal page splits performed
    pub internal_splits: u64,
    /// Times the tree grew a level
    pub root_promotions: u64,
}

impl fmt::Display for BTreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "searches={} inserts={} leaf_splits={} internal_splits={} root_promotions={}",
            self.searches, self.inserts, self.leaf_splits, self.internal_splits, self.root_promotions
        )
    }
}
