use super::node::{node_kind, InternalNode, LeafNode, NodeKind};
use super::{inspect, BTree, Cursor, Scan};
use crate::primitives::pager::{Pager, PagerOptions};
use crate::storage::row::{deserialize_row, serialize_row, Row};
use crate::types::{
    page::{internal, leaf},
    PageId, PageboyError, Result,
};
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::tempdir;

fn open_tree(path: &Path, max_pages: u32, internal_max_cells: usize) -> Result<BTree> {
    let pager = Pager::open(path, PagerOptions { max_pages })?;
    BTree::open(pager, internal_max_cells)
}

fn row(id: u32) -> Row {
    Row::new(id, format!("user{id}"), format!("person{id}@example.com")).unwrap()
}

fn scan_ids(tree: &mut BTree) -> Result<Vec<u32>> {
    Scan::new(tree)?.map(|row| row.map(|r| r.id())).collect()
}

fn snapshot_pages(tree: &mut BTree) -> Result<Vec<Vec<u8>>> {
    (0..tree.pager.num_pages())
        .map(|id| Ok(tree.pager.page(PageId(id))?.to_vec()))
        .collect()
}

fn leaf_keys(tree: &mut BTree, id: PageId) -> Result<Vec<u32>> {
    let leaf = LeafNode::parse(tree.pager.page(id)?)?;
    Ok((0..leaf.num_cells()).map(|idx| leaf.key(idx)).collect())
}

#[test]
fn three_rows_scan_in_key_order() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("three.db"), 100, 509)?;
    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        tree.insert(&Row::new(id, name, format!("{name}@x"))?)?;
    }
    let rows: Vec<String> = Scan::new(&mut tree)?
        .map(|row| row.map(|r| r.to_string()))
        .collect::<Result<_>>()?;
    assert_eq!(rows, vec!["(1, a, a@x)", "(2, b, b@x)", "(3, c, c@x)"]);

    let before = snapshot_pages(&mut tree)?;
    match tree.insert(&Row::new(1, "z", "z@x")?) {
        Err(PageboyError::DuplicateKey(1)) => {}
        other => panic!("expected duplicate key, got {other:?}"),
    }
    assert_eq!(snapshot_pages(&mut tree)?, before);
    assert_eq!(scan_ids(&mut tree)?, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn empty_tree_scans_nothing() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("empty.db"), 100, 509)?;
    let cursor = Cursor::start(&mut tree)?;
    assert!(cursor.is_end());
    assert!(scan_ids(&mut tree)?.is_empty());
    assert_eq!(inspect::verify(&mut tree)?.rows, 0);
    Ok(())
}

#[test]
fn reverse_order_inserts_stay_sorted_in_one_leaf() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("reverse.db"), 100, 509)?;
    for id in (1..=leaf::MAX_CELLS as u32).rev() {
        tree.insert(&row(id))?;
    }
    assert_eq!(tree.pager.num_pages(), 1);
    assert_eq!(leaf_keys(&mut tree, PageId::ROOT)?, (1..=13).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn fourteenth_key_promotes_root() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("split.db"), 100, 509)?;
    for id in 1..=14 {
        tree.insert(&row(id))?;
    }

    let (left, right) = {
        let page = tree.pager.page(PageId::ROOT)?;
        assert_eq!(node_kind(page)?, NodeKind::Internal);
        let root = InternalNode::parse(page)?;
        assert_eq!(root.num_keys(), 1);
        assert_eq!(root.key(0), 7);
        (root.child(0)?, root.right_child())
    };
    // The split leaf takes the next page; its left half is copied after it.
    assert_eq!(right, PageId(1));
    assert_eq!(left, PageId(2));
    assert_eq!(leaf_keys(&mut tree, left)?, (1..=7).collect::<Vec<_>>());
    assert_eq!(leaf_keys(&mut tree, right)?, (8..=14).collect::<Vec<_>>());
    assert_eq!(
        LeafNode::parse(tree.pager.page(left)?)?.next_leaf(),
        Some(right)
    );

    assert_eq!(tree.node_max_key(PageId::ROOT)?, 14);
    let summary = inspect::verify(&mut tree)?;
    assert_eq!(summary.depth, 2);
    assert_eq!(summary.leaves, 2);
    let stats = tree.stats();
    assert_eq!(stats.leaf_splits, 1);
    assert_eq!(stats.root_promotions, 1);
    assert_eq!(scan_ids(&mut tree)?, (1..=14).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn split_places_new_key_in_left_half() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("left.db"), 100, 509)?;
    for id in (2..=26).step_by(2) {
        tree.insert(&row(id))?;
    }
    tree.insert(&row(3))?;
    inspect::verify(&mut tree)?;
    let left = InternalNode::parse(tree.pager.page(PageId::ROOT)?)?.child(0)?;
    assert_eq!(leaf_keys(&mut tree, left)?, vec![2, 3, 4, 6, 8, 10, 12]);
    let row3 = {
        let mut cursor = Cursor::find(&mut tree, 3)?;
        cursor.row()?
    };
    assert_eq!(row3, row(3));
    Ok(())
}

#[test]
fn small_fanout_forces_internal_splits() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("fanout.db"), 400, 3)?;
    for id in 1..=200 {
        tree.insert(&row(id))?;
        inspect::verify(&mut tree)?;
    }
    let stats = tree.stats();
    assert!(stats.internal_splits > 0);
    assert!(stats.root_promotions >= 2);
    let summary = inspect::verify(&mut tree)?;
    assert!(summary.depth >= 3);
    assert_eq!(summary.rows, 200);
    assert_eq!(inspect::depth(&mut tree)?, summary.depth);
    assert_eq!(tree.node_max_key(PageId::ROOT)?, 200);
    assert_eq!(scan_ids(&mut tree)?, (1..=200).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn full_width_root_fills_then_splits() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("wide.db");
    let mut tree = open_tree(&path, 5_000, internal::MAX_CELLS)?;
    // Ascending keys leave seven rows in every leaf but the last. The root
    // is full once 3_576 is in, and 3_577 forces the next leaf split.
    for id in 1..=3_576 {
        tree.insert(&row(id))?;
    }
    {
        let root = InternalNode::parse(tree.pager.page(PageId::ROOT)?)?;
        assert_eq!(root.num_keys(), internal::MAX_CELLS);
        assert_eq!(root.key(0), 7);
        assert_eq!(root.key(internal::MAX_CELLS - 1), 3_563);
    }
    assert_eq!(tree.stats().internal_splits, 0);
    assert_eq!(tree.pager.num_pages(), 511);
    let summary = inspect::verify(&mut tree)?;
    assert_eq!((summary.depth, summary.leaves), (2, 510));
    let last_leaf = tree.find(3_576)?.page;
    assert_eq!(leaf_keys(&mut tree, last_leaf)?.len(), leaf::MAX_CELLS);

    tree.insert(&row(3_577))?;
    assert_eq!(tree.stats().internal_splits, 1);
    assert_eq!(inspect::verify(&mut tree)?.depth, 3);

    for id in 3_578..=4_000 {
        tree.insert(&row(id))?;
    }
    inspect::verify(&mut tree)?;
    tree.into_pager().close()?;

    let mut tree = open_tree(&path, 5_000, internal::MAX_CELLS)?;
    let summary = inspect::verify(&mut tree)?;
    assert_eq!(summary.depth, 3);
    assert_eq!(summary.leaves, 571);
    assert_eq!(summary.rows, 4_000);
    assert_eq!(scan_ids(&mut tree)?, (1..=4_000).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn shuffled_inserts_scan_in_order() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("shuffled.db"), 1000, 4)?;
    let mut keys: Vec<u32> = (1..=500).collect();
    keys.shuffle(&mut ChaCha8Rng::seed_from_u64(0x5eed));
    for (n, key) in keys.iter().enumerate() {
        tree.insert(&row(*key))?;
        if n % 25 == 0 {
            inspect::verify(&mut tree)?;
        }
    }
    assert_eq!(inspect::verify(&mut tree)?.rows, 500);
    assert_eq!(scan_ids(&mut tree)?, (1..=500).collect::<Vec<_>>());
    for key in [1u32, 250, 500] {
        let mut cursor = Cursor::find(&mut tree, key)?;
        assert_eq!(cursor.key()?, key);
    }
    let cursor = Cursor::find(&mut tree, 501)?;
    assert!(cursor.is_end());
    Ok(())
}

#[test]
fn table_full_rejects_before_touching_pages() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("full.db"), 3, 509)?;
    for id in 1..=20 {
        tree.insert(&row(id))?;
    }
    assert_eq!(tree.pager.remaining_pages(), 0);

    let before = snapshot_pages(&mut tree)?;
    match tree.insert(&row(21)) {
        Err(PageboyError::TableFull { max_pages: 3 }) => {}
        other => panic!("expected table full, got {other:?}"),
    }
    assert_eq!(snapshot_pages(&mut tree)?, before);
    assert_eq!(tree.pager.num_pages(), 3);

    // The left leaf still has room.
    tree.insert(&row(0))?;
    inspect::verify(&mut tree)?;
    assert_eq!(scan_ids(&mut tree)?, (0..=20).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn table_full_accounts_for_cascading_splits() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("cascade.db"), 12, 2)?;
    let mut inserted = Vec::new();
    for id in 1..=500u32 {
        let before = snapshot_pages(&mut tree)?;
        match tree.insert(&row(id)) {
            Ok(()) => inserted.push(id),
            Err(PageboyError::TableFull { .. }) => {
                assert_eq!(snapshot_pages(&mut tree)?, before);
                break;
            }
            Err(err) => return Err(err),
        }
        inspect::verify(&mut tree)?;
    }
    assert!(tree.pager.num_pages() <= 12);
    assert_eq!(scan_ids(&mut tree)?, inserted);
    Ok(())
}

#[test]
fn end_of_table_sits_past_the_last_row() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("end.db"), 100, 3)?;
    for id in 1..=40 {
        tree.insert(&row(id))?;
    }
    let cursor = Cursor::end_of_table(&mut tree)?;
    assert!(cursor.is_end());
    let pos = cursor.position();
    assert_eq!(leaf_keys(&mut tree, pos.page)?.last(), Some(&40));
    assert_eq!(pos.cell, leaf_keys(&mut tree, pos.page)?.len());
    Ok(())
}

#[test]
fn value_mut_rewrites_row_in_place() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("value.db"), 100, 509)?;
    for id in 1..=3 {
        tree.insert(&row(id))?;
    }
    {
        let mut cursor = Cursor::find(&mut tree, 2)?;
        serialize_row(&Row::new(2, "renamed", "new@x")?, cursor.value_mut()?)?;
    }
    let mut cursor = Cursor::find(&mut tree, 2)?;
    let stored = deserialize_row(cursor.value()?)?;
    assert_eq!(stored.username(), "renamed");
    Ok(())
}

#[test]
fn tree_survives_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("reopen.db");
    let expected = {
        let mut tree = open_tree(&path, 200, 3)?;
        for id in (1..=120).rev() {
            tree.insert(&row(id))?;
        }
        let ids = scan_ids(&mut tree)?;
        tree.into_pager().close()?;
        ids
    };
    let mut tree = open_tree(&path, 200, 3)?;
    inspect::verify(&mut tree)?;
    assert_eq!(scan_ids(&mut tree)?, expected);
    Ok(())
}

#[test]
fn corrupt_node_kind_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("corrupt.db"), 100, 509)?;
    for id in 1..=14 {
        tree.insert(&row(id))?;
    }
    tree.pager.page_mut(PageId(1))?[0] = 7;
    assert!(matches!(tree.find(14), Err(PageboyError::Corruption(_))));
    assert!(inspect::verify(&mut tree).is_err());
    Ok(())
}

#[test]
fn render_tree_lists_nodes_by_depth() -> Result<()> {
    let dir = tempdir()?;
    let mut tree = open_tree(&dir.path().join("render.db"), 100, 509)?;
    for id in 1..=14 {
        tree.insert(&row(id))?;
    }
    let rendered = inspect::render_tree(&mut tree)?;
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "- internal page 0 (size 1)");
    assert_eq!(lines[1], "  - leaf page 2 (size 7)");
    assert_eq!(lines[2], "    - 1");
    assert_eq!(lines[9], "  - key 7");
    assert_eq!(lines[10], "  - leaf page 1 (size 7)");
    assert_eq!(lines.len(), 18);
    Ok(())
}

#[test]
fn fanout_outside_page_capacity_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let pager = Pager::open(dir.path().join("fanout.db"), PagerOptions::default())?;
    assert!(matches!(
        BTree::open(pager, 1),
        Err(PageboyError::Invalid(_))
    ));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn inserts_match_ordered_map(keys in proptest::collection::vec(0u32..2_000, 1..300)) {
        let dir = tempdir().unwrap();
        let mut tree = open_tree(&dir.path().join("prop.db"), 1000, 3).unwrap();
        let mut model = BTreeMap::new();
        for key in keys {
            let result = tree.insert(&row(key));
            if model.contains_key(&key) {
                prop_assert!(matches!(result, Err(PageboyError::DuplicateKey(k)) if k == key));
            } else {
                prop_assert!(result.is_ok());
                model.insert(key, row(key));
            }
        }
        let rows: Vec<Row> = Scan::new(&mut tree).unwrap().collect::<Result<_>>().unwrap();
        prop_assert_eq!(rows, model.into_values().collect::<Vec<_>>());
        prop_assert!(inspect::verify(&mut tree).is_ok());
    }
}
