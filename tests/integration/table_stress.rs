#![allow(missing_docs)]

use std::collections::BTreeMap;

use pageboy::{types::Result, PageboyError, Row, Table, TableOptions};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

fn row(id: u32) -> Row {
    Row::new(id, format!("u{id}"), format!("u{id}@example.com")).unwrap()
}

#[test]
fn random_inserts_match_reference_model() -> Result<()> {
    let dir = tempdir()?;
    let mut table = Table::open_with(
        dir.path().join("stress.db"),
        TableOptions::default().max_pages(2_000).internal_max_cells(5),
    )?;
    let mut rng = ChaCha8Rng::seed_from_u64(0xB7EE);
    let mut model = BTreeMap::new();
    for round in 0..3_000 {
        let id = rng.gen_range(0..5_000u32);
        match table.insert(&row(id)) {
            Ok(()) => {
                assert!(model.insert(id, row(id)).is_none());
            }
            Err(PageboyError::DuplicateKey(dup)) => {
                assert_eq!(dup, id);
                assert!(model.contains_key(&id));
            }
            Err(err) => return Err(err),
        }
        if round % 500 == 0 {
            table.verify()?;
        }
    }
    let rows = table.scan()?.collect::<Result<Vec<_>>>()?;
    assert_eq!(rows, model.values().cloned().collect::<Vec<_>>());
    let summary = table.verify()?;
    assert_eq!(summary.rows, model.len());
    for id in [0u32, 17, 2_500, 4_999] {
        assert_eq!(table.find(id)?, model.get(&id).cloned());
    }
    Ok(())
}

#[test]
fn descending_inserts_split_on_the_left_edge() -> Result<()> {
    let dir = tempdir()?;
    let mut table = Table::open_with(
        dir.path().join("descending.db"),
        TableOptions::default().max_pages(500).internal_max_cells(2),
    )?;
    for id in (0..400).rev() {
        table.insert(&row(id))?;
    }
    let summary = table.verify()?;
    assert!(summary.depth >= 4);
    let ids: Vec<u32> = table
        .scan()?
        .map(|row| row.map(|r| r.id()))
        .collect::<Result<_>>()?;
    assert_eq!(ids, (0..400).collect::<Vec<_>>());
    assert!(table.stats().internal_splits > 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn scan_is_sorted_after_close_and_reopen(ids in proptest::collection::hash_set(any::<u32>(), 1..200)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.db");
        let options = TableOptions::default().max_pages(500).internal_max_cells(4);
        {
            let mut table = Table::open_with(&path, options.clone()).unwrap();
            for id in &ids {
                table.insert(&row(*id)).unwrap();
            }
            table.close().unwrap();
        }
        let mut table = Table::open_with(&path, options).unwrap();
        let scanned: Vec<u32> = table
            .scan()
            .unwrap()
            .map(|row| row.unwrap().id())
            .collect();
        let mut expected: Vec<u32> = ids.into_iter().collect();
        expected.sort_unstable();
        prop_assert_eq!(scanned, expected);
        prop_assert!(table.verify().is_ok());
    }
}
