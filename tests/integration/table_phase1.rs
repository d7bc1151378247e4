#![allow(missing_docs)]

use pageboy::{types::Result, PageboyError, Row, Table, TableOptions};
use tempfile::tempdir;

fn scan(table: &mut Table) -> Result<Vec<Row>> {
    table.scan()?.collect()
}

#[test]
fn three_rows_round_trip_through_a_single_leaf() -> Result<()> {
    let dir = tempdir()?;
    let mut table = Table::open(dir.path().join("phase1.db"))?;
    table.insert(&Row::new(1, "a", "a@x")?)?;
    table.insert(&Row::new(2, "b", "b@x")?)?;
    table.insert(&Row::new(3, "c", "c@x")?)?;

    let rendered: Vec<String> = scan(&mut table)?.iter().map(Row::to_string).collect();
    assert_eq!(rendered, ["(1, a, a@x)", "(2, b, b@x)", "(3, c, c@x)"]);
    assert_eq!(table.depth()?, 1);

    let err = table.insert(&Row::new(1, "a", "a@x")?).unwrap_err();
    assert!(matches!(err, PageboyError::DuplicateKey(1)));
    assert!(err.is_recoverable());
    assert_eq!(scan(&mut table)?.len(), 3);
    table.close()
}

#[test]
fn one_split_grows_the_tree_by_one_level() -> Result<()> {
    let dir = tempdir()?;
    let mut table = Table::open(dir.path().join("split.db"))?;
    for id in 1..=14 {
        table.insert(&Row::new(id, format!("user{id}"), format!("user{id}@x"))?)?;
    }
    let summary = table.verify()?;
    assert_eq!(summary.depth, 2);
    assert_eq!(summary.leaves, 2);
    assert_eq!(summary.internal_nodes, 1);
    assert_eq!(table.max_key()?, Some(14));
    assert!(table.render_tree()?.starts_with("- internal page 0 (size 1)\n"));
    assert_eq!(table.stats().root_promotions, 1);
    Ok(())
}

#[test]
fn default_page_limit_reports_table_full() -> Result<()> {
    let dir = tempdir()?;
    let mut table = Table::open_with(
        dir.path().join("limit.db"),
        TableOptions::default().max_pages(100),
    )?;
    let mut inserted = 0u32;
    let err = loop {
        match table.insert(&Row::new(inserted, "u", "e")?) {
            Ok(()) => inserted += 1,
            Err(err) => break err,
        }
    };
    assert!(matches!(err, PageboyError::TableFull { max_pages: 100 }));
    assert!(table.num_pages() <= 100);
    assert_eq!(table.row_count()?, inserted as usize);
    table.verify()?;
    Ok(())
}

#[test]
fn invalid_options_fail_to_open() -> Result<()> {
    let dir = tempdir()?;
    let result = Table::open_with(
        dir.path().join("bad.db"),
        TableOptions::default().internal_max_cells(1),
    );
    assert!(matches!(result, Err(PageboyError::Invalid(_))));
    Ok(())
}
