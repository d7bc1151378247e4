#![allow(missing_docs)]

use std::fs;

use pageboy::{types::page::PAGE_SIZE, types::Result, PageboyError, Row, Table, TableOptions};
use tempfile::tempdir;

fn row(id: u32) -> Result<Row> {
    Row::new(id, format!("user{id}"), format!("user{id}@example.com"))
}

#[test]
fn reopen_yields_identical_scan() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("persist.db");
    let options = TableOptions::default().max_pages(200).internal_max_cells(3);

    let before: Vec<Row> = {
        let mut table = Table::open_with(&path, options.clone())?;
        for id in (0..150).map(|n| (n * 37) % 150) {
            table.insert(&row(id)?)?;
        }
        let rows = table.scan()?.collect::<Result<Vec<_>>>()?;
        table.close()?;
        rows
    };
    assert_eq!(fs::metadata(&path)?.len() % PAGE_SIZE as u64, 0);

    let mut table = Table::open_with(&path, options)?;
    let after = table.scan()?.collect::<Result<Vec<_>>>()?;
    assert_eq!(after, before);
    assert_eq!(table.verify()?.rows, 150);
    Ok(())
}

#[test]
fn inserts_after_reopen_extend_the_tree() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("extend.db");
    {
        let mut table = Table::open(&path)?;
        for id in 1..=20 {
            table.insert(&row(id)?)?;
        }
        table.close()?;
    }
    let mut table = Table::open(&path)?;
    assert!(matches!(
        table.insert(&row(5)?),
        Err(PageboyError::DuplicateKey(5))
    ));
    for id in 21..=40 {
        table.insert(&row(id)?)?;
    }
    assert_eq!(table.row_count()?, 40);
    table.verify()?;
    Ok(())
}

#[test]
fn file_length_is_a_whole_number_of_pages() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("pages.db");
    let mut table = Table::open(&path)?;
    for id in 1..=14 {
        table.insert(&row(id)?)?;
    }
    let pages = table.num_pages();
    table.close()?;
    assert_eq!(fs::metadata(&path)?.len(), u64::from(pages) * PAGE_SIZE as u64);
    Ok(())
}

#[test]
fn ragged_file_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ragged.db");
    fs::write(&path, vec![0u8; PAGE_SIZE - 1])?;
    assert!(matches!(
        Table::open(&path),
        Err(PageboyError::CorruptFileLength { .. })
    ));
    Ok(())
}

#[test]
fn garbage_root_is_corruption() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("garbage.db");
    fs::write(&path, vec![0xAB; PAGE_SIZE])?;
    assert!(matches!(
        Table::open(&path),
        Err(PageboyError::Corruption(_))
    ));
    Ok(())
}
