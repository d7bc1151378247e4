#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

fn setup(name: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join(format!("{name}.db"));
    let config = dir.path().join("absent.toml");
    (dir, db, config)
}

fn session(db: &Path, config: &Path, script: &str) -> String {
    let output = cargo_bin_cmd!("pageboy")
        .arg(db)
        .arg("--config")
        .arg(config)
        .arg("--plain")
        .write_stdin(script.to_string())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf8 stdout")
}

#[test]
fn insert_and_select_round_trip() {
    let (_dir, db, config) = setup("basic");
    let out = session(&db, &config, "insert 1 alice alice@example.com\nselect\n.exit\n");
    assert_eq!(
        out,
        "pageboy > Executed.\npageboy > (1, alice, alice@example.com)\nExecuted.\npageboy > "
    );
}

#[test]
fn rows_persist_across_processes() {
    let (_dir, db, config) = setup("persist");
    let script: String = (1..=30)
        .map(|id| format!("insert {id} user{id} person{id}@example.com\n"))
        .chain(std::iter::once(".exit\n".to_string()))
        .collect();
    session(&db, &config, &script);

    let out = session(&db, &config, "select\n.exit\n");
    let rows: Vec<&str> = out
        .lines()
        .map(|line| line.trim_start_matches("pageboy > "))
        .filter(|line| line.starts_with('('))
        .collect();
    assert_eq!(rows.len(), 30);
    assert_eq!(rows[0], "(1, user1, person1@example.com)");
    assert_eq!(rows[29], "(30, user30, person30@example.com)");
}

#[test]
fn errors_are_reported_without_exiting() {
    let (_dir, db, config) = setup("errors");
    let out = session(
        &db,
        &config,
        "insert 1 a b\ninsert 1 a b\ninsert -5 a b\nfrobnicate\n.frob\n.exit\n",
    );
    assert!(out.contains("Error: Duplicate key."));
    assert!(out.contains("ID must be positive."));
    assert!(out.contains("Unrecognized keyword at start of 'frobnicate'."));
    assert!(out.contains("Unrecognized command '.frob'"));
}

#[test]
fn page_limit_flag_triggers_table_full() {
    let (_dir, db, config) = setup("full");
    let script: String = (1..=14).map(|id| format!("insert {id} u e\n")).collect();
    let output = cargo_bin_cmd!("pageboy")
        .arg(&db)
        .arg("--config")
        .arg(&config)
        .args(["--plain", "--max-pages", "1"])
        .write_stdin(script)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("Error: Table full."));
}

#[test]
fn config_file_supplies_database_and_limits() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("from_config.db");
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "database = {:?}\nmax_pages = 50\ninternal_max_cells = 3\n",
            db.display().to_string()
        ),
    )
    .expect("write config");

    let output = cargo_bin_cmd!("pageboy")
        .arg("--config")
        .arg(&config)
        .arg("--plain")
        .write_stdin("insert 9 a b\n.exit\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("Executed."));
    assert!(db.exists());
}

#[test]
fn ragged_file_exits_with_error() {
    let (_dir, db, config) = setup("ragged");
    fs::write(&db, vec![0u8; 100]).expect("write ragged file");
    cargo_bin_cmd!("pageboy")
        .arg(&db)
        .arg("--config")
        .arg(&config)
        .write_stdin(".exit\n")
        .assert()
        .failure();
}

#[test]
fn constants_and_btree_meta_commands() {
    let (_dir, db, config) = setup("meta");
    let mut script: String = (1..=14).map(|id| format!("insert {id} u e\n")).collect();
    script.push_str(".btree\n.constants\n.exit\n");
    let out = session(&db, &config, &script);
    assert!(out.contains("Tree:\n- internal page 0 (size 1)\n"));
    assert!(out.contains("  - key 7\n"));
    assert!(out.contains("INTERNAL_NODE_MAX_CELLS: 509\n"));
}
