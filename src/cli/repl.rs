use std::io::{BufRead, Write};

use tracing::debug;

use super::meta::MetaCommand;
use super::statement::{prepare, Statement};
use super::ui::Ui;
use crate::storage::btree::inspect;
use crate::storage::Table;
use crate::types::{PageboyError, Result};

/// Name shown in the prompt.
pub const APP_NAME: &str = "pageboy";

/// Reads lines from `input` until `.exit` or end of input, running each one
/// against `table` and writing results to `out`. The table is closed, and
/// therefore flushed, before returning.
///
/// Duplicate keys and a full table are reported and the loop continues.
/// Any other storage error ends the loop and is returned.
pub fn run<R: BufRead, W: Write>(mut table: Table, mut input: R, mut out: W, ui: &Ui) -> Result<()> {
    let mut raw = Vec::new();
    loop {
        write!(out, "{}", ui.prompt(APP_NAME))?;
        out.flush()?;
        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            writeln!(out)?;
            break;
        }
        // Invalid UTF-8 is replaced rather than ending the session.
        let line = String::from_utf8_lossy(&raw);
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        debug!(command, "repl.line");
        if command.starts_with('.') {
            match MetaCommand::parse(command) {
                Some(MetaCommand::Exit) => break,
                Some(meta) => run_meta(&mut table, meta, &mut out, ui)?,
                None => writeln!(
                    out,
                    "{}",
                    ui.error(format!("Unrecognized command '{command}'"))
                )?,
            }
            continue;
        }
        match prepare(command) {
            Ok(statement) => execute(&mut table, statement, &mut out, ui)?,
            Err(err) => writeln!(out, "{}", ui.error(&err))?,
        }
    }
    table.close()
}

fn execute<W: Write>(table: &mut Table, statement: Statement, out: &mut W, ui: &Ui) -> Result<()> {
    match statement {
        Statement::Insert(row) => match table.insert(&row) {
            Ok(()) => writeln!(out, "{}", ui.success("Executed."))?,
            Err(PageboyError::DuplicateKey(_)) => {
                writeln!(out, "{}", ui.error("Error: Duplicate key."))?
            }
            Err(PageboyError::TableFull { .. }) => {
                writeln!(out, "{}", ui.error("Error: Table full."))?
            }
            Err(err) => return Err(err),
        },
        Statement::Select => {
            for row in table.scan()? {
                writeln!(out, "{}", row?)?;
            }
            writeln!(out, "{}", ui.success("Executed."))?;
        }
    }
    Ok(())
}

fn run_meta<W: Write>(table: &mut Table, meta: MetaCommand, out: &mut W, ui: &Ui) -> Result<()> {
    match meta {
        MetaCommand::Exit => {}
        MetaCommand::Btree => {
            writeln!(out, "Tree:")?;
            write!(out, "{}", ui.detail(table.render_tree()?))?;
        }
        MetaCommand::Constants => {
            writeln!(out, "Constants:")?;
            write!(out, "{}", ui.detail(inspect::layout_summary()))?;
        }
        MetaCommand::Stats => {
            writeln!(out, "btree: {}", table.stats())?;
            writeln!(out, "pager: {}", table.pager_stats())?;
            writeln!(out, "pages: {}/{}", table.num_pages(), table.options().max_pages)?;
        }
    }
    Ok(())
}
