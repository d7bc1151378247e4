//! Binary entry point for the Pageboy REPL.
#![forbid(unsafe_code)]

use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use pageboy::{
    cli::{self, CliConfig, Ui},
    logging::{init_logging, DEFAULT_LOG_LEVEL},
    Table, TableOptions,
};

#[derive(Parser, Debug)]
#[command(
    name = "pageboy",
    version,
    about = "Interactive shell over a single-file B+ tree table"
)]
struct Cli {
    /// Table file to open, created if absent
    #[arg(value_name = "DB")]
    db: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        env = "PAGEBOY_CONFIG",
        help = "Config file (defaults to <config dir>/pageboy/config.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(long, help = "Maximum number of pages the table file may hold")]
    max_pages: Option<u32>,

    #[arg(long, help = "Separators an internal node holds before it splits")]
    internal_max_cells: Option<u32>,

    #[arg(
        long,
        value_name = "FILTER",
        env = "PAGEBOY_LOG",
        help = "Tracing filter for stderr logs (e.g. debug, pageboy=trace)"
    )]
    log_level: Option<String>,

    #[arg(long, help = "Disable coloured output")]
    plain: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    let config = CliConfig::load(args.config.clone())?;

    let level = args
        .log_level
        .as_deref()
        .or(config.log_level())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    init_logging(level)?;

    let db = args
        .db
        .clone()
        .or_else(|| config.database().cloned())
        .ok_or("no table file given; pass DB or set `database` in the config file")?;

    let defaults = TableOptions::default();
    let options = TableOptions {
        max_pages: args
            .max_pages
            .or(config.max_pages())
            .unwrap_or(defaults.max_pages),
        internal_max_cells: args
            .internal_max_cells
            .or(config.internal_max_cells())
            .unwrap_or(defaults.internal_max_cells),
    };

    let table = Table::open_with(&db, options)?;
    let ui = Ui::new(args.plain);
    let stdin = io::stdin();
    cli::run(table, stdin.lock(), io::stdout().lock(), &ui)?;
    Ok(())
}
