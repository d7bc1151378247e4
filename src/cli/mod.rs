#![forbid(unsafe_code)]

//! Line-oriented front end: statement parsing, dot-commands, the REPL loop
//! and its config file.

/// Optional TOML settings file.
pub mod config;
/// Dot-prefixed REPL commands.
pub mod meta;
/// Read-eval-print loop over any reader and writer.
pub mod repl;
/// `insert` / `select` parsing.
pub mod statement;
/// Terminal styling.
pub mod ui;

pub use config::{CliConfig, ConfigError};
pub use meta::MetaCommand;
pub use repl::{run, APP_NAME};
pub use statement::{prepare, PrepareError, Statement};
pub use ui::Ui;
