use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings read from the optional TOML config file.
///
/// ```toml
/// database = "/var/lib/pageboy/users.db"
/// max_pages = 400
/// internal_max_cells = 509
/// log_level = "info"
/// ```
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    /// Loads `explicit`, or the per-user default location when `None`.
    ///
    /// A missing file yields an empty config; an unreadable or malformed one
    /// is an error.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        Ok(Self { path, data })
    }

    /// File the config was looked up at.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Default database file.
    pub fn database(&self) -> Option<&PathBuf> {
        self.data.database.as_ref()
    }

    /// Page limit override.
    pub fn max_pages(&self) -> Option<u32> {
        self.data.max_pages
    }

    /// Internal node fan-out override.
    pub fn internal_max_cells(&self) -> Option<u32> {
        self.data.internal_max_cells
    }

    /// Log filter override.
    pub fn log_level(&self) -> Option<&str> {
        self.data.log_level.as_deref()
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database: Option<PathBuf>,
    max_pages: Option<u32>,
    internal_max_cells: Option<u32>,
    log_level: Option<String>,
}

/// Errors raised while loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file location.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// `<config dir>/pageboy/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("pageboy").join("config.toml"))
}
