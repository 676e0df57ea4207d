//! Config and store location shared by the commands.

use crate::config::ScrapeConfig;
use crate::store::SqliteEventStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct Session {
    pub config: ScrapeConfig,
    pub db_path: PathBuf,
}

impl Session {
    /// Load config (`--config` or the default file), then pick the store
    /// path: `--db`, then config/`KITSQUID_DB`, then `~/.kitsquid/catalog.db`.
    pub fn load(config_path: Option<&Path>, db: Option<&Path>) -> Result<Self> {
        let config = ScrapeConfig::load(config_path).context("failed to load configuration")?;
        let db_path = db
            .map(Path::to_path_buf)
            .or_else(|| config.db_path.clone())
            .unwrap_or_else(SqliteEventStore::default_path);
        Ok(Self { config, db_path })
    }

    pub fn open_store(&self) -> Result<SqliteEventStore> {
        SqliteEventStore::open(&self.db_path)
            .with_context(|| format!("failed to open store at {}", self.db_path.display()))
    }
}
