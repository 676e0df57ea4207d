//! Scraper configuration.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults matching the production catalog site
//! 2. A JSON file (`--config`, or `~/.kitsquid/config.json` when present)
//! 3. `KITSQUID_*` environment variables
//!
//! The result is validated once and then passed explicitly to every
//! component that needs it.

use crate::catalog::schema::RowSchemaVersion;
use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://campus.kit.edu/sp/campus/all";
pub const DEFAULT_INTEGRATION_URL: &str =
    "https://ilias.studium.kit.edu/Customizing/global/CourseDataWS.php/gguid/{gguid}";
pub const DEFAULT_MAX_WORKERS: usize = 6;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Largest page size the listing endpoint honours; avoids pagination.
pub const DEFAULT_PAGE_SIZE: u32 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Catalog root; `fields.asp`, `field.asp` and `event.asp` hang off it.
    pub base_url: String,
    /// Auxiliary course-data endpoint, `{gguid}` is replaced per event.
    pub integration_url: String,
    pub max_workers: usize,
    pub timeout_ms: u64,
    pub page_size: u32,
    /// Display language requested from the faculty index.
    pub language: String,
    pub row_schema: RowSchemaVersion,
    /// Term key → site term token (`tguid`).
    pub terms: BTreeMap<String, String>,
    pub db_path: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(
            "WS 18/19".to_string(),
            "0x4CB7204338AE4F67A58AFCE6C29D1488".to_string(),
        );
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            integration_url: DEFAULT_INTEGRATION_URL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
            language: "de".to_string(),
            row_schema: RowSchemaVersion::default(),
            terms,
            db_path: None,
        }
    }
}

impl ScrapeConfig {
    /// Default config file location: `~/.kitsquid/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".kitsquid")
            .join("config.json")
    }

    /// Load from an explicit file, or from the default location if it exists,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ScrapeError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let p = Self::default_path();
                if p.exists() {
                    Self::from_file(&p)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScrapeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| ScrapeError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `KITSQUID_*` overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ScrapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KITSQUID_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("KITSQUID_INTEGRATION_URL") {
            self.integration_url = v;
        }
        if let Some(v) = lookup("KITSQUID_MAX_WORKERS") {
            self.max_workers = v
                .parse()
                .map_err(|_| ScrapeError::Config(format!("KITSQUID_MAX_WORKERS={v}")))?;
        }
        if let Some(v) = lookup("KITSQUID_TIMEOUT_MS") {
            self.timeout_ms = v
                .parse()
                .map_err(|_| ScrapeError::Config(format!("KITSQUID_TIMEOUT_MS={v}")))?;
        }
        if let Some(v) = lookup("KITSQUID_DB") {
            self.db_path = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.max_workers == 0 {
            return Err(ScrapeError::Config("max_workers must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ScrapeError::Config("timeout_ms must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(ScrapeError::Config("page_size must be positive".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        if !self.integration_url.contains("{gguid}") {
            return Err(ScrapeError::Config(
                "integration_url needs a {gguid} placeholder".into(),
            ));
        }
        url::Url::parse(&self.integration_url.replace("{gguid}", "0x0")).map_err(|e| {
            ScrapeError::Config(format!("integration_url {:?}: {e}", self.integration_url))
        })?;
        Ok(())
    }
}
