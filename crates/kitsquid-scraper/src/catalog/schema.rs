//! Listing row shape.
//!
//! Event rows are read positionally. The column count has changed between
//! catalog revisions (6 cells, later 8), so the column-to-field mapping is a
//! versioned value chosen in config and checked against every row.

use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSchemaVersion {
    /// Older six-column listing.
    V1,
    /// Current eight-column listing.
    #[default]
    V2,
}

/// Cell positions of one row schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSchema {
    pub version: RowSchemaVersion,
    pub column_count: usize,
    pub code: usize,
    pub title: usize,
    pub lecturers: usize,
    pub kind: usize,
}

impl RowSchema {
    pub fn for_version(version: RowSchemaVersion) -> Self {
        let column_count = match version {
            RowSchemaVersion::V1 => 6,
            RowSchemaVersion::V2 => 8,
        };
        Self {
            version,
            column_count,
            code: 1,
            title: 2,
            lecturers: 3,
            kind: 4,
        }
    }

    /// Check an event row's cell count against this schema.
    pub fn validate(&self, cells: usize) -> Result<(), ScrapeError> {
        if cells == self.column_count {
            return Ok(());
        }
        Err(ScrapeError::Parse(format!(
            "event row has {cells} cells, schema {:?} expects {}",
            self.version, self.column_count
        )))
    }
}

impl Default for RowSchema {
    fn default() -> Self {
        Self::for_version(RowSchemaVersion::default())
    }
}
