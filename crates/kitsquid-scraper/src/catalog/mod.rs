//! Catalog scraping: discovery, listing, assembly and detail enrichment.

pub mod assembly;
pub mod categories;
pub mod details;
pub mod faculties;
pub mod listing;
pub mod schema;

pub use assembly::{AssemblyReport, CatalogScraper, EnrichmentReport, EventIndex, FacultyRange};
