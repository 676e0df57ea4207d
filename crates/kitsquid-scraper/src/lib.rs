// Copyright 2026 Kitsquid Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kitsquid catalog scraper.
//!
//! Discovers a university's lecture catalog for one term (faculties,
//! categories, event listings), enriches each event from its detail page
//! and merges the result into a local store without losing ratings or
//! previously recorded terms.

pub mod acquisition;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pool;
pub mod progress;
pub mod sanitize;
pub mod store;
pub mod terms;

pub use catalog::{CatalogScraper, FacultyRange};
pub use config::ScrapeConfig;
pub use error::{ErrorKind, ScrapeError, StoreError};
