//! Offline migrations over stored records.
//!
//! Each migration rewrites the affected records in one transaction with
//! [`WriteMode::Overwrite`] and is then recorded in the `migrations` table
//! so it runs once per store.

use super::merge::WriteMode;
use super::sqlite::SqliteEventStore;
use crate::catalog::listing::strip_quotes;
use crate::error::StoreError;
use crate::model::PersistedEvent;
use crate::sanitize::sanitize_description;
use crate::terms::normalize_tag;
use tracing::info;

pub trait Migration {
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Apply the migration, returning the number of records rewritten.
    fn run(&self, store: &SqliteEventStore) -> Result<usize, StoreError>;
}

/// Rewrite term tags in canonical spelling (`WS19/20` → `WS 19/20`).
pub struct NormalizeTermTags;

impl Migration for NormalizeTermTags {
    fn id(&self) -> &'static str {
        "01_normalize_term_tags"
    }

    fn description(&self) -> &'static str {
        "normalize term tag spelling"
    }

    fn run(&self, store: &SqliteEventStore) -> Result<usize, StoreError> {
        let changed: Vec<PersistedEvent> = store
            .all()?
            .into_iter()
            .filter_map(|mut rec| {
                let mut tags: Vec<String> = Vec::new();
                for t in rec.term_tags() {
                    let n = normalize_tag(t);
                    if !tags.contains(&n) {
                        tags.push(n);
                    }
                }
                if tags.as_slice() == rec.term_tags() {
                    return None;
                }
                rec.event.stub.term_tags = tags;
                Some(rec)
            })
            .collect();
        store.insert_multi(changed, WriteMode::Overwrite)
    }
}

/// Drop stray quote characters from event and lecturer names.
pub struct StripNameQuotes;

impl Migration for StripNameQuotes {
    fn id(&self) -> &'static str {
        "03_strip_name_quotes"
    }

    fn description(&self) -> &'static str {
        "strip quotes from event and lecturer names"
    }

    fn run(&self, store: &SqliteEventStore) -> Result<usize, StoreError> {
        let changed: Vec<PersistedEvent> = store
            .all()?
            .into_iter()
            .filter_map(|mut rec| {
                let stub = &mut rec.event.stub;
                let name = strip_quotes(&stub.name);
                let mut dirty = name != stub.name;
                stub.name = name;
                for lecturer in &mut stub.lecturers {
                    let clean = strip_quotes(&lecturer.name);
                    if clean != lecturer.name {
                        lecturer.name = clean;
                        dirty = true;
                    }
                }
                dirty.then_some(rec)
            })
            .collect();
        store.insert_multi(changed, WriteMode::Overwrite)
    }
}

/// Re-run the description allow-list over stored descriptions.
pub struct SanitizeDescriptions;

impl Migration for SanitizeDescriptions {
    fn id(&self) -> &'static str {
        "04_sanitize_descriptions"
    }

    fn description(&self) -> &'static str {
        "sanitize stored description html"
    }

    fn run(&self, store: &SqliteEventStore) -> Result<usize, StoreError> {
        let changed: Vec<PersistedEvent> = store
            .all()?
            .into_iter()
            .filter(|rec| !rec.event.description_html.is_empty())
            .filter_map(|mut rec| {
                let clean = sanitize_description(&rec.event.description_html);
                if clean == rec.event.description_html {
                    return None;
                }
                rec.event.description_html = clean;
                Some(rec)
            })
            .collect();
        store.insert_multi(changed, WriteMode::Overwrite)
    }
}

pub fn registered() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(NormalizeTermTags),
        Box::new(StripNameQuotes),
        Box::new(SanitizeDescriptions),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub id: &'static str,
    pub rewritten: usize,
}

/// Run every registered migration the store has not seen yet, in order.
/// Stops at the first failure; earlier migrations stay applied.
pub fn run_pending(store: &SqliteEventStore) -> Result<Vec<MigrationOutcome>, StoreError> {
    let mut outcomes = Vec::new();
    for m in registered() {
        if store.has_migration(m.id())? {
            continue;
        }
        info!("running migration {} ({})", m.id(), m.description());
        let rewritten = m.run(store)?;
        store.record_migration(m.id())?;
        info!("migration {} rewrote {rewritten} records", m.id());
        outcomes.push(MigrationOutcome {
            id: m.id(),
            rewritten,
        });
    }
    Ok(outcomes)
}

/// Sanitize every stored description now, applied or not.
pub fn run_backfill(store: &SqliteEventStore) -> Result<usize, StoreError> {
    let rewritten = SanitizeDescriptions.run(store)?;
    info!("html backfill rewrote {rewritten} records");
    Ok(rewritten)
}
