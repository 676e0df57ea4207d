//! Merge-upsert persistence for scraped events.

pub mod merge;
pub mod migrations;
pub mod sqlite;

pub use merge::{merge_for_upsert, WriteMode};
pub use sqlite::SqliteEventStore;

use crate::error::StoreError;
use crate::model::{EnrichedEvent, EventStub, PersistedEvent};
use tracing::warn;

/// Store phase 1 output as one upsert batch.
pub fn persist_stubs(store: &SqliteEventStore, stubs: &[EventStub]) -> Result<usize, StoreError> {
    store.insert_multi(
        stubs.iter().cloned().map(PersistedEvent::from).collect(),
        WriteMode::Upsert,
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub written: usize,
    pub failed: usize,
}

/// Store phase 2 output record by record with overwrite semantics.
///
/// Ratings of an existing record are copied onto the enriched one before
/// writing. A failing record is logged and counted; the rest are still
/// written.
pub fn persist_enriched(store: &SqliteEventStore, events: Vec<EnrichedEvent>) -> PersistSummary {
    let mut summary = PersistSummary::default();
    for event in events {
        let id = event.stub.internal_id.clone();
        let result = store.get(&id).and_then(|existing| {
            let record = match existing {
                Some(old) => old.with_enrichment(event),
                None => PersistedEvent::from(event),
            };
            store.insert(record, WriteMode::Overwrite)
        });
        match result {
            Ok(_) => summary.written += 1,
            Err(e) => {
                warn!("failed to store details of {id}: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}
