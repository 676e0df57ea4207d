//! Merge rules applied before a record is written.

use crate::error::StoreError;
use crate::model::{union_append, PersistedEvent};

/// How a write treats an existing record with the same `internal_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Fail if the record exists.
    Insert,
    /// Merge with the existing record: ratings carried forward, term tags
    /// unioned.
    #[default]
    Upsert,
    /// Replace the existing record verbatim.
    Overwrite,
}

impl WriteMode {
    /// Map the `(upsert, overwrite)` flag pair. `overwrite` only has an
    /// effect together with `upsert`.
    pub fn from_flags(upsert: bool, overwrite: bool) -> Self {
        match (upsert, overwrite) {
            (false, _) => WriteMode::Insert,
            (true, false) => WriteMode::Upsert,
            (true, true) => WriteMode::Overwrite,
        }
    }
}

/// Merge an incoming record over the persisted one.
pub fn merge_for_upsert(incoming: PersistedEvent, existing: &PersistedEvent) -> PersistedEvent {
    let mut merged = incoming;
    merged.rating = existing.rating;
    merged.inverse_rating = existing.inverse_rating;
    union_append(&mut merged.event.stub.term_tags, existing.term_tags());
    merged
}

/// The record to write for `incoming` given what is stored.
pub fn resolve_write(
    incoming: PersistedEvent,
    existing: Option<&PersistedEvent>,
    mode: WriteMode,
) -> Result<PersistedEvent, StoreError> {
    match (existing, mode) {
        (None, _) => Ok(incoming),
        (Some(_), WriteMode::Insert) => {
            Err(StoreError::AlreadyExists(incoming.internal_id().to_string()))
        }
        (Some(old), WriteMode::Upsert) => Ok(merge_for_upsert(incoming, old)),
        (Some(_), WriteMode::Overwrite) => Ok(incoming),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventStub;

    fn record(id: &str, tags: &[&str], rating: f32) -> PersistedEvent {
        let mut rec = PersistedEvent::from(EventStub {
            internal_id: id.into(),
            term_tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        });
        rec.rating = rating;
        rec.inverse_rating = -rating;
        rec
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(WriteMode::from_flags(false, false), WriteMode::Insert);
        assert_eq!(WriteMode::from_flags(false, true), WriteMode::Insert);
        assert_eq!(WriteMode::from_flags(true, false), WriteMode::Upsert);
        assert_eq!(WriteMode::from_flags(true, true), WriteMode::Overwrite);
    }

    #[test]
    fn test_upsert_keeps_ratings() {
        let old = record("0x1", &["WS 19/20"], 4.0);
        let new = record("0x1", &["WS 19/20"], 1.0);
        let merged = resolve_write(new, Some(&old), WriteMode::Upsert).unwrap();
        assert_eq!(merged.rating, 4.0);
        assert_eq!(merged.inverse_rating, -4.0);
    }

    #[test]
    fn test_term_union_is_idempotent() {
        let old = record("0x1", &["WS 19/20"], 0.0);
        let same = merge_for_upsert(record("0x1", &["WS 19/20"], 0.0), &old);
        assert_eq!(same.term_tags(), ["WS 19/20"]);

        let next = merge_for_upsert(record("0x1", &["SS 20"], 0.0), &old);
        assert_eq!(next.term_tags(), ["SS 20", "WS 19/20"]);
    }

    #[test]
    fn test_overwrite_is_verbatim() {
        let old = record("0x1", &["WS 18/19"], 5.0);
        let new = record("0x1", &["WS 19/20"], 0.0);
        let written = resolve_write(new.clone(), Some(&old), WriteMode::Overwrite).unwrap();
        assert_eq!(written, new);
    }

    #[test]
    fn test_insert_conflict() {
        let old = record("0x1", &[], 0.0);
        let err = resolve_write(old.clone(), Some(&old), WriteMode::Insert).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "0x1"));
        assert!(resolve_write(old, None, WriteMode::Insert).is_ok());
    }
}
