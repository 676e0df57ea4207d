//! Catalog record types.
//!
//! `internal_id` (the site-assigned guid) is the only identity key across
//! phases and runs. `catalog_code` is human-facing and may repeat across
//! categories, so it is never used to key a map.

use serde::{Deserialize, Serialize};

/// A top-level faculty from the catalog index. Transient, phase 1 only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faculty {
    pub id: String,
    pub display_name: String,
}

/// One sub-category of a faculty. Transient, phase 1 only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub display_name: String,
    pub parent_faculty_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecturer {
    pub internal_id: String,
    pub name: String,
}

/// One scheduled meeting of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub date_text: String,
    pub room: String,
}

/// Phase 1 output: an event as seen in a category listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStub {
    pub catalog_code: String,
    pub internal_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Category titles ordered broad to narrow.
    pub category_path: Vec<String>,
    pub lecturers: Vec<Lecturer>,
    pub schedule: Vec<ScheduleEntry>,
    pub term_tags: Vec<String>,
}

impl EventStub {
    /// Union another sighting's category path into this one.
    ///
    /// Entries keep their first-seen order and are never duplicated.
    pub fn merge_categories(&mut self, other: &EventStub) {
        union_append(&mut self.category_path, &other.category_path);
    }

    /// Detail page URL for this event under the given catalog base URL.
    pub fn detail_url(&self, base_url: &str) -> String {
        format!(
            "{}/event.asp?gguid={}",
            base_url.trim_end_matches('/'),
            self.internal_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// Phase 2 output: a stub plus sanitized description and links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub stub: EventStub,
    pub description_html: String,
    pub links: Vec<Link>,
}

impl From<EventStub> for EnrichedEvent {
    fn from(stub: EventStub) -> Self {
        Self {
            stub,
            description_html: String::new(),
            links: Vec::new(),
        }
    }
}

/// A record as held by the catalog store.
///
/// `rating` and `inverse_rating` are owned by the review feature; the
/// scraper never derives them and only copies existing values forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEvent {
    #[serde(flatten)]
    pub event: EnrichedEvent,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub inverse_rating: f32,
}

impl PersistedEvent {
    pub fn internal_id(&self) -> &str {
        &self.event.stub.internal_id
    }

    pub fn stub(&self) -> &EventStub {
        &self.event.stub
    }

    pub fn term_tags(&self) -> &[String] {
        &self.event.stub.term_tags
    }

    /// Replace the scraped content with a fresh enrichment while keeping
    /// this record's ratings.
    pub fn with_enrichment(&self, enriched: EnrichedEvent) -> PersistedEvent {
        PersistedEvent {
            event: enriched,
            rating: self.rating,
            inverse_rating: self.inverse_rating,
        }
    }
}

impl From<EnrichedEvent> for PersistedEvent {
    fn from(event: EnrichedEvent) -> Self {
        Self {
            event,
            rating: 0.0,
            inverse_rating: 0.0,
        }
    }
}

impl From<EventStub> for PersistedEvent {
    fn from(stub: EventStub) -> Self {
        EnrichedEvent::from(stub).into()
    }
}

/// Append every entry of `extra` that `target` does not contain yet.
pub fn union_append(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
