//! Phase orchestration.
//!
//! Phase 1 resolves the term, reads the faculty index, walks each selected
//! faculty's categories one after another and then fans the category
//! listings out over the bounded executor. Stubs seen under several
//! categories collapse into one record keyed by `internal_id`.
//!
//! Phase 2 enriches a list of stubs through the same executor.

use super::categories::discover_categories;
use super::details::EnrichEventJob;
use super::faculties::discover_faculties;
use super::listing::ListEventsJob;
use super::schema::RowSchema;
use crate::acquisition::endpoints::Endpoints;
use crate::acquisition::http_client::HttpClient;
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::model::{EnrichedEvent, EventStub, PersistedEvent};
use crate::pool::BoundedExecutor;
use crate::progress::{Phase, ProgressEventKind, ProgressReporter};
use crate::terms::{normalize_tag, TermResolver};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Identity map of stubs, keyed by `internal_id`.
#[derive(Debug, Default)]
pub struct EventIndex {
    events: HashMap<String, EventStub>,
    sightings: usize,
}

impl EventIndex {
    /// Add one sighting. A known id only contributes new category entries.
    pub fn merge(&mut self, stub: EventStub) {
        self.sightings += 1;
        match self.events.get_mut(&stub.internal_id) {
            Some(known) => known.merge_categories(&stub),
            None => {
                self.events.insert(stub.internal_id.clone(), stub);
            }
        }
    }

    pub fn merge_all(&mut self, stubs: Vec<EventStub>) {
        for stub in stubs {
            self.merge(stub);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Rows merged so far, duplicates included.
    pub fn sightings(&self) -> usize {
        self.sightings
    }

    pub fn get(&self, internal_id: &str) -> Option<&EventStub> {
        self.events.get(internal_id)
    }

    /// All stubs ordered by `(catalog_code, internal_id)`.
    pub fn into_sorted(self) -> Vec<EventStub> {
        let mut out: Vec<EventStub> = self.events.into_values().collect();
        out.sort_by(|a, b| {
            a.catalog_code
                .cmp(&b.catalog_code)
                .then_with(|| a.internal_id.cmp(&b.internal_id))
        });
        out
    }
}

/// Half-open faculty index range `[from, to)`; open ends mean "all".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacultyRange {
    pub from: Option<usize>,
    pub to: Option<usize>,
}

impl FacultyRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(from: Option<usize>, to: Option<usize>) -> Self {
        Self { from, to }
    }

    /// Concrete bounds for `len` faculties, never out of range.
    pub fn clamp(&self, len: usize) -> Range<usize> {
        let from = self.from.unwrap_or(0).min(len);
        let to = self.to.unwrap_or(len).min(len).max(from);
        from..to
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub term_label: String,
    pub events: Vec<EventStub>,
    pub faculties: usize,
    pub categories: usize,
    /// Listing rows parsed before deduplication.
    pub sightings: usize,
    pub failed_categories: usize,
    pub failed_listings: usize,
    pub skipped_listings: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// One slot per input event, in input order; `None` where enrichment
    /// failed or never ran.
    pub slots: Vec<Option<EnrichedEvent>>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl EnrichmentReport {
    pub fn enriched(self) -> Vec<EnrichedEvent> {
        self.slots.into_iter().flatten().collect()
    }
}

pub struct CatalogScraper {
    client: HttpClient,
    endpoints: Arc<Endpoints>,
    executor: BoundedExecutor,
    schema: RowSchema,
    resolver: Arc<dyn TermResolver>,
    progress: ProgressReporter,
}

impl CatalogScraper {
    pub fn new(config: &ScrapeConfig, resolver: Arc<dyn TermResolver>) -> Self {
        Self {
            client: HttpClient::new(config.timeout_ms),
            endpoints: Arc::new(Endpoints::new(config)),
            executor: BoundedExecutor::new(config.max_workers),
            schema: RowSchema::for_version(config.row_schema),
            resolver,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.executor = self.executor.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn executor(&self) -> &BoundedExecutor {
        &self.executor
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Log a non-fatal problem and forward it to progress listeners.
    fn warn(&self, message: String) {
        warn!("{message}");
        self.progress.emit(ProgressEventKind::Warning { message });
    }

    /// Phase 1: discover every event of `term` below the selected faculties.
    ///
    /// Term resolution and faculty discovery failures end the run. Category
    /// and listing failures only lose that part of the catalog.
    pub async fn discover_events(
        &self,
        term: &str,
        range: FacultyRange,
    ) -> Result<AssemblyReport, ScrapeError> {
        let token = self.resolver.resolve(term).await?;
        info!("scraping events for term {term} (token {token})");

        let start = Instant::now();
        self.progress.emit(ProgressEventKind::PhaseStarted {
            phase: Phase::Faculties,
            jobs: 1,
        });
        let index = discover_faculties(&self.client, &self.endpoints, &token).await?;
        let term_label = match index.term_label.clone() {
            Some(label) => label,
            None => {
                let fallback = normalize_tag(term);
                self.warn(format!("faculty index carries no term label, using {fallback}"));
                fallback
            }
        };
        let span = range.clamp(index.faculties.len());
        let selected = &index.faculties[span.clone()];
        info!(
            "{} faculties, scraping {}..{} ({})",
            index.faculties.len(),
            span.start,
            span.end,
            selected.len()
        );
        self.progress.emit(ProgressEventKind::PhaseCompleted {
            phase: Phase::Faculties,
            succeeded: 1,
            failed: 0,
            skipped: 0,
            elapsed_ms: start.elapsed().as_millis() as u64,
        });

        let start = Instant::now();
        self.progress.emit(ProgressEventKind::PhaseStarted {
            phase: Phase::Categories,
            jobs: selected.len(),
        });
        let mut categories = Vec::new();
        let mut failed_categories = 0usize;
        for faculty in selected {
            match discover_categories(&self.client, &self.endpoints, &token, faculty).await {
                Ok(found) => categories.extend(found),
                Err(e) => {
                    self.warn(format!("categories of {} failed: {e}", faculty.display_name));
                    failed_categories += 1;
                }
            }
        }
        self.progress.emit(ProgressEventKind::PhaseCompleted {
            phase: Phase::Categories,
            succeeded: selected.len() - failed_categories,
            failed: failed_categories,
            skipped: 0,
            elapsed_ms: start.elapsed().as_millis() as u64,
        });
        let category_count = categories.len();

        let jobs: Vec<ListEventsJob> = categories
            .into_iter()
            .map(|category| ListEventsJob {
                client: self.client.clone(),
                endpoints: Arc::clone(&self.endpoints),
                term_token: token.clone(),
                term_label: term_label.clone(),
                category,
                schema: self.schema,
            })
            .collect();
        let outcome = self
            .executor
            .run_all(
                Phase::Listings,
                jobs,
                EventIndex::default(),
                |index: &mut EventIndex, stubs: Vec<EventStub>| index.merge_all(stubs),
            )
            .await;

        let sightings = outcome.value.sightings();
        let events = outcome.value.into_sorted();
        info!(
            "found {} events ({sightings} listing rows) in {category_count} categories",
            events.len()
        );
        Ok(AssemblyReport {
            term_label,
            events,
            faculties: selected.len(),
            categories: category_count,
            sightings,
            failed_categories,
            failed_listings: outcome.failed,
            skipped_listings: outcome.skipped,
        })
    }

    /// Phase 2 for freshly discovered stubs.
    pub async fn enrich_events(&self, stubs: Vec<EventStub>) -> EnrichmentReport {
        self.run_enrichment(stubs.into_iter().map(|s| (s, String::new())).collect())
            .await
    }

    /// Phase 2 for stored records. Each record's current description is
    /// compared against the fresh one to flag lost descriptions.
    pub async fn enrich_records(&self, records: &[PersistedEvent]) -> EnrichmentReport {
        self.run_enrichment(
            records
                .iter()
                .map(|r| (r.stub().clone(), r.event.description_html.clone()))
                .collect(),
        )
        .await
    }

    async fn run_enrichment(&self, inputs: Vec<(EventStub, String)>) -> EnrichmentReport {
        let n = inputs.len();
        let jobs: Vec<EnrichEventJob> = inputs
            .into_iter()
            .enumerate()
            .map(|(slot, (stub, previous_description))| EnrichEventJob {
                client: self.client.clone(),
                endpoints: Arc::clone(&self.endpoints),
                slot,
                stub,
                previous_description,
            })
            .collect();
        let slots: Vec<Option<EnrichedEvent>> = (0..n).map(|_| None).collect();
        let outcome = self
            .executor
            .run_all(
                Phase::Details,
                jobs,
                slots,
                |slots: &mut Vec<Option<EnrichedEvent>>, (slot, event): (usize, EnrichedEvent)| {
                    if let Some(s) = slots.get_mut(slot) {
                        *s = Some(event);
                    }
                },
            )
            .await;
        info!(
            "enriched {} of {n} events ({} failed, {} skipped)",
            outcome.succeeded, outcome.failed, outcome.skipped
        );
        EnrichmentReport {
            slots: outcome.value,
            succeeded: outcome.succeeded,
            failed: outcome.failed,
            skipped: outcome.skipped,
        }
    }
}
