//! CLI handlers for `events`, `details` and `run`.

use crate::catalog::{AssemblyReport, CatalogScraper, FacultyRange};
use crate::cli::output;
use crate::cli::session::Session;
use crate::cli::spinner::ProgressView;
use crate::progress::{self, ProgressReporter};
use crate::store::{self, PersistSummary};
use crate::terms::{normalize_tag, StaticTermResolver};
use anyhow::{Context, Result};
use std::sync::Arc;

fn scraper(session: &Session, reporter: ProgressReporter) -> CatalogScraper {
    let resolver = Arc::new(StaticTermResolver::new(session.config.terms.clone()));
    CatalogScraper::new(&session.config, resolver).with_progress(reporter)
}

async fn discover(session: &Session, term: &str, range: FacultyRange) -> Result<AssemblyReport> {
    let (tx, rx) = progress::channel();
    let view = ProgressView::start(rx);
    let scraper = scraper(session, ProgressReporter::new(Some(tx)));
    let report = scraper.discover_events(term, range).await;
    drop(scraper);
    view.finish().await;
    report.with_context(|| format!("failed to scrape events for {term}"))
}

struct DetailsOutcome {
    total: usize,
    enriched: usize,
    failed: usize,
    skipped: usize,
    stored: PersistSummary,
}

async fn enrich(session: &Session, term: &str) -> Result<DetailsOutcome> {
    let store = session.open_store()?;
    let records = store.find_by_term(term)?;
    if records.is_empty() {
        return Ok(DetailsOutcome {
            total: 0,
            enriched: 0,
            failed: 0,
            skipped: 0,
            stored: PersistSummary::default(),
        });
    }

    let (tx, rx) = progress::channel();
    let view = ProgressView::start(rx);
    let scraper = scraper(session, ProgressReporter::new(Some(tx)));
    let report = scraper.enrich_records(&records).await;
    drop(scraper);
    view.finish().await;

    let outcome = DetailsOutcome {
        total: records.len(),
        enriched: report.succeeded,
        failed: report.failed,
        skipped: report.skipped,
        stored: PersistSummary::default(),
    };
    let stored = store::persist_enriched(&store, report.enriched());
    Ok(DetailsOutcome { stored, ..outcome })
}

/// Phase 1: discover events and upsert them as one batch.
pub async fn run_events(
    session: &Session,
    term: &str,
    from: Option<usize>,
    to: Option<usize>,
) -> Result<()> {
    events_phase(session, term, from, to).await.map(|_| ())
}

/// Returns the term label the stored events were tagged with.
async fn events_phase(
    session: &Session,
    term: &str,
    from: Option<usize>,
    to: Option<usize>,
) -> Result<String> {
    let report = discover(session, term, FacultyRange::new(from, to)).await?;
    let store = session.open_store()?;
    let written = store::persist_stubs(&store, &report.events)
        .context("failed to store events, batch rolled back")?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "term": report.term_label,
            "faculties": report.faculties,
            "categories": report.categories,
            "rows": report.sightings,
            "events": report.events.len(),
            "failedCategories": report.failed_categories,
            "failedListings": report.failed_listings,
            "skippedListings": report.skipped_listings,
            "written": written,
        }));
    } else if !output::is_quiet() {
        println!("  Term {}:", report.term_label);
        println!("    Faculties:   {}", report.faculties);
        println!(
            "    Categories:  {} ({} failed)",
            report.categories, report.failed_categories
        );
        println!(
            "    Events:      {} unique from {} rows ({} listings failed)",
            report.events.len(),
            report.sightings,
            report.failed_listings
        );
        println!("    Stored:      {written}");
    }
    Ok(report.term_label)
}

/// Phase 2: enrich stored events of a term and overwrite them one by one.
pub async fn run_details(session: &Session, term: &str) -> Result<()> {
    let tag = normalize_tag(term);
    let outcome = enrich(session, &tag).await?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "term": tag,
            "events": outcome.total,
            "enriched": outcome.enriched,
            "failed": outcome.failed,
            "skipped": outcome.skipped,
            "written": outcome.stored.written,
            "writeFailures": outcome.stored.failed,
        }));
    } else if !output::is_quiet() {
        if outcome.total == 0 {
            println!("  No stored events for {tag}. Run `kitsquid-scrape events {tag}` first.");
            return Ok(());
        }
        println!("  Term {tag}:");
        println!(
            "    Enriched:  {} of {} ({} failed, {} skipped)",
            outcome.enriched, outcome.total, outcome.failed, outcome.skipped
        );
        println!(
            "    Stored:    {} ({} failed)",
            outcome.stored.written, outcome.stored.failed
        );
    }
    Ok(())
}

/// Both phases back to back.
pub async fn run_all(
    session: &Session,
    term: &str,
    from: Option<usize>,
    to: Option<usize>,
) -> Result<()> {
    let label = events_phase(session, term, from, to).await?;
    run_details(session, &label).await
}
