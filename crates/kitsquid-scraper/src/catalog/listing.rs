//! Event listing: one category page turned into event stubs.
//!
//! The listing table mixes two row shapes. Rows carrying an `id` attribute
//! describe an event and are read positionally through a [`RowSchema`].
//! Rows without one hold that event's dates and rooms and always belong to
//! the nearest event row above them.

use super::schema::RowSchema;
use crate::acquisition::document::{self, Document};
use crate::acquisition::endpoints::Endpoints;
use crate::acquisition::http_client::HttpClient;
use crate::error::ScrapeError;
use crate::model::{Category, EventStub, Lecturer, ScheduleEntry};
use crate::pool::Job;
use async_trait::async_trait;
use regex::Regex;
use scraper::ElementRef;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

fn page_title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".+: +(.+) +\(.+\)").expect("valid regex"))
}

fn list_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)*\.?\s+").expect("valid regex"))
}

/// Child category named in a listing heading such as
/// `Vorlesungsverzeichnis: 1.2 Vorlesungen (WS 19/20)`.
pub fn heading_category(heading: &str) -> Option<String> {
    let flat = heading.replace('\n', "");
    let caps = page_title_regex().captures(&flat)?;
    let title = caps.get(1)?.as_str().trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// `"1.2 Vorlesungen"` → `"Vorlesungen"`. Digits not followed by
/// whitespace are part of the title.
pub fn strip_list_prefix(title: &str) -> String {
    let title = title.trim();
    let stripped = list_prefix_regex().replace(title, "");
    if stripped.is_empty() {
        title.to_string()
    } else {
        stripped.into_owned()
    }
}

/// Build the broad-to-narrow category path of a listing page.
///
/// Breadcrumbs start at the faculty. The heading names the page's own
/// category and is placed directly after the faculty; without breadcrumbs
/// it stands alone. This mirrors how the catalog renders nested listings
/// and is a heuristic: deeper breadcrumbs end up after the heading.
///
/// A heading that repeats a breadcrumb title stays in the path twice.
/// Merging a cross-listed event's paths only appends titles not yet
/// present.
pub fn assemble_category_path(heading: Option<String>, breadcrumbs: Vec<String>) -> Vec<String> {
    let mut titles = breadcrumbs;
    if let Some(h) = heading {
        let at = titles.len().min(1);
        titles.insert(at, h);
    }
    titles
        .iter()
        .map(|t| strip_list_prefix(t))
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn strip_quotes(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '"' | '„' | '“'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn first_anchor<'a>(cell: ElementRef<'a>) -> Result<Option<ElementRef<'a>>, ScrapeError> {
    Ok(document::select_in(cell, "a")?.into_iter().next())
}

fn extract_code(cell: ElementRef<'_>) -> Result<String, ScrapeError> {
    let code = match first_anchor(cell)? {
        Some(a) => document::trimmed_text(a),
        None => document::trimmed_text(cell),
    };
    if code.is_empty() {
        return Err(ScrapeError::Data("empty catalog code".into()));
    }
    Ok(code)
}

/// Event name and internal id from the title cell.
fn extract_title(cell: ElementRef<'_>) -> Result<(String, String), ScrapeError> {
    let a = first_anchor(cell)?
        .ok_or_else(|| ScrapeError::Parse("title cell has no link".into()))?;
    let (name, guid) = document::anchor_with_guid(a)?;
    Ok((strip_quotes(&name), guid))
}

fn extract_kind(cell: ElementRef<'_>) -> Result<String, ScrapeError> {
    Ok(match first_anchor(cell)? {
        Some(a) => document::trimmed_text(a),
        None => document::trimmed_text(cell),
    })
}

/// Lecturer anchors in order, up to the first one without a guid.
fn extract_lecturers(cell: ElementRef<'_>) -> Result<Vec<Lecturer>, ScrapeError> {
    let mut out = Vec::new();
    for a in document::select_in(cell, "a")? {
        let Some(internal_id) = document::attr(a, "href").and_then(document::extract_guid) else {
            debug!("lecturer list ends at anchor without guid");
            break;
        };
        out.push(Lecturer {
            internal_id,
            name: strip_quotes(&document::text(a)),
        });
    }
    Ok(out)
}

/// Date/room pairs of a continuation row, in document order.
fn extract_schedule(row: ElementRef<'_>) -> Result<Vec<ScheduleEntry>, ScrapeError> {
    let mut out = Vec::new();
    for cell in document::children_with_class(row, "td", "collapsible") {
        let date = document::select_in(cell, "span.date")?.into_iter().next();
        let room = document::select_in(cell, "a.room")?.into_iter().next();
        match (date, room) {
            (Some(d), Some(r)) => out.push(ScheduleEntry {
                date_text: document::trimmed_text(d),
                room: document::trimmed_text(r),
            }),
            _ => debug!("schedule cell without date or room"),
        }
    }
    Ok(out)
}

fn parse_event_row(
    cells: &[ElementRef<'_>],
    schema: &RowSchema,
    category_path: &[String],
    term_label: &str,
) -> Result<EventStub, ScrapeError> {
    schema.validate(cells.len())?;
    let catalog_code = extract_code(cells[schema.code])?;
    let (name, internal_id) = extract_title(cells[schema.title])?;
    let kind = extract_kind(cells[schema.kind])?;
    let lecturers = extract_lecturers(cells[schema.lecturers])?;
    let term_tags = if term_label.is_empty() {
        Vec::new()
    } else {
        vec![term_label.to_string()]
    };
    Ok(EventStub {
        catalog_code,
        internal_id,
        name,
        kind,
        category_path: category_path.to_vec(),
        lecturers,
        schedule: Vec::new(),
        term_tags,
    })
}

/// Parse a listing page into stubs, in row order.
///
/// Malformed rows are logged and skipped. Only a missing or broken page
/// structure is an error.
pub fn parse_listing(
    body: &str,
    schema: &RowSchema,
    term_label: &str,
) -> Result<Vec<EventStub>, ScrapeError> {
    let doc = Document::parse(body);

    let heading = doc
        .first("h1.pagetitle")?
        .map(document::text)
        .filter(|t| !t.trim().is_empty())
        .and_then(|t| {
            let found = heading_category(&t);
            if found.is_none() {
                warn!("unrecognized listing heading {:?}", t.trim());
            }
            found
        });
    let breadcrumbs: Vec<String> = doc
        .all("li.breadcrumb-item > a")?
        .into_iter()
        .skip(1)
        .filter_map(|a| document::attr(a, "title"))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    let category_path = assemble_category_path(heading, breadcrumbs);

    let mut events: Vec<EventStub> = Vec::new();
    let mut current: Option<usize> = None;
    let mut event_rows = 0usize;
    let mut observed_widths = BTreeSet::new();

    for (i, row) in doc
        .all("table#EVENTLIST > tbody.tablecontent > tr")?
        .into_iter()
        .enumerate()
    {
        let is_event_row = document::attr(row, "id").is_some_and(|id| !id.is_empty());
        if is_event_row {
            event_rows += 1;
            current = None;
            let cells = document::children_named(row, "td");
            observed_widths.insert(cells.len());
            match parse_event_row(&cells, schema, &category_path, term_label) {
                Ok(stub) => {
                    events.push(stub);
                    current = Some(events.len() - 1);
                }
                Err(e) => warn!("skipping row {i}: {e}"),
            }
        } else {
            let Some(idx) = current else {
                warn!("skipping row {i}: schedule row without a preceding event");
                continue;
            };
            let entries = extract_schedule(row)?;
            events[idx].schedule.extend(entries);
        }
    }

    if event_rows > 0 && !observed_widths.contains(&schema.column_count) {
        warn!(
            "possible listing schema drift: saw rows of {:?} cells, schema {:?} expects {}",
            observed_widths, schema.version, schema.column_count
        );
    }

    Ok(events)
}

/// Fetch one category's listing.
pub struct ListEventsJob {
    pub client: HttpClient,
    pub endpoints: Arc<Endpoints>,
    pub term_token: String,
    pub term_label: String,
    pub category: Category,
    pub schema: RowSchema,
}

#[async_trait]
impl Job for ListEventsJob {
    type Output = Vec<EventStub>;

    fn label(&self) -> String {
        format!("listing {} ({})", self.category.display_name, self.category.id)
    }

    async fn run(self) -> Result<Vec<EventStub>, ScrapeError> {
        let url = self
            .endpoints
            .field_listing(&self.term_token, &self.category.id)?;
        let body = self.client.get_text(&url).await?;
        let events = parse_listing(&body, &self.schema, &self.term_label)?;
        debug!("{} events in {}", events.len(), self.category.display_name);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::RowSchemaVersion;

    fn event_row(id: &str, code: &str, title: &str, lecturers: &str) -> String {
        format!(
            r#"<tr id="{id}"><td></td><td><a href="event.asp?gguid={id}">{code}</a></td>
            <td><a href="event.asp?gguid={id}&amp;tguid=0xT">{title}</a></td>
            <td>{lecturers}</td><td><a href="/">Vorlesung (V)</a></td>
            <td>2</td><td></td><td></td></tr>"#
        )
    }

    fn page(heading: &str, crumbs: &[&str], rows: &str) -> String {
        let crumbs: String = crumbs
            .iter()
            .map(|c| format!(r#"<li class="breadcrumb-item"><a href="x" title="{c}">{c}</a></li>"#))
            .collect();
        format!(
            r#"<html><body><ol>{crumbs}</ol><h1 class="pagetitle">{heading}</h1>
            <table id="EVENTLIST"><tbody class="tablecontent">{rows}</tbody></table></body></html>"#
        )
    }

    const SCHEDULE_ROW: &str = r#"<tr><td></td>
        <td class="collapsible"><span class="date">Mo 14:00-15:30</span> <a class="room" href="/">50.34 HS -101</a></td>
        <td class="collapsible"><span class="date">Do 09:45-11:15</span> <a class="room" href="/">30.22 Gaede</a></td>
        </tr>"#;

    #[test]
    fn test_event_row_with_schedule() {
        let rows = format!(
            "{}{}",
            event_row(
                "0xE1",
                "2400011",
                "\u{201e}Theoretische Grundlagen\u{201c}",
                r#"<a href="person.asp?gguid=0xL1">Prof. A</a>, <a href="person.asp?gguid=0xL2">Dr. B</a>"#
            ),
            SCHEDULE_ROW
        );
        let body = page(
            "Vorlesungsverzeichnis: 1.2 Vorlesungen (WS 19/20)",
            &["Start", "Informatik"],
            &rows,
        );
        let events = parse_listing(&body, &RowSchema::default(), "WS 19/20").unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.catalog_code, "2400011");
        assert_eq!(e.internal_id, "0xE1");
        assert_eq!(e.name, "Theoretische Grundlagen");
        assert_eq!(e.kind, "Vorlesung (V)");
        assert_eq!(e.term_tags, vec!["WS 19/20"]);
        assert_eq!(e.category_path, vec!["Informatik", "Vorlesungen"]);
        assert_eq!(e.lecturers.len(), 2);
        assert_eq!(e.lecturers[1].internal_id, "0xL2");
        assert_eq!(
            e.schedule,
            vec![
                ScheduleEntry {
                    date_text: "Mo 14:00-15:30".into(),
                    room: "50.34 HS -101".into()
                },
                ScheduleEntry {
                    date_text: "Do 09:45-11:15".into(),
                    room: "30.22 Gaede".into()
                },
            ]
        );
    }

    #[test]
    fn test_lecturers_stop_at_anchor_without_guid() {
        let rows = event_row(
            "0xE1",
            "1",
            "T",
            r#"<a href="person.asp?gguid=0xL1">A</a><a href="mailto:x">B</a><a href="person.asp?gguid=0xL3">C</a>"#,
        );
        let events = parse_listing(&page("", &[], &rows), &RowSchema::default(), "").unwrap();
        assert_eq!(events[0].lecturers.len(), 1);
        assert!(events[0].term_tags.is_empty());
    }

    #[test]
    fn test_wrong_width_row_is_skipped_with_its_schedule() {
        let short = r#"<tr id="0xBAD"><td></td><td><a href="event.asp?gguid=0xBAD">9</a></td></tr>"#;
        let rows = format!(
            "{}{}{short}{SCHEDULE_ROW}",
            event_row("0xE1", "1", "Eins", ""),
            SCHEDULE_ROW
        );
        let events = parse_listing(&page("", &[], &rows), &RowSchema::default(), "").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].schedule.len(), 2);
    }

    #[test]
    fn test_row_without_guid_is_skipped() {
        let rows = r#"<tr id="r1"><td></td><td><a>1</a></td><td><a href="event.asp">T</a></td>
            <td></td><td><a>V</a></td><td></td><td></td><td></td></tr>"#;
        let events = parse_listing(&page("", &[], rows), &RowSchema::default(), "").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_orphan_schedule_row_is_skipped() {
        let rows = format!("{SCHEDULE_ROW}{}", event_row("0xE1", "1", "Eins", ""));
        let events = parse_listing(&page("", &[], &rows), &RowSchema::default(), "").unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].schedule.is_empty());
    }

    #[test]
    fn test_v1_schema_reads_six_columns() {
        let row = r#"<tr id="0xE6"><td></td><td><a href="/">77</a></td>
            <td><a href="event.asp?gguid=0xE6">Alt</a></td><td></td><td><a>Übung (Ü)</a></td><td></td></tr>"#;
        let v1 = RowSchema::for_version(RowSchemaVersion::V1);
        let events = parse_listing(&page("", &[], row), &v1, "SS 19").unwrap();
        assert_eq!(events[0].internal_id, "0xE6");
        assert_eq!(events[0].kind, "Übung (Ü)");
        assert!(parse_listing(&page("", &[], row), &RowSchema::default(), "")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_heading_splice_with_breadcrumbs() {
        let path = assemble_category_path(
            Some("3 Wahlpflicht".into()),
            vec!["Informatik".into(), "2 Master".into()],
        );
        assert_eq!(path, vec!["Informatik", "Wahlpflicht", "Master"]);
    }

    #[test]
    fn test_heading_repeating_a_breadcrumb_is_kept() {
        let path = assemble_category_path(
            Some("1 Vorlesungen".into()),
            vec!["Physik".into(), "1 Vorlesungen".into()],
        );
        assert_eq!(path, vec!["Physik", "Vorlesungen", "Vorlesungen"]);
    }

    #[test]
    fn test_heading_without_breadcrumbs() {
        assert_eq!(
            assemble_category_path(Some("Vorlesungen".into()), vec![]),
            vec!["Vorlesungen"]
        );
    }

    #[test]
    fn test_breadcrumbs_without_heading() {
        assert_eq!(
            assemble_category_path(None, vec!["Physik".into(), "1.1 Grundlagen".into()]),
            vec!["Physik", "Grundlagen"]
        );
    }

    #[test]
    fn test_heading_category() {
        assert_eq!(
            heading_category("Vorlesungsverzeichnis: 1.2 Vorlesungen (WS 19/20)").as_deref(),
            Some("1.2 Vorlesungen")
        );
        assert_eq!(heading_category("Vorlesungsverzeichnis"), None);
    }

    #[test]
    fn test_strip_list_prefix() {
        assert_eq!(strip_list_prefix("1.2 Vorlesungen"), "Vorlesungen");
        assert_eq!(strip_list_prefix("3. Seminare"), "Seminare");
        assert_eq!(strip_list_prefix("3D Modelling"), "3D Modelling");
        assert_eq!(strip_list_prefix("42"), "42");
    }
}
