//! Faculty discovery: the catalog index for one term.

use crate::acquisition::document::{self, Document};
use crate::acquisition::endpoints::Endpoints;
use crate::acquisition::http_client::HttpClient;
use crate::error::ScrapeError;
use crate::model::Faculty;
use crate::terms::TermTag;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacultyIndex {
    /// Canonical term label from the page heading, if recognizable.
    pub term_label: Option<String>,
    pub faculties: Vec<Faculty>,
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".+ \((.+)\)").expect("valid regex"))
}

/// Term label from a heading such as `Vorlesungsverzeichnis (WS 19/20)`.
pub fn term_label_from_heading(heading: &str) -> Option<String> {
    let caps = heading_regex().captures(heading.trim())?;
    TermTag::parse(caps.get(1)?.as_str()).map(|t| t.label().to_string())
}

/// Parse the faculty index page.
pub fn parse_faculties(body: &str) -> Result<FacultyIndex, ScrapeError> {
    let doc = Document::parse(body);

    let term_label = match doc.first("h1.pagetitle")? {
        Some(h1) => {
            let heading = document::trimmed_text(h1);
            let label = term_label_from_heading(&heading);
            if label.is_none() {
                warn!("no term label in heading {heading:?}");
            }
            label
        }
        None => {
            warn!("faculty index has no page title");
            None
        }
    };

    let mut faculties = Vec::new();
    for a in doc.all("table#tableVVZ tbody.tablecontent a")? {
        match document::anchor_with_guid(a) {
            Ok((display_name, id)) => faculties.push(Faculty { id, display_name }),
            Err(e) => warn!("skipping faculty anchor: {e}"),
        }
    }
    Ok(FacultyIndex {
        term_label,
        faculties,
    })
}

/// Fetch and parse the faculty index for a resolved term token.
pub async fn discover_faculties(
    client: &HttpClient,
    endpoints: &Endpoints,
    term_token: &str,
) -> Result<FacultyIndex, ScrapeError> {
    let url = endpoints.faculties(term_token)?;
    let body = client.get_text(&url).await?;
    let index = parse_faculties(&body)?;
    debug!(
        "{} faculties for term {:?}",
        index.faculties.len(),
        index.term_label
    );
    Ok(index)
}
