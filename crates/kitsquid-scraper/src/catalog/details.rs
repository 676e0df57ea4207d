//! Detail enrichment: description and links for one event.

use crate::acquisition::document::{self, Document};
use crate::acquisition::endpoints::Endpoints;
use crate::acquisition::http_client::HttpClient;
use crate::error::ScrapeError;
use crate::model::{EnrichedEvent, EventStub, Link};
use crate::pool::Job;
use crate::sanitize::sanitize_description;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub const CATALOG_LINK_LABEL: &str = "VVZ";
pub const EXTERNAL_LINK_LABEL: &str = "Link";
pub const INTEGRATION_LINK_LABEL: &str = "ILIAS";

/// Labeled sub-sections concatenated into the second description candidate.
const SECTIONS: [(&str, &str); 4] = [
    ("div#rwev_aim", "Lernziele"),
    ("div#rwev_learningcontent", "Lehrinhalt"),
    ("div#rwev_prereq", "Voraussetzungen"),
    ("div#rwev_workload", "Arbeitsaufwand"),
];

/// Raw fields of an event detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    pub note: String,
    pub sections: String,
    pub permalink: Option<String>,
    pub external_link: Option<String>,
}

impl DetailPage {
    /// The longer candidate by character count; ties go to the sections.
    pub fn raw_description(&self) -> &str {
        if self.note.chars().count() > self.sections.chars().count() {
            &self.note
        } else {
            &self.sections
        }
    }

    pub fn description_html(&self) -> String {
        sanitize_description(self.raw_description())
    }

    /// Catalog permalink (falling back to `detail_url`) and the optional
    /// external link.
    pub fn links(&self, detail_url: &str) -> Vec<Link> {
        let mut links = vec![Link {
            label: CATALOG_LINK_LABEL.to_string(),
            url: self
                .permalink
                .clone()
                .unwrap_or_else(|| detail_url.to_string()),
        }];
        if let Some(ext) = &self.external_link {
            links.push(Link {
                label: EXTERNAL_LINK_LABEL.to_string(),
                url: ext.clone(),
            });
        }
        links
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn parse_detail_page(body: &str) -> Result<DetailPage, ScrapeError> {
    let doc = Document::parse(body);

    let note = doc.first("div#rwev_note")?;
    let mut sections = String::new();
    let mut found_section = false;
    for (css, title) in SECTIONS {
        if let Some(el) = doc.first(css)? {
            found_section = true;
            sections.push_str(&format!(
                "<strong>{title}</strong><br>{}<br><br>",
                document::inner_html(el)
            ));
        }
    }
    let permalink_el = doc.first("div#shortlink > input")?;
    let external_el = doc.first("div#rwev_link > a")?;

    if note.is_none() && !found_section && permalink_el.is_none() && external_el.is_none() {
        return Err(ScrapeError::Parse(
            "page has none of the event detail blocks".into(),
        ));
    }

    Ok(DetailPage {
        note: note.map(document::inner_html).unwrap_or_default(),
        sections,
        permalink: non_empty(permalink_el.and_then(|el| document::attr(el, "value"))),
        external_link: non_empty(external_el.and_then(|el| document::attr(el, "href"))),
    })
}

/// Payload of the auxiliary course-data endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationPayload {
    #[serde(default)]
    pub gguid: String,
    #[serde(default)]
    pub url: String,
}

/// The integration link, if the payload URL is a valid http(s) URL.
pub fn integration_link(payload: &IntegrationPayload) -> Option<Link> {
    let parsed = Url::parse(payload.url.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| Link {
        label: INTEGRATION_LINK_LABEL.to_string(),
        url: payload.url.trim().to_string(),
    })
}

/// Combine a stub with its parsed detail page.
pub fn enrich(stub: EventStub, page: &DetailPage, base_url: &str) -> EnrichedEvent {
    let links = page.links(&stub.detail_url(base_url));
    EnrichedEvent {
        description_html: page.description_html(),
        links,
        stub,
    }
}

/// Fetch one event's detail page and integration link.
///
/// `slot` is the event's position in the phase-2 input.
pub struct EnrichEventJob {
    pub client: HttpClient,
    pub endpoints: Arc<Endpoints>,
    pub slot: usize,
    pub stub: EventStub,
    pub previous_description: String,
}

#[async_trait]
impl Job for EnrichEventJob {
    type Output = (usize, EnrichedEvent);

    fn label(&self) -> String {
        format!("details {} ({})", self.stub.catalog_code, self.stub.internal_id)
    }

    async fn run(self) -> Result<(usize, EnrichedEvent), ScrapeError> {
        let id = self.stub.internal_id.clone();
        let url = self.endpoints.event_detail(&id)?;
        let body = self.client.get_text(&url).await?;
        let page = parse_detail_page(&body)?;
        let mut event = enrich(self.stub, &page, self.endpoints.base_url());

        if !self.previous_description.trim().is_empty() && event.description_html.is_empty() {
            warn!("event {id} had a description before, the fresh one is empty");
        }

        let integration = self.endpoints.integration(&id)?;
        match self
            .client
            .get_json::<IntegrationPayload>(&integration)
            .await
        {
            Ok(payload) => match integration_link(&payload) {
                Some(link) => event.links.push(link),
                None => debug!("no usable integration link for {id}: {:?}", payload.url),
            },
            Err(e) => warn!("integration lookup for {id} failed: {e}"),
        }

        Ok((self.slot, event))
    }
}
