//! URL construction for the catalog site and the auxiliary endpoint.

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use url::Url;

/// Query-parameterized entry points of the catalog site.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
    integration_template: String,
    page_size: u32,
    language: String,
}

impl Endpoints {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            integration_template: config.integration_url.clone(),
            page_size: config.page_size,
            language: config.language.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page(&self, name: &str) -> Result<Url, ScrapeError> {
        let raw = format!("{}/{name}", self.base_url);
        Url::parse(&raw).map_err(|e| ScrapeError::Config(format!("{raw}: {e}")))
    }

    /// Faculty index for a term, in the configured display language.
    pub fn faculties(&self, term_token: &str) -> Result<Url, ScrapeError> {
        let mut u = self.page("fields.asp")?;
        u.query_pairs_mut()
            .append_pair("group", "Vorlesungsverzeichnis")
            .append_pair("tguid", term_token)
            .append_pair("lang", &self.language);
        Ok(u)
    }

    /// Listing view of one node (faculty or category) at maximum page size.
    pub fn field_listing(&self, term_token: &str, node_id: &str) -> Result<Url, ScrapeError> {
        let mut u = self.page("field.asp")?;
        u.query_pairs_mut()
            .append_pair("tguid", term_token)
            .append_pair("gguid", node_id)
            .append_pair("view", "list")
            .append_pair("pagesize", &self.page_size.to_string());
        Ok(u)
    }

    pub fn event_detail(&self, internal_id: &str) -> Result<Url, ScrapeError> {
        let mut u = self.page("event.asp")?;
        u.query_pairs_mut().append_pair("gguid", internal_id);
        Ok(u)
    }

    pub fn integration(&self, internal_id: &str) -> Result<Url, ScrapeError> {
        let raw = self.integration_template.replace("{gguid}", internal_id);
        Url::parse(&raw).map_err(|e| ScrapeError::Config(format!("{raw}: {e}")))
    }
}
