//! Category discovery: one level of sub-categories below a faculty.

use crate::acquisition::document::{self, Document};
use crate::acquisition::endpoints::Endpoints;
use crate::acquisition::http_client::HttpClient;
use crate::error::ScrapeError;
use crate::model::{Category, Faculty};
use tracing::{debug, warn};

pub fn parse_categories(body: &str, parent_faculty_id: &str) -> Result<Vec<Category>, ScrapeError> {
    let doc = Document::parse(body);
    let mut out = Vec::new();
    for a in doc.all("td.indented > a")? {
        match document::anchor_with_guid(a) {
            Ok((display_name, id)) => out.push(Category {
                id,
                display_name,
                parent_faculty_id: parent_faculty_id.to_string(),
            }),
            Err(e) => warn!("skipping category anchor under {parent_faculty_id}: {e}"),
        }
    }
    Ok(out)
}

pub async fn discover_categories(
    client: &HttpClient,
    endpoints: &Endpoints,
    term_token: &str,
    faculty: &Faculty,
) -> Result<Vec<Category>, ScrapeError> {
    let url = endpoints.field_listing(term_token, &faculty.id)?;
    let body = client.get_text(&url).await?;
    let categories = parse_categories(&body, &faculty.id)?;
    debug!(
        "{} categories under {}",
        categories.len(),
        faculty.display_name
    );
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories() {
        let body = r#"<table>
            <tr><td class="indented"><a href="field.asp?gguid=0xC1">1. Vorlesungen</a></td></tr>
            <tr><td class="indented level2"><a href="field.asp?gguid=0xC2">2. Seminare</a></td></tr>
            <tr><td class="indented"><a href="field.asp?view=list">kaputt</a></td></tr>
            <tr><td><a href="field.asp?gguid=0xNOPE">nicht eingerueckt</a></td></tr>
        </table>"#;
        let cats = parse_categories(body, "0xF").unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].id, "0xC1");
        assert_eq!(cats[0].display_name, "1. Vorlesungen");
        assert_eq!(cats[1].parent_faculty_id, "0xF");
    }
}
