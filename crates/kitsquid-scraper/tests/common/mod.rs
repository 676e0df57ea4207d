//! HTML fixtures imitating the catalog site, served through wiremock.

#![allow(dead_code)]

use kitsquid_scraper::ScrapeConfig;
use std::collections::BTreeMap;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TERM_TOKEN: &str = "0xTERM1920";

pub fn config_for(server: &MockServer) -> ScrapeConfig {
    let mut terms = BTreeMap::new();
    terms.insert("WS 19/20".to_string(), TERM_TOKEN.to_string());
    ScrapeConfig {
        base_url: format!("{}/all", server.uri()),
        integration_url: format!("{}/lms/{{gguid}}", server.uri()),
        max_workers: 3,
        timeout_ms: 2_000,
        terms,
        ..Default::default()
    }
}

pub fn faculty_index(faculties: &[(&str, &str)]) -> String {
    let rows: String = faculties
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<tr><td><a href="field.asp?tguid={TERM_TOKEN}&amp;gguid={id}">{name}</a></td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><h1 class="pagetitle">Vorlesungsverzeichnis (WS 19/20)</h1>
        <table id="tableVVZ"><tbody class="tablecontent">{rows}</tbody></table></body></html>"#
    )
}

pub fn category_page(categories: &[(&str, &str)]) -> String {
    let rows: String = categories
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<tr><td class="indented"><a href="field.asp?gguid={id}">{name}</a></td></tr>"#
            )
        })
        .collect();
    format!(r#"<html><body><table>{rows}</table></body></html>"#)
}

/// A listing page for `category` under `faculty` with one event row and
/// one schedule row per id.
pub fn listing_page(faculty: &str, category: &str, ids: &[String]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<tr id="{id}"><td></td><td><a href="event.asp?gguid={id}">{id}-code</a></td>
                <td><a href="event.asp?gguid={id}&amp;tguid={TERM_TOKEN}">Veranstaltung {id}</a></td>
                <td><a href="person.asp?gguid=0xL{id}">Dozent {id}</a></td>
                <td><a href="/">Vorlesung (V)</a></td><td>2</td><td></td><td></td></tr>
                <tr><td></td><td class="collapsible"><span class="date">Mo 08:00-09:30</span>
                <a class="room" href="/">Raum {id}</a></td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <ol><li class="breadcrumb-item"><a href="x" title="Vorlesungsverzeichnis">VVZ</a></li>
        <li class="breadcrumb-item"><a href="x" title="{faculty}">{faculty}</a></li></ol>
        <h1 class="pagetitle">Vorlesungsverzeichnis: 1. {category} (WS 19/20)</h1>
        <table id="EVENTLIST"><tbody class="tablecontent">{rows}</tbody></table>
        </body></html>"#
    )
}

pub fn event_id(n: usize) -> String {
    format!("0xE{n:02}")
}

pub async fn mount_page(server: &MockServer, page: &str, gguid: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/all/{page}")))
        .and(query_param("gguid", gguid))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, page: &str, gguid: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/all/{page}")))
        .and(query_param("gguid", gguid))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn mount_faculty_index(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/all/fields.asp"))
        .and(query_param("tguid", TERM_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Faculty, its categories, and the event ids listed in each category.
pub type CatalogLayout = Vec<(&'static str, Vec<(&'static str, Vec<String>)>)>;

/// Three faculties with 2, 3 and 1 categories; 40 listing rows over 37
/// distinct events. Events 1, 10 and 20 are listed a second time under the
/// last category.
pub fn scenario_layout() -> CatalogLayout {
    let mut ids: Vec<String> = (1..=37).map(event_id).collect();
    ids.extend([1, 10, 20].map(event_id));
    let chunk = |from: usize, to: usize| ids[from..to].to_vec();
    vec![
        (
            "0xF1",
            vec![("0xC1", chunk(0, 7)), ("0xC2", chunk(7, 14))],
        ),
        (
            "0xF2",
            vec![
                ("0xC3", chunk(14, 21)),
                ("0xC4", chunk(21, 28)),
                ("0xC5", chunk(28, 34)),
            ],
        ),
        ("0xF3", vec![("0xC6", chunk(34, 40))]),
    ]
}

pub fn faculty_name(id: &str) -> String {
    format!("Fakultät {}", &id[3..])
}

pub fn category_name(id: &str) -> String {
    format!("Kategorie {}", &id[3..])
}

/// Mount the whole layout. Faculty or category ids in `failing` answer
/// with 500.
pub async fn mount_catalog(server: &MockServer, layout: &CatalogLayout, failing: &[&str]) {
    let faculties: Vec<(String, String)> = layout
        .iter()
        .map(|(f, _)| (f.to_string(), faculty_name(f)))
        .collect();
    let refs: Vec<(&str, &str)> = faculties
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    mount_faculty_index(server, faculty_index(&refs)).await;

    for (faculty, categories) in layout {
        let named: Vec<(String, String)> = categories
            .iter()
            .map(|(c, _)| (c.to_string(), format!("1. {}", category_name(c))))
            .collect();
        let refs: Vec<(&str, &str)> = named.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        if failing.contains(faculty) {
            mount_status(server, "field.asp", faculty, 500).await;
            continue;
        }
        mount_page(server, "field.asp", faculty, category_page(&refs)).await;

        for (category, ids) in categories {
            if failing.contains(category) {
                mount_status(server, "field.asp", category, 500).await;
            } else {
                let body = listing_page(&faculty_name(faculty), &category_name(category), ids);
                mount_page(server, "field.asp", category, body).await;
            }
        }
    }
}
