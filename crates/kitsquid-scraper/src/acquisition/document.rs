//! Field extraction from fetched HTML.
//!
//! Thin helpers over the `scraper` crate: compile CSS selectors, pull
//! text, attributes and inner HTML out of matched elements, and recover
//! the site's guid from a link target. All functions are synchronous
//! because `scraper::Html` is `!Send`; jobs fetch first, then parse the
//! body without holding the parsed tree across an await point.

use crate::error::ScrapeError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// First element matching `css`, if any.
    pub fn first(&self, css: &str) -> Result<Option<ElementRef<'_>>, ScrapeError> {
        let sel = selector(css)?;
        Ok(self.html.select(&sel).next())
    }

    /// All elements matching `css`, in document order.
    pub fn all(&self, css: &str) -> Result<Vec<ElementRef<'_>>, ScrapeError> {
        let sel = selector(css)?;
        Ok(self.html.select(&sel).collect())
    }

    /// Like [`Document::first`], but a missing element is a parse failure.
    pub fn require(&self, css: &str) -> Result<ElementRef<'_>, ScrapeError> {
        self.first(css)?
            .ok_or_else(|| ScrapeError::Parse(format!("no element matches `{css}`")))
    }
}

pub fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Parse(format!("bad selector `{css}`: {e}")))
}

/// Concatenated text content of an element.
pub fn text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Text content with surrounding whitespace trimmed.
pub fn trimmed_text(el: ElementRef<'_>) -> String {
    text(el).trim().to_string()
}

pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// Serialized children of an element (the element's own tag excluded).
pub fn inner_html(el: ElementRef<'_>) -> String {
    el.inner_html()
}

/// Descendants of `el` matching `css`, in document order.
pub fn select_in<'a>(el: ElementRef<'a>, css: &str) -> Result<Vec<ElementRef<'a>>, ScrapeError> {
    let sel = selector(css)?;
    Ok(el.select(&sel).collect())
}

/// Direct child elements with the given tag name, in order.
pub fn children_named<'a>(el: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == tag)
        .collect()
}

/// Direct child elements with the given tag name that carry `class`.
pub fn children_with_class<'a>(el: ElementRef<'a>, tag: &str, class: &str) -> Vec<ElementRef<'a>> {
    children_named(el, tag)
        .into_iter()
        .filter(|c| c.value().classes().any(|k| k == class))
        .collect()
}

fn guid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"gguid=(0x[0-9A-Za-z]+)").expect("valid regex"))
}

/// Extract the site guid from a link target (`...gguid=0xABC...`).
pub fn extract_guid(href: &str) -> Option<String> {
    guid_regex()
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Display text and guid of an anchor; `Data` error when the target has
/// no guid.
pub fn anchor_with_guid(a: ElementRef<'_>) -> Result<(String, String), ScrapeError> {
    let href = attr(a, "href").unwrap_or_default();
    let guid = extract_guid(href)
        .ok_or_else(|| ScrapeError::Data(format!("no gguid in link target {href:?}")))?;
    Ok((trimmed_text(a), guid))
}
