//! The description HTML allow-list.
//!
//! Phase 2 and the offline backfill migration both go through
//! [`sanitize_description`]; there is no second policy.

use ammonia::Builder;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;

const ALLOWED_TAGS: &[&str] = &[
    "b", "i", "strong", "p", "span", "br", "h1", "h2", "h3", "h4", "h5", "h6", "a", "section",
    "ul", "ol", "li", "dl", "dt", "dd", "table", "thead", "tbody", "tfoot", "tr", "td", "th",
    "caption", "colgroup", "col",
];

const STYLED_TAGS: &[&str] = &["p", "span"];

/// Keep only `text-decoration: underline | line-through` from a style value.
fn filter_style(value: &str) -> Option<String> {
    let kept: Vec<String> = value
        .split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let val = val.trim().to_ascii_lowercase();
            (prop == "text-decoration" && matches!(val.as_str(), "underline" | "line-through"))
                .then(|| format!("text-decoration: {val}"))
        })
        .collect();
    (!kept.is_empty()).then(|| kept.join("; "))
}

fn policy() -> &'static Builder<'static> {
    static POLICY: OnceLock<Builder<'static>> = OnceLock::new();
    POLICY.get_or_init(|| {
        let mut b = Builder::empty();
        b.add_tags(ALLOWED_TAGS)
            .add_tag_attributes("a", &["href"])
            .url_schemes(HashSet::from(["http", "https", "mailto"]))
            .link_rel(None)
            .clean_content_tags(HashSet::from(["script", "style"]));
        for tag in STYLED_TAGS {
            b.add_tag_attributes(*tag, &["style"]);
        }
        b.attribute_filter(|element, attribute, value| {
            if attribute == "style" {
                if !STYLED_TAGS.contains(&element) {
                    return None;
                }
                return filter_style(value).map(Cow::Owned);
            }
            Some(Cow::Borrowed(value))
        });
        b
    })
}

/// Sanitize description HTML for rendering.
pub fn sanitize_description(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    policy().clean(html).to_string()
}
