//! Academic term keys and tags.
//!
//! A term is spelled many ways on the source site and in historical
//! records ("WS19/20", "WS 2019/20", "SS2020", "SS 20"). Everything stored
//! uses the canonical `"<SEASON> <YEAR>"` form: `WS 19/20`, `SS 20`.

use crate::error::ScrapeError;
use async_trait::async_trait;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Summer,
}

/// A normalized term tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermTag {
    season: Season,
    /// Two-digit year the term ends in (`20` for both `WS 19/20` and `SS 20`).
    year: u8,
    label: String,
}

fn term_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(WS|SS)\s*(\d{4}|\d{2})(?:\s*/\s*(\d{4}|\d{2}))?").expect("valid regex")
    })
}

fn two_digit(year: &str) -> Option<u8> {
    let tail = &year[year.len().saturating_sub(2)..];
    tail.parse().ok()
}

impl TermTag {
    /// Find and normalize the first term spelling inside `raw`.
    pub fn parse(raw: &str) -> Option<TermTag> {
        let caps = term_regex().captures(raw)?;
        let first = two_digit(caps.get(2)?.as_str())?;
        match &caps[1] {
            "WS" => {
                let second = match caps.get(3) {
                    Some(m) => two_digit(m.as_str())?,
                    None => (first + 1) % 100,
                };
                Some(TermTag {
                    season: Season::Winter,
                    year: second,
                    label: format!("WS {first:02}/{second:02}"),
                })
            }
            _ => Some(TermTag {
                season: Season::Summer,
                year: first,
                label: format!("SS {first:02}"),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn is_winter(&self) -> bool {
        self.season == Season::Winter
    }

    pub fn is_summer(&self) -> bool {
        self.season == Season::Summer
    }
}

impl std::fmt::Display for TermTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

impl Ord for TermTag {
    /// Chronological: within the same end year the winter term comes first.
    /// Malformed winter spans sharing an end year fall back to the label.
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = |s: Season| match s {
            Season::Winter => 0,
            Season::Summer => 1,
        };
        self.year
            .cmp(&other.year)
            .then(rank(self.season).cmp(&rank(other.season)))
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for TermTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical spelling of a term tag, or the trimmed input if it is not
/// recognizable.
pub fn normalize_tag(raw: &str) -> String {
    TermTag::parse(raw)
        .map(|t| t.label)
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Sort tags chronologically; unrecognized tags go last in input order.
pub fn sort_chronologically(tags: &[String]) -> Vec<String> {
    let mut known: Vec<TermTag> = tags.iter().filter_map(|t| TermTag::parse(t)).collect();
    known.sort();
    known.dedup();
    let mut out: Vec<String> = known.into_iter().map(|t| t.label).collect();
    out.extend(
        tags.iter()
            .filter(|t| TermTag::parse(t).is_none())
            .cloned(),
    );
    out
}

/// Resolves an opaque term key to the source site's term token (`tguid`).
#[async_trait]
pub trait TermResolver: Send + Sync {
    async fn resolve(&self, term: &str) -> Result<String, ScrapeError>;
}

/// Resolver backed by a fixed key → token table (usually from config).
#[derive(Debug, Clone, Default)]
pub struct StaticTermResolver {
    tokens: HashMap<String, String>,
}

impl StaticTermResolver {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let tokens = entries
            .into_iter()
            .map(|(k, v)| (normalize_tag(k.as_ref()), v.into()))
            .collect();
        Self { tokens }
    }

    /// Known keys in canonical spelling, sorted chronologically.
    pub fn keys(&self) -> Vec<String> {
        let keys: Vec<String> = self.tokens.keys().cloned().collect();
        sort_chronologically(&keys)
    }
}

#[async_trait]
impl TermResolver for StaticTermResolver {
    async fn resolve(&self, term: &str) -> Result<String, ScrapeError> {
        self.tokens
            .get(&normalize_tag(term))
            .cloned()
            .ok_or_else(|| ScrapeError::UnknownTerm(term.to_string()))
    }
}
