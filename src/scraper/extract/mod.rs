//! HTML extraction of candidate records.
//!
//! Every extractor is best effort: malformed markup yields fewer candidates,
//! never an error. Selectors come from config so the markup assumptions can
//! be changed without touching the orchestration.

use scraper::{ElementRef, Html, Selector};

use super::models::{EventCandidate, PlayerCandidate, TeamCandidate};
use crate::config::Config;
use crate::error::AppError;

pub mod events;
pub mod players;
pub mod teams;

pub use events::EventExtractor;
pub use players::{PlayerExtractor, parse_jersey};
pub use teams::TeamExtractor;

/// Page-independent facts an extractor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractContext {
    /// Year used for age banding and as the season of new teams.
    pub current_year: i32,
    pub site_root: String,
    pub slug_prefix: String,
    /// Local id of the team whose roster is being read, if any.
    pub team_id: Option<i64>,
}

impl ExtractContext {
    pub fn new(config: &Config, current_year: i32) -> Self {
        ExtractContext {
            current_year,
            site_root: config.site_root.trim_end_matches('/').to_string(),
            slug_prefix: config.team_slug_prefix.to_lowercase(),
            team_id: None,
        }
    }

    pub fn for_team(&self, team_id: i64) -> Self {
        ExtractContext {
            team_id: Some(team_id),
            ..self.clone()
        }
    }
}

/// Turns a parsed page into a lazy sequence of candidates.
pub trait Extractor {
    type Candidate;

    fn extract<'a>(
        &'a self,
        document: &'a Html,
        context: &'a ExtractContext,
    ) -> Box<dyn Iterator<Item = Self::Candidate> + 'a>;
}

pub type BoxedExtractor<T> = Box<dyn Extractor<Candidate = T> + Send + Sync>;

/// One extractor per entity kind. Fields are public so a caller can swap in
/// its own strategy.
pub struct Extractors {
    pub teams: BoxedExtractor<TeamCandidate>,
    pub players: BoxedExtractor<PlayerCandidate>,
    pub events: BoxedExtractor<EventCandidate>,
}

impl Extractors {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Extractors {
            teams: Box::new(TeamExtractor::from_config(config)?),
            players: Box::new(PlayerExtractor::from_config(config)?),
            events: Box::new(EventExtractor::from_config(config)?),
        })
    }
}

pub(crate) fn compile(name: &str, css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::config_error(format!("Invalid selector '{name}' ({css}): {e}")))
}

/// Text of an element with whitespace runs collapsed to single spaces.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `selector` inside `row`, in document order.
pub(crate) fn first_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector).next().map(element_text)
}

/// Digits following `marker` in `href`, e.g. `/spelare/` in `/spelare/123`.
fn digits_after<'h>(href: &'h str, marker: &str) -> Option<&'h str> {
    let start = href.find(marker)? + marker.len();
    let rest = &href[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Numeric value of query parameter `key`, e.g. `player` in `?player=123`.
fn query_digits<'h>(href: &'h str, key: &str) -> Option<&'h str> {
    let (_, query) = href.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key && !v.is_empty() && v.chars().all(|c| c.is_ascii_digit())).then_some(v)
    })
}

/// Numeric id from the first link in a row, by path segment or query key.
pub(crate) fn link_id(
    row: ElementRef<'_>,
    link: &Selector,
    path_marker: &str,
    query_key: &str,
) -> Option<String> {
    let href = row.select(link).next()?.value().attr("href")?;
    digits_after(href, path_marker)
        .or_else(|| query_digits(href, query_key))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_after() {
        assert_eq!(digits_after("/bkgt/spelare/123", "/spelare/"), Some("123"));
        assert_eq!(digits_after("/spelare/123/profil", "/spelare/"), Some("123"));
        assert_eq!(digits_after("/spelare/abc", "/spelare/"), None);
        assert_eq!(digits_after("/truppen", "/spelare/"), None);
    }

    #[test]
    fn test_query_digits() {
        assert_eq!(query_digits("/bkgt?player=77", "player"), Some("77"));
        assert_eq!(query_digits("/bkgt?tab=1&player=77#top", "player"), Some("77"));
        assert_eq!(query_digits("/bkgt?player=x7", "player"), None);
        assert_eq!(query_digits("/bkgt?otherplayer=7", "player"), None);
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let html = Html::parse_fragment("<p>  Anna \n   <b>Svensson</b>  </p>");
        let selector = Selector::parse("p").unwrap();
        let p = html.select(&selector).next().unwrap();
        assert_eq!(element_text(p), "Anna Svensson");
    }

    #[test]
    fn test_extractors_from_default_config() {
        assert!(Extractors::from_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_extractors_reject_bad_selector() {
        let mut config = Config::default();
        config.selectors.event_rows = "tr[".to_string();
        assert!(Extractors::from_config(&config).is_err());
    }
}
