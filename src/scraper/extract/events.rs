use chrono::{NaiveDate, NaiveDateTime};
use scraper::{Html, Selector};

use super::{ExtractContext, Extractor, compile, first_text, link_id};
use crate::config::Config;
use crate::error::AppError;
use crate::scraper::models::{EventCandidate, EventStatus, EventType, HomeAway};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d kl. %H:%M",
    "%Y-%m-%d kl %H:%M",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d %B %Y", "%B %d, %Y"];

/// Reads match rows or cards from the matches page.
pub struct EventExtractor {
    rows: Selector,
    link: Selector,
    title: Selector,
    date: Selector,
    location: Selector,
}

impl EventExtractor {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let selectors = &config.selectors;
        Ok(EventExtractor {
            rows: compile("event_rows", &selectors.event_rows)?,
            link: compile("event_link", &selectors.event_link)?,
            title: compile("event_title", &selectors.event_title)?,
            date: compile("event_date", &selectors.event_date)?,
            location: compile("event_location", &selectors.event_location)?,
        })
    }
}

/// Parses the date cell of a match row. Dates without a time are placed at
/// midnight. Returns `None` when no known format matches.
pub fn parse_event_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(at.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Opponent from a title such as `BKGT vs Hisingen`. The `vs` must stand as
/// its own word and be followed by whitespace; case is ignored.
pub fn extract_opponent(title: &str) -> Option<String> {
    let lower = title.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut search_from = 0;

    while let Some(found) = lower[search_from..].find("vs") {
        let start = search_from + found;
        let after = start + 2;
        let word_start = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let followed_by_space = bytes.get(after).is_some_and(u8::is_ascii_whitespace);
        if word_start && followed_by_space {
            let opponent = title[after..].trim();
            return (!opponent.is_empty()).then(|| opponent.to_string());
        }
        search_from = after;
    }
    None
}

impl Extractor for EventExtractor {
    type Candidate = EventCandidate;

    fn extract<'a>(
        &'a self,
        document: &'a Html,
        _context: &'a ExtractContext,
    ) -> Box<dyn Iterator<Item = EventCandidate> + 'a> {
        Box::new(document.select(&self.rows).filter_map(move |row| {
            let event_id = link_id(row, &self.link, "/match/", "match")?;
            let title = first_text(row, &self.title).unwrap_or_default();
            let opponent = extract_opponent(&title);

            Some(EventCandidate {
                event_id,
                event_date: first_text(row, &self.date)
                    .as_deref()
                    .and_then(parse_event_date),
                location: first_text(row, &self.location).unwrap_or_default(),
                opponent,
                title,
                event_type: EventType::Match,
                home_away: HomeAway::Home,
                status: EventStatus::Scheduled,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::{EventRow, events_page};

    fn extract(html: &str) -> Vec<EventCandidate> {
        let config = Config::default();
        let extractor = EventExtractor::from_config(&config).unwrap();
        let document = Html::parse_document(html);
        let context = ExtractContext::new(&config, 2026);
        extractor.extract(&document, &context).collect()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_event_date_formats() {
        assert_eq!(parse_event_date("2026-05-01 18:30"), Some(at(2026, 5, 1, 18, 30)));
        assert_eq!(
            parse_event_date("2026-05-01 18:30:00"),
            Some(at(2026, 5, 1, 18, 30))
        );
        assert_eq!(
            parse_event_date("2026-05-01 kl. 18:30"),
            Some(at(2026, 5, 1, 18, 30))
        );
        assert_eq!(parse_event_date("01.05.2026"), Some(at(2026, 5, 1, 0, 0)));
        assert_eq!(parse_event_date("2026-05-01"), Some(at(2026, 5, 1, 0, 0)));
        assert_eq!(parse_event_date("1 May 2026"), Some(at(2026, 5, 1, 0, 0)));
    }

    #[test]
    fn test_parse_event_date_rejects_garbage() {
        assert_eq!(parse_event_date("imorgon"), None);
        assert_eq!(parse_event_date(""), None);
        assert_eq!(parse_event_date("2026-13-45"), None);
    }

    #[test]
    fn test_extract_opponent() {
        assert_eq!(
            extract_opponent("BKGT vs Hisingen IK").as_deref(),
            Some("Hisingen IK")
        );
        assert_eq!(extract_opponent("BKGT VS  Örgryte").as_deref(), Some("Örgryte"));
        assert_eq!(extract_opponent("Träning"), None);
        assert_eq!(extract_opponent("Canvas day"), None);
        assert_eq!(extract_opponent("BKGT vs"), None);
    }

    #[test]
    fn test_rows_with_ids_are_extracted() {
        let html = events_page(&[
            EventRow::new("/bkgt/match/900", "BKGT vs Hisingen", "2026-05-01 18:00", "Valhalla"),
            EventRow::new("/bkgt?match=901", "Träning", "någon gång", "Kviberg"),
            EventRow::new("/bkgt/kalender", "Utan id", "2026-05-03", "Okänt"),
        ]);
        let events = extract(&html);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_id, "900");
        assert_eq!(events[0].opponent.as_deref(), Some("Hisingen"));
        assert_eq!(events[0].event_date, Some(at(2026, 5, 1, 18, 0)));
        assert_eq!(events[0].location, "Valhalla");
        assert_eq!(events[1].event_id, "901");
        assert_eq!(events[1].opponent, None);
        // Unparsable dates are kept as unset, not rejected here.
        assert_eq!(events[1].event_date, None);
    }
}
