use scraper::{Html, Selector};
use std::collections::HashSet;

use super::{ExtractContext, Extractor, compile, element_text};
use crate::config::Config;
use crate::error::AppError;
use crate::scraper::models::{TeamCandidate, TeamCategory};

/// Finds team links of the form `<prefix>p<YYYY>` on the club landing page.
pub struct TeamExtractor {
    links: Selector,
}

impl TeamExtractor {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(TeamExtractor {
            links: compile("team_links", &config.selectors.team_links)?,
        })
    }
}

/// Birth year from the first `<prefix>p<YYYY>` in a lowercased href.
/// Exactly four digits must follow the `p`.
pub fn team_code_year(href: &str, slug_prefix: &str) -> Option<i32> {
    let href = href.to_lowercase();
    let pattern = format!("{slug_prefix}p");
    let mut search_from = 0;

    while let Some(found) = href[search_from..].find(&pattern) {
        let digits_start = search_from + found + pattern.len();
        let tail = &href[digits_start..];
        let digit_count = tail.chars().take_while(|c| c.is_ascii_digit()).count();
        if digit_count == 4 {
            return tail[..4].parse().ok();
        }
        search_from = digits_start;
    }
    None
}

impl Extractor for TeamExtractor {
    type Candidate = TeamCandidate;

    fn extract<'a>(
        &'a self,
        document: &'a Html,
        context: &'a ExtractContext,
    ) -> Box<dyn Iterator<Item = TeamCandidate> + 'a> {
        let mut seen = HashSet::new();
        Box::new(
            document
                .select(&self.links)
                .filter_map(move |anchor| {
                    let href = anchor.value().attr("href")?;
                    let year = team_code_year(href, &context.slug_prefix)?;
                    Some((anchor, year))
                })
                .filter(move |(_, year)| seen.insert(*year))
                .map(move |(anchor, year)| {
                    let source_id = format!("P{year}");
                    let text = element_text(anchor);
                    TeamCandidate {
                        name: if text.is_empty() {
                            source_id.clone()
                        } else {
                            text
                        },
                        source_url: format!(
                            "{}/{}p{year}",
                            context.site_root, context.slug_prefix
                        ),
                        category: TeamCategory::from_birth_year(year, context.current_year),
                        season: context.current_year.to_string(),
                        source_id,
                    }
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::teams_page;

    fn context(year: i32) -> ExtractContext {
        ExtractContext::new(&Config::default(), year)
    }

    fn extract(html: &str, year: i32) -> Vec<TeamCandidate> {
        let extractor = TeamExtractor::from_config(&Config::default()).unwrap();
        let document = Html::parse_document(html);
        let context = context(year);
        extractor.extract(&document, &context).collect()
    }

    #[test]
    fn test_team_code_year() {
        assert_eq!(team_code_year("/bkgt-p2013", "bkgt-"), Some(2013));
        assert_eq!(
            team_code_year("https://www.svenskalag.se/BKGT-P2016/truppen", "bkgt-"),
            Some(2016)
        );
        assert_eq!(team_code_year("/bkgt-p201", "bkgt-"), None);
        assert_eq!(team_code_year("/bkgt-p20133", "bkgt-"), None);
        assert_eq!(team_code_year("/bkgt-herrar", "bkgt-"), None);
        assert_eq!(team_code_year("/other-p2013", "bkgt-"), None);
    }

    #[test]
    fn test_later_match_in_same_href() {
        assert_eq!(team_code_year("/bkgt-p1/bkgt-p2014", "bkgt-"), Some(2014));
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let html = teams_page(&[
            ("/bkgt-p2013", "P2013 Pojkar"),
            ("/bkgt-p2016", "P2016"),
            ("/bkgt-p2013/truppen", "Truppen"),
        ]);
        let teams = extract(&html, 2026);

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].source_id, "P2013");
        assert_eq!(teams[0].name, "P2013 Pojkar");
        assert_eq!(teams[0].source_url, "https://www.svenskalag.se/bkgt-p2013");
        assert_eq!(teams[0].season, "2026");
        assert_eq!(teams[1].source_id, "P2016");
    }

    #[test]
    fn test_category_banding_from_code() {
        let y = 2026;
        let hrefs: Vec<String> = [10, 18, 25]
            .iter()
            .map(|age| format!("/bkgt-p{}", y - age))
            .collect();
        let html = teams_page(&[
            (hrefs[0].as_str(), "a"),
            (hrefs[1].as_str(), "b"),
            (hrefs[2].as_str(), "c"),
        ]);
        let categories: Vec<_> = extract(&html, y).into_iter().map(|t| t.category).collect();
        assert_eq!(
            categories,
            vec![
                TeamCategory::Children,
                TeamCategory::Youth,
                TeamCategory::Senior
            ]
        );
    }

    #[test]
    fn test_empty_anchor_text_uses_code() {
        let teams = extract(&teams_page(&[("/bkgt-p2019", "")]), 2026);
        assert_eq!(teams[0].name, "P2019");
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let html = "<div><a href=\"/bkgt-p2014\">P2014<a href='/bkgt-p2015'>P2015</div";
        let teams = extract(html, 2026);
        assert_eq!(teams.len(), 2);
    }

    #[test]
    fn test_no_links_yields_nothing() {
        assert!(extract("<html><body><p>Inga lag</p></body></html>", 2026).is_empty());
    }
}
