use scraper::{Html, Selector};

use super::{ExtractContext, Extractor, compile, first_text, link_id};
use crate::config::Config;
use crate::constants::JERSEY_RANGE;
use crate::error::AppError;
use crate::scraper::models::{PlayerCandidate, PlayerStatus};

/// Reads player rows or cards from a roster or players page.
pub struct PlayerExtractor {
    rows: Selector,
    link: Selector,
    name: Selector,
    position: Selector,
    jersey: Selector,
}

impl PlayerExtractor {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let selectors = &config.selectors;
        Ok(PlayerExtractor {
            rows: compile("player_rows", &selectors.player_rows)?,
            link: compile("player_link", &selectors.player_link)?,
            name: compile("player_name", &selectors.player_name)?,
            position: compile("player_position", &selectors.player_position)?,
            jersey: compile("player_jersey", &selectors.player_jersey)?,
        })
    }
}

/// Jersey number from a cell. Only plain digits within 1..=99 count;
/// anything else leaves the number unset.
///
/// # Example
/// ```
/// use bkgt_scraper::scraper::extract::parse_jersey;
///
/// assert_eq!(parse_jersey("23"), Some(23));
/// assert_eq!(parse_jersey("150"), None);
/// assert_eq!(parse_jersey("abc"), None);
/// ```
pub fn parse_jersey(text: &str) -> Option<u8> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<u8>()
        .ok()
        .filter(|number| JERSEY_RANGE.contains(number))
}

/// Splits on the first space into first and last name.
fn split_name(full_name: &str) -> (String, String) {
    match full_name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (full_name.trim().to_string(), String::new()),
    }
}

impl Extractor for PlayerExtractor {
    type Candidate = PlayerCandidate;

    fn extract<'a>(
        &'a self,
        document: &'a Html,
        context: &'a ExtractContext,
    ) -> Box<dyn Iterator<Item = PlayerCandidate> + 'a> {
        Box::new(document.select(&self.rows).filter_map(move |row| {
            let player_id = link_id(row, &self.link, "/spelare/", "player")?;
            let (first_name, last_name) = split_name(&first_text(row, &self.name)?);
            if first_name.is_empty() || last_name.is_empty() {
                return None;
            }

            Some(PlayerCandidate {
                player_id,
                team_id: context.team_id,
                first_name,
                last_name,
                position: first_text(row, &self.position).unwrap_or_default(),
                birth_date: None,
                jersey_number: first_text(row, &self.jersey)
                    .as_deref()
                    .and_then(parse_jersey),
                status: PlayerStatus::Active,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::{PlayerRow, players_page};

    fn extract(html: &str, team_id: Option<i64>) -> Vec<PlayerCandidate> {
        let config = Config::default();
        let extractor = PlayerExtractor::from_config(&config).unwrap();
        let document = Html::parse_document(html);
        let mut context = ExtractContext::new(&config, 2026);
        context.team_id = team_id;
        extractor.extract(&document, &context).collect()
    }

    #[test]
    fn test_jersey_bounds() {
        assert_eq!(parse_jersey("23"), Some(23));
        assert_eq!(parse_jersey(" 7 "), Some(7));
        assert_eq!(parse_jersey("99"), Some(99));
        assert_eq!(parse_jersey("150"), None);
        assert_eq!(parse_jersey("abc"), None);
        assert_eq!(parse_jersey("0"), None);
        assert_eq!(parse_jersey("-5"), None);
        assert_eq!(parse_jersey("12a"), None);
        assert_eq!(parse_jersey(""), None);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Anna Svensson Berg"),
            ("Anna".to_string(), "Svensson Berg".to_string())
        );
        assert_eq!(split_name("Anna"), ("Anna".to_string(), String::new()));
    }

    #[test]
    fn test_table_rows() {
        let html = players_page(&[
            PlayerRow::new("/bkgt/spelare/101", "Anna Svensson", "Forward", "23"),
            PlayerRow::new("/bkgt?player=102", "Erik Lind", "Back", "150"),
        ]);
        let players = extract(&html, Some(4));

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].player_id, "101");
        assert_eq!(players[0].first_name, "Anna");
        assert_eq!(players[0].last_name, "Svensson");
        assert_eq!(players[0].position, "Forward");
        assert_eq!(players[0].jersey_number, Some(23));
        assert_eq!(players[0].team_id, Some(4));
        assert_eq!(players[1].player_id, "102");
        assert_eq!(players[1].jersey_number, None);
    }

    #[test]
    fn test_missing_last_name_is_discarded() {
        let html = players_page(&[
            PlayerRow::new("/spelare/1", "Madonna", "Forward", "10"),
            PlayerRow::new("/spelare/2", "Karin Ek", "", ""),
        ]);
        let players = extract(&html, None);

        assert_eq!(players.len(), 1);
        assert_eq!(players[0].player_id, "2");
        assert_eq!(players[0].position, "");
        assert_eq!(players[0].jersey_number, None);
    }

    #[test]
    fn test_missing_id_is_discarded() {
        let html = players_page(&[PlayerRow::new("/om-oss", "Anna Svensson", "Forward", "9")]);
        assert!(extract(&html, None).is_empty());
    }

    #[test]
    fn test_card_layout() {
        let html = r#"<div class="player">
                <a href="/spelare/55"><h3>Lisa  Nyström</h3></a>
                <span class="position">Målvakt</span>
                <span class="jersey">1</span>
            </div>"#;
        let players = extract(html, None);

        assert_eq!(players.len(), 1);
        assert_eq!(players[0].first_name, "Lisa");
        assert_eq!(players[0].last_name, "Nyström");
        assert_eq!(players[0].position, "Målvakt");
        assert_eq!(players[0].jersey_number, Some(1));
    }
}
