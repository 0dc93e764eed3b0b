//! URL building for the source site's pages.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::Config;
use crate::constants::site;
use crate::store::TeamRecord;

/// Known team codes and their page slugs on the club site.
static TEAM_SLUGS: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    (2013..=2020)
        .map(|year| (format!("P{year}"), format!("bkgt-p{year}")))
        .collect()
});

/// Derives a URL slug from a team name: lowercase, with every run of
/// non-alphanumeric characters collapsed into one hyphen.
///
/// # Example
/// ```
/// use bkgt_scraper::scraper::urls::slugify;
///
/// assert_eq!(slugify("BKGT P 2014"), "bkgt-p-2014");
/// assert_eq!(slugify("  Herrar A!"), "herrar-a");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn join(base: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}

/// Maps teams and page kinds onto the source site's URL scheme.
///
/// Team lookup goes through three tiers: the code to slug table (built-in
/// entries merged with `[team_slugs]` from config), then a slug derived from
/// the name if it carries the club prefix, then the derived slug appended to
/// the source URL.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    source_url: String,
    site_root: String,
    slug_prefix: String,
    slugs: HashMap<String, String>,
}

impl UrlResolver {
    pub fn new(config: &Config) -> Self {
        let mut slugs = TEAM_SLUGS.clone();
        for (code, slug) in &config.team_slugs {
            slugs.insert(code.trim().to_uppercase(), slug.trim().to_string());
        }
        UrlResolver {
            source_url: config.source_url.trim_end_matches('/').to_string(),
            site_root: config.site_root.trim_end_matches('/').to_string(),
            slug_prefix: config.team_slug_prefix.to_lowercase(),
            slugs,
        }
    }

    /// Resolves a team code or name to its page URL. Performs no I/O.
    pub fn resolve_team_url(&self, team_name: &str) -> String {
        if let Some(slug) = self.slugs.get(&team_name.trim().to_uppercase()) {
            return join(&self.site_root, slug);
        }

        let slug = slugify(team_name);
        if !self.slug_prefix.is_empty() && slug.starts_with(&self.slug_prefix) {
            join(&self.site_root, &slug)
        } else {
            join(&self.source_url, &slug)
        }
    }

    /// Roster page of a team.
    pub fn roster_url(&self, team_name: &str) -> String {
        join(&self.resolve_team_url(team_name), site::ROSTER_PATH)
    }

    /// Roster page of a stored team.
    ///
    /// A code in the slug table wins, so configured overrides still apply.
    /// Otherwise the team page recorded at scrape time is used, and only a
    /// team without one is resolved by name.
    pub fn team_roster_url(&self, team: &TeamRecord) -> String {
        if self.slugs.contains_key(&team.source_id.trim().to_uppercase()) {
            self.roster_url(&team.source_id)
        } else if !team.source_url.trim().is_empty() {
            join(&team.source_url, site::ROSTER_PATH)
        } else {
            self.roster_url(&team.name)
        }
    }

    /// Club landing page that lists the teams.
    pub fn teams_url(&self) -> &str {
        &self.source_url
    }

    /// Generic players page used when a team's roster cannot be fetched.
    pub fn players_fallback_url(&self) -> String {
        join(&self.source_url, site::PLAYERS_PATH)
    }

    pub fn events_url(&self) -> String {
        join(&self.source_url, site::EVENTS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> UrlResolver {
        UrlResolver::new(&Config::default())
    }

    #[test]
    fn test_table_lookup_is_case_normalized() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_team_url("P2013"),
            "https://www.svenskalag.se/bkgt-p2013"
        );
        assert_eq!(
            resolver.resolve_team_url(" p2020 "),
            "https://www.svenskalag.se/bkgt-p2020"
        );
    }

    #[test]
    fn test_prefixed_slug_goes_to_site_root() {
        assert_eq!(
            resolver().resolve_team_url("BKGT P2011"),
            "https://www.svenskalag.se/bkgt-p2011"
        );
    }

    #[test]
    fn test_unprefixed_name_falls_back_to_source_url() {
        assert_eq!(
            resolver().resolve_team_url("Herrar Senior"),
            "https://www.svenskalag.se/bkgt/herrar-senior"
        );
    }

    #[test]
    fn test_config_slugs_extend_table() {
        let mut config = Config::default();
        config
            .team_slugs
            .insert("dam".to_string(), "bkgt-damer".to_string());
        let resolver = UrlResolver::new(&config);

        assert_eq!(
            resolver.resolve_team_url("DAM"),
            "https://www.svenskalag.se/bkgt-damer"
        );
        assert_eq!(
            resolver.resolve_team_url("P2015"),
            "https://www.svenskalag.se/bkgt-p2015"
        );
    }

    #[test]
    fn test_page_urls() {
        let resolver = resolver();
        assert_eq!(resolver.teams_url(), "https://www.svenskalag.se/bkgt");
        assert_eq!(
            resolver.roster_url("P2014"),
            "https://www.svenskalag.se/bkgt-p2014/truppen"
        );
        assert_eq!(
            resolver.players_fallback_url(),
            "https://www.svenskalag.se/bkgt/spelare"
        );
        assert_eq!(
            resolver.events_url(),
            "https://www.svenskalag.se/bkgt/matcher"
        );
    }

    fn stored_team(source_id: &str, name: &str, source_url: &str) -> TeamRecord {
        TeamRecord {
            id: 1,
            name: name.to_string(),
            source_id: source_id.to_string(),
            source_url: source_url.to_string(),
            category: crate::scraper::models::TeamCategory::Children,
            season: "2026".to_string(),
        }
    }

    #[test]
    fn test_team_roster_url_uses_stored_page_outside_table() {
        let team = stored_team("P2021", "P2021", "https://www.svenskalag.se/bkgt-p2021");
        assert_eq!(
            resolver().team_roster_url(&team),
            "https://www.svenskalag.se/bkgt-p2021/truppen"
        );
    }

    #[test]
    fn test_team_roster_url_prefers_slug_table() {
        let mut config = Config::default();
        config
            .team_slugs
            .insert("P2021".to_string(), "bkgt-p2021-flickor".to_string());
        let team = stored_team("P2021", "P2021", "https://www.svenskalag.se/bkgt-p2021");
        assert_eq!(
            UrlResolver::new(&config).team_roster_url(&team),
            "https://www.svenskalag.se/bkgt-p2021-flickor/truppen"
        );
    }

    #[test]
    fn test_team_roster_url_without_stored_page_resolves_name() {
        let team = stored_team("X1", "BKGT Damer", "");
        assert_eq!(
            resolver().team_roster_url(&team),
            "https://www.svenskalag.se/bkgt-damer/truppen"
        );
    }

    #[test]
    fn test_trailing_slash_in_config() {
        let config = Config {
            source_url: "https://www.svenskalag.se/bkgt/".to_string(),
            ..Config::default()
        };
        assert_eq!(
            UrlResolver::new(&config).events_url(),
            "https://www.svenskalag.se/bkgt/matcher"
        );
    }

    #[test]
    fn test_slugify_edge_cases() {
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("Åby IF"), "by-if");
        assert_eq!(slugify("P2013"), "p2013");
    }
}
