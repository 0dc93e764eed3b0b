//! Application-wide constants and configuration defaults
//!
//! Site-specific markers live here so the heuristics that depend on the
//! third-party markup are easy to find and override through config.

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 8;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("BKGT Data Scraping/", env!("CARGO_PKG_VERSION"));

/// Default endpoints of the source site
pub mod site {
    /// Club landing page; team links are scraped from here
    pub const DEFAULT_SOURCE_URL: &str = "https://www.svenskalag.se/bkgt";

    /// Login form, fetched for the anti-forgery token and then posted to
    pub const DEFAULT_LOGIN_URL: &str = "https://www.svenskalag.se/login";

    /// Root that prefixed team slugs hang off
    pub const DEFAULT_SITE_ROOT: &str = "https://www.svenskalag.se";

    /// Prefix every club team slug carries, e.g. `bkgt-p2013`
    pub const TEAM_SLUG_PREFIX: &str = "bkgt-";

    /// Roster page below a team URL
    pub const ROSTER_PATH: &str = "truppen";

    /// Generic players page below the source URL
    pub const PLAYERS_PATH: &str = "spelare";

    /// Matches page below the source URL
    pub const EVENTS_PATH: &str = "matcher";
}

/// Default heuristics for login and session detection
pub mod heuristics {
    /// Text the site renders when an anonymous visitor hits a members page
    pub const SESSION_EXPIRED_MARKER: &str = "Du måste logga in";

    /// A login response containing all of these is treated as rejected
    pub const LOGIN_FAILURE_MARKERS: [&str; 2] = ["login", "error"];

    /// Hidden input names tried in order when looking for an anti-forgery token
    pub const CSRF_FIELD_NAMES: [&str; 3] = ["_token", "csrf_token", "_csrf"];

    pub const USERNAME_FIELD: &str = "username";
    pub const PASSWORD_FIELD: &str = "password";
    pub const TOKEN_FIELD: &str = "_token";
}

/// Age bands used to classify teams by the birth year in their code
pub mod age_bands {
    /// Teams younger than this are in the youngest band
    pub const YOUTH_MIN_AGE: i32 = 14;

    /// Teams at or above this age are in the oldest band
    pub const SENIOR_MIN_AGE: i32 = 21;
}

/// Jersey numbers outside this range are left unset
pub const JERSEY_RANGE: std::ops::RangeInclusive<u8> = 1..=99;

/// Environment variable names used throughout the application
pub mod env_vars {
    pub const SOURCE_URL: &str = "BKGT_SOURCE_URL";
    pub const LOGIN_URL: &str = "BKGT_LOGIN_URL";
    pub const DATABASE: &str = "BKGT_DATABASE";
    pub const LOG_FILE: &str = "BKGT_LOG_FILE";
    pub const HTTP_TIMEOUT: &str = "BKGT_HTTP_TIMEOUT";
    pub const USERNAME: &str = "BKGT_USERNAME";
    pub const PASSWORD: &str = "BKGT_PASSWORD";

    /// Secret used to decrypt stored credentials
    pub const CREDENTIAL_KEY: &str = "BKGT_CREDENTIAL_KEY";
}

/// Longest accepted `--interval`, one week in minutes
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Name of the log file written by the binary
pub const LOG_FILE_NAME: &str = "bkgt_scraper.log";
