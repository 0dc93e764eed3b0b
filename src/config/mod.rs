use crate::constants::{self, env_vars, heuristics, site};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod user_prompts;
pub mod validation;

use paths::{get_config_path, get_default_database_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the scraper.
/// Handles loading, saving, and managing scraper settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Club landing page. Team links are read from here and the players and
    /// matches pages hang off it.
    pub source_url: String,
    /// Login form URL. Fetched for the anti-forgery token, then posted to.
    pub login_url: String,
    /// Site root used for team slugs that carry the club prefix.
    pub site_root: String,
    /// Prefix every club team slug carries.
    pub team_slug_prefix: String,
    /// SQLite database path. Defaults to the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// Path to the log file. If not specified, logs will be written to a default location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// HTTP timeout in seconds for every request.
    pub http_timeout_seconds: u64,
    /// Scheduled runs are skipped when this is false. Manual runs ignore it.
    pub scraping_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Encrypted with the secret in `BKGT_CREDENTIAL_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
    pub heuristics: Heuristics,
    pub selectors: Selectors,
    /// Team code to slug overrides, e.g. `P2013 = "bkgt-p2013"`.
    pub team_slugs: BTreeMap<String, String>,
}

/// Markers used to interpret login and members-page responses.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Heuristics {
    /// Any of these in a fetched body means the session is gone.
    pub session_expired_markers: Vec<String>,
    /// All of these in the login response means the login was rejected.
    pub login_failure_markers: Vec<String>,
    /// Hidden input names tried in order for the anti-forgery token.
    pub csrf_field_names: Vec<String>,
    pub username_field: String,
    pub password_field: String,
    pub token_field: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Heuristics {
            session_expired_markers: vec![heuristics::SESSION_EXPIRED_MARKER.to_string()],
            login_failure_markers: heuristics::LOGIN_FAILURE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            csrf_field_names: heuristics::CSRF_FIELD_NAMES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            username_field: heuristics::USERNAME_FIELD.to_string(),
            password_field: heuristics::PASSWORD_FIELD.to_string(),
            token_field: heuristics::TOKEN_FIELD.to_string(),
        }
    }
}

/// CSS selectors for the player and event extractors.
///
/// The first match inside a row wins, in document order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Selectors {
    pub team_links: String,
    pub player_rows: String,
    pub player_link: String,
    pub player_name: String,
    pub player_position: String,
    pub player_jersey: String,
    pub event_rows: String,
    pub event_link: String,
    pub event_title: String,
    pub event_date: String,
    pub event_location: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Selectors {
            team_links: "a[href]".to_string(),
            player_rows: "div.player, tr.player".to_string(),
            player_link: "a[href]".to_string(),
            player_name: "h3, .name, td:nth-child(1)".to_string(),
            player_position: ".position, td:nth-child(2)".to_string(),
            player_jersey: ".jersey, td:nth-child(3)".to_string(),
            event_rows: "div.match, tr.event".to_string(),
            event_link: "a[href]".to_string(),
            event_title: "h4, .title, td:nth-child(1)".to_string(),
            event_date: ".date, td:nth-child(2)".to_string(),
            event_location: ".location, td:nth-child(3)".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_url: site::DEFAULT_SOURCE_URL.to_string(),
            login_url: site::DEFAULT_LOGIN_URL.to_string(),
            site_root: site::DEFAULT_SITE_ROOT.to_string(),
            team_slug_prefix: site::TEAM_SLUG_PREFIX.to_string(),
            database_path: None,
            log_file_path: None,
            http_timeout_seconds: constants::DEFAULT_HTTP_TIMEOUT_SECONDS,
            scraping_enabled: true,
            username: None,
            password: None,
            encrypted_username: None,
            encrypted_password: None,
            heuristics: Heuristics::default(),
            selectors: Selectors::default(),
            team_slugs: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location.
    /// Falls back to defaults when no file exists.
    /// Environment variables can override config file values.
    ///
    /// # Environment Variables
    /// - `BKGT_SOURCE_URL` - Override source URL
    /// - `BKGT_LOGIN_URL` - Override login URL
    /// - `BKGT_DATABASE` - Override SQLite database path
    /// - `BKGT_LOG_FILE` - Override log file path
    /// - `BKGT_HTTP_TIMEOUT` - Override HTTP timeout in seconds (default: 30)
    /// - `BKGT_USERNAME` / `BKGT_PASSWORD` - Plaintext credentials
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(AppError)` - Unreadable or invalid configuration
    pub async fn load() -> Result<Self, AppError> {
        let config_path = get_config_path();

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies `BKGT_*` environment overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(source_url) = std::env::var(env_vars::SOURCE_URL) {
            self.source_url = source_url;
        }

        if let Ok(login_url) = std::env::var(env_vars::LOGIN_URL) {
            self.login_url = login_url;
        }

        if let Ok(database) = std::env::var(env_vars::DATABASE) {
            self.database_path = Some(database);
        }

        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }

        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_seconds = timeout;
        }

        if let Ok(username) = std::env::var(env_vars::USERNAME) {
            self.username = Some(username);
        }

        if let Ok(password) = std::env::var(env_vars::PASSWORD) {
            self.password = Some(password);
        }
    }

    /// Validates the configuration settings
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(self)
    }

    /// SQLite path, falling back to the platform default.
    pub fn database_path(&self) -> String {
        self.database_path
            .clone()
            .unwrap_or_else(get_default_database_path)
    }

    /// Saves current configuration to the default config file location.
    pub async fn save(&self) -> Result<(), AppError> {
        let config_path = get_config_path();
        self.save_to_path(&config_path).await
    }

    /// Returns the platform-specific path for the config file.
    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays current configuration settings to stdout.
    ///
    /// Credentials are reported as configured or not, never printed.
    pub async fn display() -> Result<(), AppError> {
        let config_path = get_config_path();
        let log_dir = get_log_dir_path();

        if !Path::new(&config_path).exists() {
            println!("\nNo configuration file found at:");
            println!("{config_path}");
            println!("(Defaults and BKGT_* environment variables are used)");
            return Ok(());
        }

        let config = Config::load().await?;
        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("Config Location:");
        println!("{config_path}");
        println!("────────────────────────────────────");
        println!("Source URL:");
        println!("{}", config.source_url);
        println!("────────────────────────────────────");
        println!("Login URL:");
        println!("{}", config.login_url);
        println!("────────────────────────────────────");
        println!("Database:");
        println!("{}", config.database_path());
        println!("────────────────────────────────────");
        println!("HTTP Timeout:");
        println!("{} seconds", config.http_timeout_seconds);
        println!("────────────────────────────────────");
        println!("Scheduled scraping:");
        println!(
            "{}",
            if config.scraping_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("────────────────────────────────────");
        println!("Credentials:");
        println!("{}", config.credentials_summary());
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &config.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/{}", constants::LOG_FILE_NAME);
            println!("(Default location)");
        }

        Ok(())
    }

    fn credentials_summary(&self) -> &'static str {
        if self.username.is_some() && self.password.is_some() {
            "plaintext"
        } else if self.encrypted_username.is_some() && self.encrypted_password.is_some() {
            "encrypted"
        } else {
            "not configured"
        }
    }

    /// Saves configuration to a custom file path.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
