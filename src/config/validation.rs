use crate::config::Config;
use crate::error::AppError;
use scraper::Selector;
use std::path::Path;

fn validate_url(name: &str, url: &str) -> Result<(), AppError> {
    if url.is_empty() {
        return Err(AppError::config_error(format!("{name} cannot be empty")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::config_error(format!(
            "{name} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Validates the configuration settings
///
/// # Validation Rules
/// - Source, login and site root URLs must be absolute http(s) URLs
/// - HTTP timeout must be positive
/// - Every configured CSS selector must parse
/// - Login failure markers cannot be empty strings
/// - Log file path parent directory must exist or be creatable
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    validate_url("Source URL", &config.source_url)?;
    validate_url("Login URL", &config.login_url)?;
    validate_url("Site root", &config.site_root)?;

    if config.http_timeout_seconds == 0 {
        return Err(AppError::config_error(
            "HTTP timeout must be at least one second",
        ));
    }

    if config
        .heuristics
        .login_failure_markers
        .iter()
        .any(|m| m.is_empty())
    {
        return Err(AppError::config_error(
            "Login failure markers cannot be empty strings",
        ));
    }

    let selectors = &config.selectors;
    for (name, css) in [
        ("team_links", &selectors.team_links),
        ("player_rows", &selectors.player_rows),
        ("player_link", &selectors.player_link),
        ("player_name", &selectors.player_name),
        ("player_position", &selectors.player_position),
        ("player_jersey", &selectors.player_jersey),
        ("event_rows", &selectors.event_rows),
        ("event_link", &selectors.event_link),
        ("event_title", &selectors.event_title),
        ("event_date", &selectors.event_date),
        ("event_location", &selectors.event_location),
    ] {
        if Selector::parse(css).is_err() {
            return Err(AppError::config_error(format!(
                "Selector '{name}' is not valid CSS: {css}"
            )));
        }
    }

    if let Some(log_path) = &config.log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
