use crate::cli::Args;
use bkgt_scraper::config::Config;
use bkgt_scraper::config::user_prompts::prompt_for_password;
use bkgt_scraper::constants::{MAX_INTERVAL_MINUTES, env_vars};
use bkgt_scraper::credentials::{ConfigCredentials, encrypt_credential};
use bkgt_scraper::error::AppError;
use bkgt_scraper::scraper::{Orchestrator, ScrapeSummary};
use bkgt_scraper::store::{MemoryStore, RunKind, RunLog, SqliteStore, Store};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Validates command line argument combinations.
///
/// Returns an error if incompatible arguments are used together.
pub fn validate_args(args: &Args) -> Result<(), AppError> {
    if args.interval == Some(0) {
        return Err(AppError::config_error(
            "The scrape interval must be at least one minute",
        ));
    }
    if args.interval.is_some_and(|minutes| minutes > MAX_INTERVAL_MINUTES) {
        return Err(AppError::config_error(format!(
            "The scrape interval cannot exceed {MAX_INTERVAL_MINUTES} minutes"
        )));
    }
    if args.interval.is_some() && args.kind != RunKind::All {
        return Err(AppError::config_error(
            "Scheduled runs always scrape everything, --kind cannot be combined with --interval",
        ));
    }
    if args.logs == Some(0) {
        return Err(AppError::config_error("--logs needs a count of at least 1"));
    }
    Ok(())
}

/// Loads only what is stored in the config file, without environment
/// overrides, so saving it back never persists values taken from the
/// environment.
async fn load_stored_config() -> Result<Config, AppError> {
    let config_path = Config::get_config_path();
    if Path::new(&config_path).exists() {
        Config::load_from_path(&config_path).await
    } else {
        Ok(Config::default())
    }
}

/// Handles the --list-config command.
pub async fn handle_list_config_command() -> Result<(), AppError> {
    Config::display().await
}

/// Handles the --config-source-url command.
pub async fn handle_config_update_command(args: &Args) -> Result<(), AppError> {
    let mut config = load_stored_config().await?;

    if let Some(source_url) = &args.new_source_url {
        config.source_url = source_url.trim_end_matches('/').to_string();
    }

    config.validate()?;
    config.save().await?;
    println!("Config updated successfully!");

    Ok(())
}

/// Handles the --set-credentials command.
///
/// Prompts for the password, encrypts both values with the secret in
/// `BKGT_CREDENTIAL_KEY` and stores them in the config file. Plaintext
/// credentials in the file are removed.
pub async fn handle_set_credentials_command(username: &str) -> Result<(), AppError> {
    let secret = std::env::var(env_vars::CREDENTIAL_KEY).map_err(|_| {
        AppError::config_error(format!(
            "{} must be set to store encrypted credentials",
            env_vars::CREDENTIAL_KEY
        ))
    })?;
    if username.trim().is_empty() {
        return Err(AppError::config_error("Username cannot be empty"));
    }

    let password = prompt_for_password(username).await?;

    let mut config = load_stored_config().await?;
    config.encrypted_username = Some(encrypt_credential(username, &secret)?);
    config.encrypted_password = Some(encrypt_credential(&password, &secret)?);
    config.username = None;
    config.password = None;
    config.save().await?;

    info!("Stored encrypted credentials for {username}");
    println!("Credentials for {username} saved to {}", Config::get_config_path());

    Ok(())
}

fn format_run_log(log: &RunLog) -> String {
    let duration = log
        .duration_seconds
        .map(|s| format!("{s}s"))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "#{:<5} {:<8} {:<10} {}  processed {:>4}  added {:>4}  failed {:>4}  {:>6}",
        log.id,
        log.kind.as_str(),
        log.status.as_str(),
        log.started_at.format("%Y-%m-%d %H:%M:%S"),
        log.records_processed,
        log.records_added,
        log.records_failed,
        duration,
    );
    if let Some(message) = &log.error_message {
        line.push_str(&format!("\n       {message}"));
    }
    line
}

/// Handles the --logs command.
///
/// `--kind all` (the default) lists every kind rather than only the
/// umbrella runs.
pub fn handle_logs_command(config: &Config, args: &Args, limit: usize) -> Result<(), AppError> {
    let store = SqliteStore::open(config.database_path())?;
    let kind = (args.kind != RunKind::All).then_some(args.kind);
    let logs = store.get_run_logs(limit, kind)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    if logs.is_empty() {
        println!("No scraping runs recorded yet.");
        return Ok(());
    }
    for log in &logs {
        println!("{}", format_run_log(log));
    }
    Ok(())
}

/// Handles the --stats command.
pub fn handle_stats_command(config: &Config, args: &Args) -> Result<(), AppError> {
    let store = SqliteStore::open(config.database_path())?;
    let stats = store.run_stats()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total runs:         {}", stats.total_runs);
    println!("Successful runs:    {}", stats.successful_runs);
    println!("Failed runs:        {}", stats.failed_runs);
    println!(
        "Last run:           {}",
        stats
            .last_run
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "Average duration:   {}",
        stats
            .avg_duration_seconds
            .map(|s| format!("{s:.1}s"))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Records processed:  {}", stats.total_records_processed);
    Ok(())
}

fn print_summary(summary: &ScrapeSummary, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    for (label, added) in [
        ("Teams", summary.teams),
        ("Players", summary.players),
        ("Events", summary.events),
    ] {
        if let Some(added) = added {
            println!("{label:<8} {added} added");
        }
    }
    Ok(())
}

async fn scrape_into<S: Store>(
    config: &Config,
    store: Arc<S>,
    kind: RunKind,
    json: bool,
) -> Result<(), AppError> {
    let orchestrator = Orchestrator::new(config, store, ConfigCredentials::from_config(config))?;
    let summary = orchestrator.run_scrape(kind).await?;
    print_summary(&summary, json)
}

/// Handles a single manual run of `--kind`.
pub async fn handle_scrape_command(config: &Config, args: &Args) -> Result<(), AppError> {
    if args.dry_run {
        info!("Dry run, scraped records are kept in memory only");
        scrape_into(config, Arc::new(MemoryStore::new()), args.kind, args.json).await
    } else {
        let store = Arc::new(SqliteStore::open(config.database_path())?);
        scrape_into(config, store, args.kind, args.json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bkgt_scraper::store::{RunProgress, RunStatus, now_seconds};
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["bkgt_scraper"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&args(&[])).is_ok());
        assert!(validate_args(&args(&["--interval", "60"])).is_ok());
        assert!(validate_args(&args(&["--interval", "0"])).is_err());
        assert!(validate_args(&args(&["--interval", "10080"])).is_ok());
        assert!(validate_args(&args(&["--interval", "10081"])).is_err());
        assert!(validate_args(&args(&["--interval", "18446744073709551615"])).is_err());
        assert!(validate_args(&args(&["--interval", "5", "--kind", "teams"])).is_err());
        assert!(validate_args(&args(&["--logs", "0"])).is_err());
    }

    #[test]
    fn test_format_run_log() {
        let mut log = RunLog::open(7, RunKind::Events, "https://example.com", now_seconds());
        log.apply_progress(&RunProgress::counts(0, 0, 0));
        log.close(RunStatus::Failed, Some("Events page unavailable"), log.started_at);

        let line = format_run_log(&log);
        assert!(line.starts_with("#7"));
        assert!(line.contains("events"));
        assert!(line.contains("failed"));
        assert!(line.contains("0s"));
        assert!(line.ends_with("Events page unavailable"));
    }

    #[test]
    fn test_summary_json_keeps_skipped_kinds_null() {
        let summary = ScrapeSummary {
            teams: Some(2),
            players: None,
            events: None,
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["teams"], 2);
        assert!(json["players"].is_null());
    }
}
