// src/main.rs
mod app;
mod cli;
mod commands;
mod logging;

use bkgt_scraper::config::Config;
use bkgt_scraper::error::AppError;
use clap::Parser;
use cli::Args;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    commands::validate_args(&args)?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let (log_file_path, _guard) = logging::setup_logging(&args).await?;
    tracing::info!("Logs are being written to: {log_file_path}");

    if args.list_config {
        return commands::handle_list_config_command().await;
    }

    if args.new_source_url.is_some() {
        return commands::handle_config_update_command(&args).await;
    }

    if let Some(username) = &args.set_credentials {
        return commands::handle_set_credentials_command(username).await;
    }

    // Load config first to fail early if there's an issue
    let config = Config::load().await?;

    if let Some(limit) = args.logs {
        return commands::handle_logs_command(&config, &args, limit);
    }

    if args.stats {
        return commands::handle_stats_command(&config, &args);
    }

    if let Some(minutes) = args.interval {
        return app::run_scheduled(config, minutes, args.dry_run).await;
    }

    commands::handle_scrape_command(&config, &args).await
}
