use bkgt_scraper::config::Config;
use bkgt_scraper::credentials::ConfigCredentials;
use bkgt_scraper::error::AppError;
use bkgt_scraper::scraper::Orchestrator;
use bkgt_scraper::store::{MemoryStore, RunKind, SqliteStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

/// Run the scheduled scraping loop until Ctrl+C.
///
/// - Runs a full scrape every `minutes`, starting immediately
/// - Skips a tick when scheduled scraping is disabled in the config
/// - Failed runs are logged and the loop keeps going
pub async fn run_scheduled(config: Config, minutes: u64, dry_run: bool) -> Result<(), AppError> {
    if dry_run {
        info!("Dry run, scraped records are kept in memory only");
        schedule(config, Arc::new(MemoryStore::new()), minutes).await
    } else {
        let store = Arc::new(SqliteStore::open(config.database_path())?);
        schedule(config, store, minutes).await
    }
}

async fn schedule<S: Store>(config: Config, store: Arc<S>, minutes: u64) -> Result<(), AppError> {
    let orchestrator = Orchestrator::new(&config, store, ConfigCredentials::from_config(&config))?;
    let mut ticker = interval(tick_period(minutes));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Scheduled scraping every {minutes} minute(s), press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !scraping_enabled(&config).await {
                    info!("Scheduled scraping is disabled, skipping this run");
                    continue;
                }
                match orchestrator.run_scrape(RunKind::All).await {
                    Ok(summary) => info!(
                        "Scheduled scrape finished, {} record(s) added",
                        summary.total_added()
                    ),
                    Err(e) => error!("Scheduled scrape failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping scheduled scraping");
                return Ok(());
            }
        }
    }
}

/// Time between scheduled runs. Absurdly large intervals saturate.
fn tick_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Re-reads the switch so it can be flipped without a restart.
async fn scraping_enabled(startup: &Config) -> bool {
    match Config::load().await {
        Ok(config) => config.scraping_enabled,
        Err(e) => {
            warn!("Could not reload config, using startup settings: {e}");
            startup.scraping_enabled
        }
    }
}
