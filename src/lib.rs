//! BKGT club data scraper
//!
//! This library logs into svenskalag.se with the club's credentials, scrapes
//! teams, players and matches from the members pages and ingests them into a
//! local store, recording a provenance log for every run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bkgt_scraper::config::Config;
//! use bkgt_scraper::credentials::ConfigCredentials;
//! use bkgt_scraper::error::AppError;
//! use bkgt_scraper::scraper::Orchestrator;
//! use bkgt_scraper::store::{RunKind, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load().await?;
//!     let store = Arc::new(SqliteStore::open(config.database_path())?);
//!     let credentials = ConfigCredentials::from_config(&config);
//!
//!     let orchestrator = Orchestrator::new(&config, store, credentials)?;
//!     let summary = orchestrator.run_scrape(RunKind::All).await?;
//!     println!("{} records added", summary.total_added());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod scraper;
pub mod store;
pub mod testing_utils;

// Re-export commonly used types for convenience
pub use config::Config;
pub use credentials::{ConfigCredentials, CredentialSource, Credentials, StaticCredentials};
pub use error::AppError;
pub use scraper::{Orchestrator, ScrapeSummary};
pub use store::{MemoryStore, RunKind, RunLog, RunStatus, SqliteStore, Store};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
