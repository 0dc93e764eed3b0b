//! Authenticated scraping of the club site.
//!
//! The [`Orchestrator`] logs in through the [`Authenticator`], pulls pages
//! with the [`AuthenticatedFetcher`], turns them into candidates with the
//! extractors and hands those to the ingestion layer.

pub mod auth;
pub mod extract;
pub mod fetcher;
pub mod http_client;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod run_lock;
pub mod session;
pub mod urls;

pub use auth::Authenticator;
pub use fetcher::AuthenticatedFetcher;
pub use ingest::IngestReport;
pub use orchestrator::{EventsOutcome, Orchestrator, ScrapeSummary};
pub use run_lock::{RunGuard, RunLock};
pub use session::{Cookie, Session};
pub use urls::UrlResolver;
