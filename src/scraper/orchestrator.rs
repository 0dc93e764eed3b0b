//! Drives scraping runs and keeps their provenance logs.

use chrono::{Datelike, Local};
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::auth::Authenticator;
use super::extract::{ExtractContext, Extractors};
use super::fetcher::AuthenticatedFetcher;
use super::http_client::create_http_client_with_timeout;
use super::ingest::{IngestReport, ingest_events, ingest_players, ingest_teams};
use super::run_lock::RunLock;
use super::session::Session;
use super::urls::UrlResolver;
use crate::config::Config;
use crate::credentials::CredentialSource;
use crate::error::AppError;
use crate::store::{RunKind, RunProgress, RunStatus, Store, TeamFilter};

/// Records added per kind. Kinds that were not run stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    pub teams: Option<u32>,
    pub players: Option<u32>,
    pub events: Option<u32>,
}

impl ScrapeSummary {
    pub fn total_added(&self) -> u32 {
        [self.teams, self.players, self.events]
            .into_iter()
            .flatten()
            .sum()
    }
}

/// Result of scraping the events page.
///
/// The events page does not exist on every deployment, so a failed fetch is
/// an expected outcome rather than an error.
#[derive(Debug)]
pub enum EventsOutcome {
    Ingested(IngestReport),
    SourceUnavailable(AppError),
}

/// A run log that has been opened and must be closed exactly once.
struct OpenRun<'s> {
    store: &'s dyn Store,
    id: i64,
    kind: RunKind,
}

impl<'s> OpenRun<'s> {
    fn start(store: &'s dyn Store, kind: RunKind, source_url: &str) -> Result<Self, AppError> {
        let id = store.start_run_log(kind, source_url)?;
        debug!("Opened {kind} run log {id} for {source_url}");
        Ok(OpenRun { store, id, kind })
    }

    fn progress(&self, progress: &RunProgress) -> Result<(), AppError> {
        self.store.update_run_log(self.id, progress)
    }

    /// Writes the final counts and closes the log as completed. If the counts
    /// cannot be written the log is closed as failed instead.
    fn complete(self, progress: &RunProgress) -> Result<(), AppError> {
        if let Err(e) = self.progress(progress) {
            self.fail(&format!("Could not record run counts: {e}"));
            return Err(e);
        }
        self.store
            .complete_run_log(self.id, RunStatus::Completed, None)?;
        debug!("Closed {} run log {} as completed", self.kind, self.id);
        Ok(())
    }

    /// Closes the log as failed. A store error here is logged, since the
    /// caller is already handling the original failure.
    fn fail(self, message: &str) {
        match self
            .store
            .complete_run_log(self.id, RunStatus::Failed, Some(message))
        {
            Ok(()) => debug!("Closed {} run log {} as failed", self.kind, self.id),
            Err(e) => error!(
                "Could not close {} run log {} as failed: {e}",
                self.kind, self.id
            ),
        }
    }

    /// Closes the log according to `outcome` and passes it through.
    fn close(self, outcome: Result<IngestReport, AppError>) -> Result<IngestReport, AppError> {
        match outcome {
            Ok(report) => {
                self.complete(&report.progress())?;
                Ok(report)
            }
            Err(e) => {
                self.fail(&e.to_string());
                Err(e)
            }
        }
    }
}

/// Entry point for manual and scheduled scrapes.
pub struct Orchestrator<S: Store, C: CredentialSource> {
    store: Arc<S>,
    credentials: C,
    client: Client,
    authenticator: Authenticator,
    resolver: UrlResolver,
    extractors: Extractors,
    expired_markers: Vec<String>,
    context: ExtractContext,
    current_year: Option<i32>,
    run_lock: RunLock,
}

impl<S: Store, C: CredentialSource> Orchestrator<S, C> {
    pub fn new(config: &Config, store: Arc<S>, credentials: C) -> Result<Self, AppError> {
        Ok(Orchestrator {
            store,
            credentials,
            client: create_http_client_with_timeout(config.http_timeout_seconds)?,
            authenticator: Authenticator::new(config)?,
            resolver: UrlResolver::new(config),
            extractors: Extractors::from_config(config)?,
            expired_markers: config.heuristics.session_expired_markers.clone(),
            context: ExtractContext::new(config, Local::now().year()),
            current_year: None,
            run_lock: RunLock::new(),
        })
    }

    /// Shares a run lock with other orchestrators over the same store.
    pub fn with_run_lock(mut self, run_lock: RunLock) -> Self {
        self.run_lock = run_lock;
        self
    }

    /// Pins the year used for team age bands and seasons.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    /// Replaces the extraction strategies built from config.
    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run_lock(&self) -> &RunLock {
        &self.run_lock
    }

    /// Runs one scrape of `kind` and returns the records added per kind.
    ///
    /// # Errors
    /// * `RunInProgress` - a run of the same kind is already executing
    /// * Auth errors - the session could not be established
    /// * Fetch errors - the teams page could not be fetched
    /// * Storage errors from the run log bookkeeping
    #[instrument(skip(self))]
    pub async fn run_scrape(&self, kind: RunKind) -> Result<ScrapeSummary, AppError> {
        match kind {
            RunKind::All => {
                let _guard = self.run_lock.acquire(RunKind::All)?;
                self.run_all().await
            }
            single => self.run_single(single).await,
        }
    }

    async fn run_single(&self, kind: RunKind) -> Result<ScrapeSummary, AppError> {
        let _guard = self.run_lock.acquire(kind)?;
        let mut summary = ScrapeSummary::default();
        match kind {
            RunKind::Teams => summary.teams = Some(self.run_teams().await?),
            RunKind::Players => summary.players = Some(self.run_players().await?),
            RunKind::Events => summary.events = Some(self.run_events().await?),
            RunKind::All => {
                return Err(AppError::config_error(
                    "The umbrella run cannot be nested in another run",
                ));
            }
        }
        Ok(summary)
    }

    async fn run_all(&self) -> Result<ScrapeSummary, AppError> {
        info!("Starting full scrape");
        let run = OpenRun::start(self.store(), RunKind::All, self.resolver.teams_url())?;

        let outcome = async {
            let teams = self.run_single(RunKind::Teams).await?;
            let players = self.run_single(RunKind::Players).await?;
            let events = self.run_single(RunKind::Events).await?;
            Ok::<_, AppError>(ScrapeSummary {
                teams: teams.teams,
                players: players.players,
                events: events.events,
            })
        }
        .await;

        match outcome {
            Ok(summary) => {
                run.complete(&RunProgress::added(summary.total_added()))?;
                info!(
                    "Full scrape completed: {} team(s), {} player(s), {} event(s) added",
                    summary.teams.unwrap_or_default(),
                    summary.players.unwrap_or_default(),
                    summary.events.unwrap_or_default()
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Full scrape failed: {e}");
                run.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn extract_context(&self) -> ExtractContext {
        ExtractContext {
            current_year: self.current_year.unwrap_or_else(|| Local::now().year()),
            ..self.context.clone()
        }
    }

    /// Builds the run's fetcher. Credentials are resolved here, once per run.
    fn fetcher(&self) -> Result<AuthenticatedFetcher, AppError> {
        Ok(AuthenticatedFetcher::new(
            self.client.clone(),
            self.authenticator.clone(),
            self.credentials.resolve_credentials()?,
            self.expired_markers.clone(),
        ))
    }

    /// Logs in with a fresh fetcher for one run.
    async fn open_session(&self) -> Result<(AuthenticatedFetcher, Session), AppError> {
        let fetcher = self.fetcher()?;
        let session = fetcher.login().await?;
        Ok((fetcher, session))
    }

    fn ingest_teams_page(&self, html: &str) -> IngestReport {
        let document = Html::parse_document(html);
        let context = self.extract_context();
        ingest_teams(
            self.store(),
            self.extractors.teams.extract(&document, &context),
        )
    }

    fn ingest_players_page(&self, html: &str, team_id: i64) -> IngestReport {
        let document = Html::parse_document(html);
        let context = self.extract_context().for_team(team_id);
        ingest_players(
            self.store(),
            self.extractors.players.extract(&document, &context),
        )
    }

    fn ingest_events_page(&self, html: &str) -> IngestReport {
        let document = Html::parse_document(html);
        let context = self.extract_context();
        ingest_events(
            self.store(),
            self.extractors.events.extract(&document, &context),
        )
    }

    #[instrument(skip(self))]
    async fn run_teams(&self) -> Result<u32, AppError> {
        let url = self.resolver.teams_url().to_string();
        info!("Starting teams run from {url}");
        let run = OpenRun::start(self.store(), RunKind::Teams, &url)?;

        let outcome = async {
            let (fetcher, mut session) = self.open_session().await?;
            let html = fetcher.fetch(&url, &mut session).await?;
            Ok::<_, AppError>(self.ingest_teams_page(&html))
        }
        .await;

        match run.close(outcome) {
            Ok(report) => {
                info!(
                    "Teams run completed: {} processed, {} added",
                    report.processed, report.added
                );
                Ok(report.added)
            }
            Err(e) => {
                error!("Teams run failed: {e}");
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn run_players(&self) -> Result<u32, AppError> {
        let url = self.resolver.teams_url().to_string();
        info!("Starting players run");
        let run = OpenRun::start(self.store(), RunKind::Players, &url)?;

        let outcome = self.scrape_rosters(&run).await;
        match run.close(outcome) {
            Ok(report) => {
                info!(
                    "Players run completed: {} processed, {} added, {} failed",
                    report.processed, report.added, report.failed
                );
                Ok(report.added)
            }
            Err(e) => {
                error!("Players run failed: {e}");
                Err(e)
            }
        }
    }

    /// Scrapes every stored team's roster, falling back to the generic
    /// players page once per team. Only auth and store errors end the run.
    async fn scrape_rosters(&self, run: &OpenRun<'_>) -> Result<IngestReport, AppError> {
        let (fetcher, mut session) = self.open_session().await?;
        let teams = self.store.get_teams(&TeamFilter::default())?;
        if teams.is_empty() {
            warn!("No teams stored, run a teams scrape first");
        }

        let mut total = IngestReport::default();
        for team in &teams {
            let primary_url = self.resolver.team_roster_url(team);
            let primary = self
                .scrape_roster(&fetcher, &mut session, &primary_url, team.id)
                .await;

            let report = match primary {
                Ok(report) => Some(report),
                Err(e) if e.is_auth_error() => return Err(e),
                Err(e) => {
                    warn!(
                        "Roster for {} failed ({e}), trying the players page",
                        team.source_id
                    );
                    let fallback_url = self.resolver.players_fallback_url();
                    match self
                        .scrape_roster(&fetcher, &mut session, &fallback_url, team.id)
                        .await
                    {
                        Ok(report) => Some(report),
                        Err(e) if e.is_auth_error() => return Err(e),
                        Err(e) => {
                            warn!("Skipping team {}: {e}", team.source_id);
                            None
                        }
                    }
                }
            };

            if let Some(report) = report {
                debug!(
                    "Team {}: {} player(s) added",
                    team.source_id, report.added
                );
                total.merge(report);
                run.progress(&total.progress())?;
            }
        }
        Ok(total)
    }

    /// One players page under its own run log.
    async fn scrape_roster(
        &self,
        fetcher: &AuthenticatedFetcher,
        session: &mut Session,
        url: &str,
        team_id: i64,
    ) -> Result<IngestReport, AppError> {
        let run = OpenRun::start(self.store(), RunKind::Players, url)?;
        let outcome = fetcher
            .fetch(url, session)
            .await
            .map(|html| self.ingest_players_page(&html, team_id));
        run.close(outcome)
    }

    #[instrument(skip(self))]
    async fn run_events(&self) -> Result<u32, AppError> {
        let url = self.resolver.events_url();
        info!("Starting events run from {url}");
        let run = OpenRun::start(self.store(), RunKind::Events, &url)?;

        match self.scrape_events(&url).await {
            Ok(EventsOutcome::Ingested(report)) => {
                run.complete(&report.progress())?;
                info!(
                    "Events run completed: {} processed, {} added, {} failed",
                    report.processed, report.added, report.failed
                );
                Ok(report.added)
            }
            Ok(EventsOutcome::SourceUnavailable(reason)) => {
                warn!("Events page unavailable, recording zero events: {reason}");
                run.fail(&format!(
                    "Events page unavailable on the source site, no events scraped: {reason}"
                ));
                Ok(0)
            }
            Err(e) => {
                error!("Events run failed: {e}");
                run.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch errors on the events page become [`EventsOutcome::SourceUnavailable`];
    /// auth errors still propagate.
    async fn scrape_events(&self, url: &str) -> Result<EventsOutcome, AppError> {
        let (fetcher, mut session) = self.open_session().await?;
        match fetcher.fetch(url, &mut session).await {
            Ok(html) => Ok(EventsOutcome::Ingested(self.ingest_events_page(&html))),
            Err(e) if e.is_fetch_error() => Ok(EventsOutcome::SourceUnavailable(e)),
            Err(e) => Err(e),
        }
    }
}
