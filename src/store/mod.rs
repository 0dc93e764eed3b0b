//! Persistence collaborator for the scraping pipeline.
//!
//! The pipeline only talks to the [`Store`] trait. [`SqliteStore`] is the
//! production backend and [`MemoryStore`] backs dry runs and tests.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::scraper::models::{EventCandidate, PlayerCandidate, TeamCandidate, TeamCategory};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Entity kind a run scrapes. `All` is the umbrella over the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Teams,
    Players,
    Events,
    All,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Teams => "teams",
            RunKind::Players => "players",
            RunKind::Events => "events",
            RunKind::All => "all",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "teams" => Ok(RunKind::Teams),
            "players" => Ok(RunKind::Players),
            "events" => Ok(RunKind::Events),
            "all" => Ok(RunKind::All),
            other => Err(format!(
                "unknown run kind '{other}', expected teams, players, events or all"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// Provenance record for one scraping attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub id: i64,
    pub kind: RunKind,
    pub status: RunStatus,
    pub records_processed: u32,
    pub records_added: u32,
    pub records_updated: u32,
    pub records_failed: u32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub source_url: String,
}

impl RunLog {
    /// Fresh log in the `running` state.
    pub fn open(id: i64, kind: RunKind, source_url: &str, started_at: DateTime<Utc>) -> Self {
        RunLog {
            id,
            kind,
            status: RunStatus::Running,
            records_processed: 0,
            records_added: 0,
            records_updated: 0,
            records_failed: 0,
            error_message: None,
            started_at,
            completed_at: None,
            duration_seconds: None,
            source_url: source_url.to_string(),
        }
    }

    pub fn apply_progress(&mut self, progress: &RunProgress) {
        if let Some(processed) = progress.records_processed {
            self.records_processed = processed;
        }
        if let Some(added) = progress.records_added {
            self.records_added = added;
        }
        if let Some(updated) = progress.records_updated {
            self.records_updated = updated;
        }
        if let Some(failed) = progress.records_failed {
            self.records_failed = failed;
        }
    }

    /// Moves the log to a terminal state and computes its duration.
    pub fn close(&mut self, status: RunStatus, error: Option<&str>, completed_at: DateTime<Utc>) {
        self.status = status;
        self.error_message = error.map(str::to_string);
        self.duration_seconds = Some((completed_at - self.started_at).num_seconds());
        self.completed_at = Some(completed_at);
    }
}

/// Partial counter update. Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunProgress {
    pub records_processed: Option<u32>,
    pub records_added: Option<u32>,
    pub records_updated: Option<u32>,
    pub records_failed: Option<u32>,
}

impl RunProgress {
    pub fn counts(processed: u32, added: u32, failed: u32) -> Self {
        RunProgress {
            records_processed: Some(processed),
            records_added: Some(added),
            records_updated: None,
            records_failed: Some(failed),
        }
    }

    pub fn added(added: u32) -> Self {
        RunProgress {
            records_added: Some(added),
            ..RunProgress::default()
        }
    }
}

/// Aggregate figures over every stored run log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    /// Mean duration of completed runs.
    pub avg_duration_seconds: Option<f64>,
    /// Sum of `records_processed` over completed runs.
    pub total_records_processed: u64,
}

impl RunStats {
    /// Folds a set of run logs into stats. Shared by the backends that keep
    /// logs in memory.
    pub fn from_logs<'a>(logs: impl IntoIterator<Item = &'a RunLog>) -> Self {
        let mut stats = RunStats::default();
        let mut completed_durations = Vec::new();

        for log in logs {
            stats.total_runs += 1;
            match log.status {
                RunStatus::Completed => {
                    stats.successful_runs += 1;
                    stats.total_records_processed += u64::from(log.records_processed);
                    if let Some(duration) = log.duration_seconds {
                        completed_durations.push(duration as f64);
                    }
                }
                RunStatus::Failed => stats.failed_runs += 1,
                RunStatus::Running => {}
            }
            if stats.last_run.is_none_or(|last| log.started_at > last) {
                stats.last_run = Some(log.started_at);
            }
        }

        if !completed_durations.is_empty() {
            stats.avg_duration_seconds =
                Some(completed_durations.iter().sum::<f64>() / completed_durations.len() as f64);
        }
        stats
    }
}

/// Team as stored locally, with the local id players reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: i64,
    pub name: String,
    pub source_id: String,
    pub source_url: String,
    pub category: TeamCategory,
    pub season: String,
}

impl TeamRecord {
    pub fn from_candidate(id: i64, team: &TeamCandidate) -> Self {
        TeamRecord {
            id,
            name: team.name.clone(),
            source_id: team.source_id.clone(),
            source_url: team.source_url.clone(),
            category: team.category,
            season: team.season.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamFilter {
    pub category: Option<TeamCategory>,
    pub limit: Option<usize>,
}

impl TeamFilter {
    pub fn matches(&self, team: &TeamRecord) -> bool {
        self.category.is_none_or(|category| team.category == category)
    }
}

/// Current time truncated to whole seconds, so a stored duration is exactly
/// the difference of the stored timestamps.
pub fn now_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Persistence operations the pipeline needs.
///
/// Inserts keyed on a natural key never fail on duplicates: they report
/// `false`/`None` instead.
pub trait Store: Send + Sync {
    fn team_exists(&self, source_id: &str) -> Result<bool, AppError>;

    /// Returns whether a new row was written.
    fn insert_team(&self, team: &TeamCandidate) -> Result<bool, AppError>;

    /// Returns the new row id, or `None` when the player id already exists.
    fn insert_player(&self, player: &PlayerCandidate) -> Result<Option<i64>, AppError>;

    /// Returns the new row id, or `None` when the event id already exists.
    fn insert_event(&self, event: &EventCandidate) -> Result<Option<i64>, AppError>;

    fn get_teams(&self, filter: &TeamFilter) -> Result<Vec<TeamRecord>, AppError>;

    fn start_run_log(&self, kind: RunKind, source_url: &str) -> Result<i64, AppError>;

    fn update_run_log(&self, id: i64, progress: &RunProgress) -> Result<(), AppError>;

    fn complete_run_log(
        &self,
        id: i64,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), AppError>;

    fn get_run_log(&self, id: i64) -> Result<Option<RunLog>, AppError>;

    /// Most recent first.
    fn get_run_logs(&self, limit: usize, kind: Option<RunKind>) -> Result<Vec<RunLog>, AppError>;

    fn run_stats(&self) -> Result<RunStats, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn closed_log(id: i64, status: RunStatus, processed: u32, seconds: i64) -> RunLog {
        let started = now_seconds();
        let mut log = RunLog::open(id, RunKind::Teams, "https://example.com", started);
        log.apply_progress(&RunProgress::counts(processed, processed, 0));
        log.close(status, None, started + Duration::seconds(seconds));
        log
    }

    #[test]
    fn test_run_kind_parsing() {
        assert_eq!("players".parse::<RunKind>(), Ok(RunKind::Players));
        assert_eq!("ALL".parse::<RunKind>(), Ok(RunKind::All));
        assert!("coaches".parse::<RunKind>().is_err());
        assert_eq!(RunKind::Events.to_string(), "events");
    }

    #[test]
    fn test_progress_only_touches_given_fields() {
        let mut log = RunLog::open(1, RunKind::Players, "u", now_seconds());
        log.apply_progress(&RunProgress::counts(5, 3, 1));
        log.apply_progress(&RunProgress::added(4));

        assert_eq!(log.records_processed, 5);
        assert_eq!(log.records_added, 4);
        assert_eq!(log.records_failed, 1);
        assert_eq!(log.records_updated, 0);
    }

    #[test]
    fn test_close_computes_duration() {
        let log = closed_log(1, RunStatus::Completed, 0, 42);
        assert_eq!(log.duration_seconds, Some(42));
        assert_eq!(log.status, RunStatus::Completed);
        assert!(log.completed_at.is_some());
    }

    #[test]
    fn test_stats_from_logs() {
        let logs = vec![
            closed_log(1, RunStatus::Completed, 10, 4),
            closed_log(2, RunStatus::Completed, 6, 8),
            closed_log(3, RunStatus::Failed, 99, 1),
        ];
        let stats = RunStats::from_logs(&logs);

        assert_eq!(stats.total_runs, 3);
        assert_eq!(stats.successful_runs, 2);
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.avg_duration_seconds, Some(6.0));
        assert_eq!(stats.total_records_processed, 16);
        assert!(stats.last_run.is_some());
    }

    #[test]
    fn test_stats_empty() {
        let stats = RunStats::from_logs(&[]);
        assert_eq!(stats, RunStats::default());
    }
}
