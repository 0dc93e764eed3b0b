//! In-memory [`Store`] used for dry runs and tests.

use std::sync::{Mutex, MutexGuard};

use super::{
    RunKind, RunLog, RunProgress, RunStats, RunStatus, Store, TeamFilter, TeamRecord, now_seconds,
};
use crate::error::AppError;
use crate::scraper::models::{EventCandidate, PlayerCandidate, TeamCandidate};

#[derive(Debug, Default)]
struct Inner {
    teams: Vec<TeamRecord>,
    players: Vec<(i64, PlayerCandidate)>,
    events: Vec<(i64, EventCandidate)>,
    run_logs: Vec<RunLog>,
}

/// Keeps everything in vectors behind a mutex. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        // The data stays consistent even if a holder panicked mid-call.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn teams(&self) -> Vec<TeamRecord> {
        self.inner().teams.clone()
    }

    pub fn players(&self) -> Vec<PlayerCandidate> {
        self.inner()
            .players
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<EventCandidate> {
        self.inner()
            .events
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Every run log in creation order.
    pub fn run_logs(&self) -> Vec<RunLog> {
        self.inner().run_logs.clone()
    }
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX - 1) + 1
}

impl Store for MemoryStore {
    fn team_exists(&self, source_id: &str) -> Result<bool, AppError> {
        Ok(self
            .inner()
            .teams
            .iter()
            .any(|t| t.source_id == source_id))
    }

    fn insert_team(&self, team: &TeamCandidate) -> Result<bool, AppError> {
        let mut inner = self.inner();
        if inner.teams.iter().any(|t| t.source_id == team.source_id) {
            return Ok(false);
        }
        let id = next_id(inner.teams.len());
        inner.teams.push(TeamRecord::from_candidate(id, team));
        Ok(true)
    }

    fn insert_player(&self, player: &PlayerCandidate) -> Result<Option<i64>, AppError> {
        let mut inner = self.inner();
        if inner
            .players
            .iter()
            .any(|(_, p)| p.player_id == player.player_id)
        {
            return Ok(None);
        }
        let id = next_id(inner.players.len());
        inner.players.push((id, player.clone()));
        Ok(Some(id))
    }

    fn insert_event(&self, event: &EventCandidate) -> Result<Option<i64>, AppError> {
        let mut inner = self.inner();
        if inner
            .events
            .iter()
            .any(|(_, e)| e.event_id == event.event_id)
        {
            return Ok(None);
        }
        let id = next_id(inner.events.len());
        inner.events.push((id, event.clone()));
        Ok(Some(id))
    }

    fn get_teams(&self, filter: &TeamFilter) -> Result<Vec<TeamRecord>, AppError> {
        Ok(self
            .inner()
            .teams
            .iter()
            .filter(|t| filter.matches(t))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn start_run_log(&self, kind: RunKind, source_url: &str) -> Result<i64, AppError> {
        let mut inner = self.inner();
        let id = next_id(inner.run_logs.len());
        inner
            .run_logs
            .push(RunLog::open(id, kind, source_url, now_seconds()));
        Ok(id)
    }

    fn update_run_log(&self, id: i64, progress: &RunProgress) -> Result<(), AppError> {
        let mut inner = self.inner();
        let log = inner
            .run_logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::storage_error(format!("No run log with id {id}")))?;
        log.apply_progress(progress);
        Ok(())
    }

    fn complete_run_log(
        &self,
        id: i64,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner();
        let log = inner
            .run_logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::storage_error(format!("No run log with id {id}")))?;
        if log.status != RunStatus::Running {
            return Err(AppError::storage_error(format!(
                "Run log {id} is already {}",
                log.status
            )));
        }
        log.close(status, error, now_seconds());
        Ok(())
    }

    fn get_run_log(&self, id: i64) -> Result<Option<RunLog>, AppError> {
        Ok(self.inner().run_logs.iter().find(|l| l.id == id).cloned())
    }

    fn get_run_logs(&self, limit: usize, kind: Option<RunKind>) -> Result<Vec<RunLog>, AppError> {
        Ok(self
            .inner()
            .run_logs
            .iter()
            .rev()
            .filter(|l| kind.is_none_or(|k| l.kind == k))
            .take(limit)
            .cloned()
            .collect())
    }

    fn run_stats(&self) -> Result<RunStats, AppError> {
        Ok(RunStats::from_logs(&self.inner().run_logs))
    }
}
