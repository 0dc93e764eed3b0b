//! Maps extracted candidates into the store, skipping known natural keys.

use serde::Serialize;
use tracing::{debug, warn};

use super::models::{EventCandidate, PlayerCandidate, TeamCandidate};
use crate::error::AppError;
use crate::store::{RunProgress, Store};

/// Outcome counts for one batch of candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Candidates seen.
    pub processed: u32,
    /// New rows written.
    pub added: u32,
    /// Candidates whose natural key was already stored.
    pub duplicates: u32,
    /// Candidates rejected by validation or by the store.
    pub failed: u32,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.processed += other.processed;
        self.added += other.added;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }

    pub fn progress(&self) -> RunProgress {
        RunProgress::counts(self.processed, self.added, self.failed)
    }

    fn record(&mut self, outcome: Result<bool, AppError>, key: &str) {
        self.processed += 1;
        match outcome {
            Ok(true) => self.added += 1,
            Ok(false) => {
                debug!("Skipping known record {key}");
                self.duplicates += 1;
            }
            Err(e) => {
                warn!("Failed to store record {key}: {e}");
                self.failed += 1;
            }
        }
    }
}

/// Inserts a team unless its source id is already stored.
///
/// The existence check runs first so a duplicate is a plain `false` rather
/// than a constraint failure.
pub fn ingest_team(store: &dyn Store, team: &TeamCandidate) -> Result<bool, AppError> {
    if store.team_exists(&team.source_id)? {
        return Ok(false);
    }
    store.insert_team(team)
}

pub fn ingest_player(store: &dyn Store, player: &PlayerCandidate) -> Result<bool, AppError> {
    Ok(store.insert_player(player)?.is_some())
}

/// Inserts an event. Events without a parsed date or a title are rejected.
pub fn ingest_event(store: &dyn Store, event: &EventCandidate) -> Result<bool, AppError> {
    if event.event_date.is_none() {
        return Err(AppError::storage_error(format!(
            "Event {} has no parsable date",
            event.event_id
        )));
    }
    if event.title.trim().is_empty() {
        return Err(AppError::storage_error(format!(
            "Event {} has no title",
            event.event_id
        )));
    }
    Ok(store.insert_event(event)?.is_some())
}

pub fn ingest_teams(
    store: &dyn Store,
    teams: impl IntoIterator<Item = TeamCandidate>,
) -> IngestReport {
    let mut report = IngestReport::default();
    for team in teams {
        report.record(ingest_team(store, &team), &team.source_id);
    }
    report
}

pub fn ingest_players(
    store: &dyn Store,
    players: impl IntoIterator<Item = PlayerCandidate>,
) -> IngestReport {
    let mut report = IngestReport::default();
    for player in players {
        report.record(ingest_player(store, &player), &player.player_id);
    }
    report
}

pub fn ingest_events(
    store: &dyn Store,
    events: impl IntoIterator<Item = EventCandidate>,
) -> IngestReport {
    let mut report = IngestReport::default();
    for event in events {
        report.record(ingest_event(store, &event), &event.event_id);
    }
    report
}
