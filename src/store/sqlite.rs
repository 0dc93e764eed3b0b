//! SQLite backend for the [`Store`] trait.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{
    RunKind, RunLog, RunProgress, RunStats, RunStatus, Store, TeamFilter, TeamRecord, now_seconds,
};
use crate::error::AppError;
use crate::scraper::models::{EventCandidate, PlayerCandidate, TeamCandidate, TeamCategory};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        source_id TEXT NOT NULL UNIQUE,
        source_url TEXT NOT NULL,
        category TEXT NOT NULL,
        season TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS players (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id TEXT NOT NULL UNIQUE,
        team_id INTEGER NULL REFERENCES teams(id),
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        position TEXT NOT NULL,
        birth_date TEXT NULL,
        jersey_number INTEGER NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);

    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        event_type TEXT NOT NULL,
        event_date TEXT NULL,
        location TEXT NOT NULL,
        opponent TEXT NULL,
        home_away TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_events_date ON events(event_date);

    CREATE TABLE IF NOT EXISTS scraping_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        records_processed INTEGER NOT NULL DEFAULT 0,
        records_added INTEGER NOT NULL DEFAULT 0,
        records_updated INTEGER NOT NULL DEFAULT 0,
        records_failed INTEGER NOT NULL DEFAULT 0,
        error_message TEXT NULL,
        started_at TEXT NOT NULL,
        completed_at TEXT NULL,
        duration_seconds INTEGER NULL,
        source_url TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_scraping_logs_kind ON scraping_logs(kind);
    CREATE INDEX IF NOT EXISTS idx_scraping_logs_started ON scraping_logs(started_at);
"#;

const RUN_LOG_COLUMNS: &str = "id, kind, status, records_processed, records_added, \
    records_updated, records_failed, error_message, started_at, completed_at, \
    duration_seconds, source_url";

/// Store backed by a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        debug!("Opening SQLite store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::storage_error("SQLite connection lock poisoned"))
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| AppError::storage_error(format!("Invalid timestamp '{value}': {e}")))
}

/// Row as read from `scraping_logs`, before typed conversion.
struct RawRunLog {
    id: i64,
    kind: String,
    status: String,
    records_processed: i64,
    records_added: i64,
    records_updated: i64,
    records_failed: i64,
    error_message: Option<String>,
    started_at: String,
    completed_at: Option<String>,
    duration_seconds: Option<i64>,
    source_url: String,
}

impl RawRunLog {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRunLog {
            id: row.get(0)?,
            kind: row.get(1)?,
            status: row.get(2)?,
            records_processed: row.get(3)?,
            records_added: row.get(4)?,
            records_updated: row.get(5)?,
            records_failed: row.get(6)?,
            error_message: row.get(7)?,
            started_at: row.get(8)?,
            completed_at: row.get(9)?,
            duration_seconds: row.get(10)?,
            source_url: row.get(11)?,
        })
    }

    fn into_run_log(self) -> Result<RunLog, AppError> {
        let count = |value: i64| u32::try_from(value).unwrap_or_default();
        Ok(RunLog {
            id: self.id,
            kind: self.kind.parse().map_err(AppError::storage_error)?,
            status: self.status.parse().map_err(AppError::storage_error)?,
            records_processed: count(self.records_processed),
            records_added: count(self.records_added),
            records_updated: count(self.records_updated),
            records_failed: count(self.records_failed),
            error_message: self.error_message,
            started_at: parse_timestamp(&self.started_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            duration_seconds: self.duration_seconds,
            source_url: self.source_url,
        })
    }
}

impl Store for SqliteStore {
    fn team_exists(&self, source_id: &str) -> Result<bool, AppError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM teams WHERE source_id = ?1",
                params![source_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_team(&self, team: &TeamCandidate) -> Result<bool, AppError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO teams(name, source_id, source_url, category, season, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                team.name,
                team.source_id,
                team.source_url,
                team.category.as_str(),
                team.season,
                timestamp(now_seconds()),
            ],
        )?;
        Ok(changed > 0)
    }

    fn insert_player(&self, player: &PlayerCandidate) -> Result<Option<i64>, AppError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO players(player_id, team_id, first_name, last_name, position,
                                           birth_date, jersey_number, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                player.player_id,
                player.team_id,
                player.first_name,
                player.last_name,
                player.position,
                player.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                player.jersey_number,
                player.status.as_str(),
                timestamp(now_seconds()),
            ],
        )?;
        Ok((changed > 0).then(|| conn.last_insert_rowid()))
    }

    fn insert_event(&self, event: &EventCandidate) -> Result<Option<i64>, AppError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO events(event_id, title, event_type, event_date, location,
                                          opponent, home_away, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.event_id,
                event.title,
                event.event_type.as_str(),
                event
                    .event_date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
                event.location,
                event.opponent,
                event.home_away.as_str(),
                event.status.as_str(),
                timestamp(now_seconds()),
            ],
        )?;
        Ok((changed > 0).then(|| conn.last_insert_rowid()))
    }

    fn get_teams(&self, filter: &TeamFilter) -> Result<Vec<TeamRecord>, AppError> {
        let conn = self.conn()?;
        let limit = filter
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT id, name, source_id, source_url, category, season
             FROM teams
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![filter.category.map(|c| c.as_str()), limit],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?;

        let mut teams = Vec::new();
        for row in rows {
            let (id, name, source_id, source_url, category, season) = row?;
            teams.push(TeamRecord {
                id,
                name,
                source_id,
                source_url,
                category: category
                    .parse::<TeamCategory>()
                    .map_err(AppError::storage_error)?,
                season,
            });
        }
        Ok(teams)
    }

    fn start_run_log(&self, kind: RunKind, source_url: &str) -> Result<i64, AppError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scraping_logs(kind, status, started_at, source_url)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.as_str(),
                RunStatus::Running.as_str(),
                timestamp(now_seconds()),
                source_url,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_run_log(&self, id: i64, progress: &RunProgress) -> Result<(), AppError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE scraping_logs
             SET records_processed = COALESCE(?1, records_processed),
                 records_added = COALESCE(?2, records_added),
                 records_updated = COALESCE(?3, records_updated),
                 records_failed = COALESCE(?4, records_failed)
             WHERE id = ?5",
            params![
                progress.records_processed,
                progress.records_added,
                progress.records_updated,
                progress.records_failed,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::storage_error(format!("No run log with id {id}")));
        }
        Ok(())
    }

    fn complete_run_log(
        &self,
        id: i64,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT started_at, status FROM scraping_logs WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((started_at, current)) = row else {
            return Err(AppError::storage_error(format!("No run log with id {id}")));
        };
        if current != RunStatus::Running.as_str() {
            return Err(AppError::storage_error(format!(
                "Run log {id} is already {current}"
            )));
        }

        let started_at = parse_timestamp(&started_at)?;
        let completed_at = now_seconds();
        let duration = (completed_at - started_at).num_seconds();
        conn.execute(
            "UPDATE scraping_logs
             SET status = ?1, error_message = ?2, completed_at = ?3, duration_seconds = ?4
             WHERE id = ?5",
            params![status.as_str(), error, timestamp(completed_at), duration, id],
        )?;
        Ok(())
    }

    fn get_run_log(&self, id: i64) -> Result<Option<RunLog>, AppError> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {RUN_LOG_COLUMNS} FROM scraping_logs WHERE id = ?1"),
                params![id],
                RawRunLog::from_row,
            )
            .optional()?;
        raw.map(RawRunLog::into_run_log).transpose()
    }

    fn get_run_logs(&self, limit: usize, kind: Option<RunKind>) -> Result<Vec<RunLog>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_LOG_COLUMNS} FROM scraping_logs
             WHERE ?1 IS NULL OR kind = ?1
             ORDER BY started_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(
            params![
                kind.map(|k| k.as_str()),
                i64::try_from(limit).unwrap_or(i64::MAX)
            ],
            RawRunLog::from_row,
        )?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.into_run_log()?);
        }
        Ok(logs)
    }

    fn run_stats(&self) -> Result<RunStats, AppError> {
        let conn = self.conn()?;
        let (total, successful, failed, last_run, avg_duration, processed) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
                    MAX(started_at),
                    AVG(CASE WHEN status = 'completed' THEN duration_seconds END),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN records_processed ELSE 0 END), 0)
             FROM scraping_logs",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        )?;

        let count = |value: i64| u64::try_from(value).unwrap_or_default();
        Ok(RunStats {
            total_runs: count(total),
            successful_runs: count(successful),
            failed_runs: count(failed),
            last_run: last_run.as_deref().map(parse_timestamp).transpose()?,
            avg_duration_seconds: avg_duration,
            total_records_processed: count(processed),
        })
    }
}
