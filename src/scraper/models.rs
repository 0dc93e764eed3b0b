//! Candidate records produced by the extractors and consumed by ingestion.
//!
//! Candidates are never stored verbatim; only the outcome of inserting them
//! survives a run.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::age_bands;

/// Age band a team belongs to, derived from the birth year in its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamCategory {
    /// Under 14
    #[serde(rename = "Barn")]
    Children,
    /// 14 to 20
    #[serde(rename = "Ungdom")]
    Youth,
    /// 21 and over
    #[serde(rename = "Senior")]
    Senior,
}

impl TeamCategory {
    /// Classifies a team by the age its players turn this year.
    pub fn from_birth_year(birth_year: i32, current_year: i32) -> Self {
        let age = current_year - birth_year;
        if age < age_bands::YOUTH_MIN_AGE {
            TeamCategory::Children
        } else if age < age_bands::SENIOR_MIN_AGE {
            TeamCategory::Youth
        } else {
            TeamCategory::Senior
        }
    }

    /// Label used by the club site and stored with the team.
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamCategory::Children => "Barn",
            TeamCategory::Youth => "Ungdom",
            TeamCategory::Senior => "Senior",
        }
    }
}

impl fmt::Display for TeamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "barn" | "children" => Ok(TeamCategory::Children),
            "ungdom" | "youth" => Ok(TeamCategory::Youth),
            "senior" => Ok(TeamCategory::Senior),
            other => Err(format!("unknown team category: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCandidate {
    pub name: String,
    /// Natural key, e.g. `P2013`.
    pub source_id: String,
    pub source_url: String,
    pub category: TeamCategory,
    pub season: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Active,
    Inactive,
    Injured,
    Suspended,
}

impl PlayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerStatus::Active => "active",
            PlayerStatus::Inactive => "inactive",
            PlayerStatus::Injured => "injured",
            PlayerStatus::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCandidate {
    /// Natural key taken from the player's profile link.
    pub player_id: String,
    /// Local id of the team whose roster the player was found on.
    pub team_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub birth_date: Option<NaiveDate>,
    pub jersey_number: Option<u8>,
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Match,
    Training,
    Meeting,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Match => "match",
            EventType::Training => "training",
            EventType::Meeting => "meeting",
            EventType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    #[default]
    Home,
    Away,
}

impl HomeAway {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeAway::Home => "home",
            HomeAway::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCandidate {
    /// Natural key taken from the match link.
    pub event_id: String,
    pub title: String,
    pub event_type: EventType,
    /// `None` when the date cell could not be parsed. Ingestion rejects these.
    pub event_date: Option<NaiveDateTime>,
    pub location: String,
    pub opponent: Option<String>,
    pub home_away: HomeAway,
    pub status: EventStatus,
}
