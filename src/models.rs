use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stat identifier of "minutes played" in Yahoo's NBA stat categories.
pub const MINUTES_PLAYED_STAT_ID: &str = "3";

/// A league roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub key: String,
    pub name: String,
    pub team: String,
    pub positions: Vec<String>,
}

impl Player {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            team: "UNK".to_string(),
            positions: Vec::new(),
        }
    }
}

/// A coerced stat value. Serializes as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
}

impl StatValue {
    pub fn as_f64(self) -> f64 {
        match self {
            StatValue::Int(v) => v as f64,
            StatValue::Float(v) => v,
        }
    }

    pub fn is_positive(self) -> bool {
        match self {
            StatValue::Int(v) => v > 0,
            StatValue::Float(v) => v > 0.0,
        }
    }
}

pub type StatMap = BTreeMap<String, StatValue>;

/// One player's stat line for one calendar day on which they played.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub stats: StatMap,
    pub minutes_played: Option<StatValue>,
    pub has_game: bool,
}

/// The persisted shape of a game record, keyed by (player_key, game_date).
#[derive(Debug, Clone, PartialEq)]
pub struct GameLogRow {
    pub player_key: String,
    pub player_name: String,
    pub game_date: NaiveDate,
    pub stats: StatMap,
    pub minutes_played: Option<f64>,
    pub opponent: Option<String>,
    pub home_away: Option<String>,
    pub game_result: Option<String>,
}

impl GameLogRow {
    /// Opponent, venue and result stay unset until a schedule source fills them.
    pub fn from_record(player_key: &str, player_name: &str, record: &GameRecord) -> Self {
        Self {
            player_key: player_key.to_string(),
            player_name: player_name.to_string(),
            game_date: record.date,
            stats: record.stats.clone(),
            minutes_played: record.minutes_played.map(StatValue::as_f64),
            opponent: None,
            home_away: None,
            game_result: None,
        }
    }
}

/// Inclusive date window of a named season
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Per-player backfill counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub player_key: String,
    pub player_name: String,
    /// Candidate dates left after filtering out existing ones
    pub total_dates: usize,
    pub existing_games: usize,
    pub new_games: usize,
    pub api_calls: usize,
    pub errors: usize,
}

impl BatchStats {
    pub fn for_player(player_key: &str, player_name: &str) -> Self {
        Self {
            player_key: player_key.to_string(),
            player_name: player_name.to_string(),
            ..Default::default()
        }
    }
}

/// Season-wide sums of [`BatchStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonTotals {
    pub total_players: usize,
    pub processed_players: usize,
    pub total_dates: usize,
    pub existing_games: usize,
    pub new_games: usize,
    pub api_calls: usize,
    pub errors: usize,
    pub interrupted: bool,
}

impl SeasonTotals {
    pub fn add(&mut self, stats: &BatchStats) {
        self.processed_players += 1;
        self.total_dates += stats.total_dates;
        self.existing_games += stats.existing_games;
        self.new_games += stats.new_games;
        self.api_calls += stats.api_calls;
        self.errors += stats.errors;
    }
}

/// A league the authenticated user belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueSummary {
    pub league_key: String,
    pub league_id: String,
    pub name: String,
    pub num_teams: Option<u32>,
}
