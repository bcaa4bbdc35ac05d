//! Per-(player, date) stat fetching and classification.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{GameRecord, StatMap, StatValue, MINUTES_PLAYED_STAT_ID};
use crate::source::{RawStat, StatsSource};

/// Result of asking the API about one player-day.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Game(GameRecord),
    NoGame,
    /// The call failed. Treated like `NoGame` by the backfill; the message is
    /// kept for diagnostics only.
    Error(String),
}

/// Coerce a raw stat value: anything containing a decimal point parses as a
/// float, everything else as an integer.
pub fn coerce_value(raw: &str) -> Option<StatValue> {
    let raw = raw.trim();
    if raw.contains('.') {
        raw.parse::<f64>().ok().map(StatValue::Float)
    } else {
        raw.parse::<i64>().ok().map(StatValue::Int)
    }
}

/// Build the stat map, dropping entries that do not coerce. Returns the map
/// and the ids that were dropped.
pub fn parse_stats(raw: &[RawStat]) -> (StatMap, Vec<String>) {
    let mut stats = StatMap::new();
    let mut dropped = Vec::new();

    for stat in raw {
        match coerce_value(&stat.value) {
            Some(value) => {
                stats.insert(stat.stat_id.clone(), value);
            }
            None => dropped.push(stat.stat_id.clone()),
        }
    }

    (stats, dropped)
}

/// A game record, or `None` when nothing is positive.
fn build_record(date: NaiveDate, stats: StatMap) -> Option<GameRecord> {
    if !stats.values().any(|v| v.is_positive()) {
        return None;
    }

    let minutes_played = stats.get(MINUTES_PLAYED_STAT_ID).copied();
    Some(GameRecord {
        date,
        stats,
        minutes_played,
        has_game: true,
    })
}

/// Fetch and classify one player-day. Never fails: every problem degrades to
/// `NoGame` or `Error`.
pub async fn fetch_game(source: &dyn StatsSource, player_key: &str, date: NaiveDate) -> FetchOutcome {
    let raw = match source.player_stats_by_date(player_key, date).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return FetchOutcome::NoGame,
        Err(e) if e.is_auth_failure() => {
            warn!("Yahoo rejected the access token for {} on {}: {}", player_key, date, e);
            return FetchOutcome::Error(e.to_string());
        }
        Err(e) => {
            debug!("Stats fetch failed for {} on {}: {}", player_key, date, e);
            return FetchOutcome::Error(e.to_string());
        }
    };

    let (stats, dropped) = parse_stats(&raw);
    if !dropped.is_empty() {
        debug!(
            "Dropped non-numeric stats for {} on {}: {:?}",
            player_key, date, dropped
        );
    }

    match build_record(date, stats) {
        Some(record) => FetchOutcome::Game(record),
        None => FetchOutcome::NoGame,
    }
}
