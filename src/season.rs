//! Whole-league backfill over a named season window.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::backfill::Backfiller;
use crate::error::RunError;
use crate::models::{BatchStats, SeasonTotals, SeasonWindow};
use crate::source::RosterSource;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Immutable lookup from season label to its date window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonTable {
    seasons: BTreeMap<String, SeasonWindow>,
}

impl SeasonTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, SeasonWindow)>,
        S: Into<String>,
    {
        Self {
            seasons: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// NBA regular season through the finals
    pub fn builtin() -> Self {
        let window = |start: (i32, u32, u32), end: (i32, u32, u32)| SeasonWindow {
            start: ymd(start),
            end: ymd(end),
        };
        Self::new([
            ("2025-26", window((2025, 10, 21), (2026, 6, 30))),
            ("2024-25", window((2024, 10, 22), (2025, 6, 17))),
            ("2023-24", window((2023, 10, 24), (2024, 6, 17))),
        ])
    }

    pub fn get(&self, label: &str) -> Option<SeasonWindow> {
        self.seasons.get(label).copied()
    }

    /// Like `get`, but an unknown label is an error naming the known ones.
    pub fn resolve(&self, label: &str) -> Result<SeasonWindow, RunError> {
        self.get(label).ok_or_else(|| RunError::UnknownSeason {
            label: label.to_string(),
            known: self.labels().join(", "),
        })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.seasons.keys().map(String::as_str).collect()
    }

    /// Newest season first
    pub fn iter(&self) -> impl Iterator<Item = (&str, SeasonWindow)> {
        self.seasons.iter().rev().map(|(k, v)| (k.as_str(), *v))
    }
}

fn ymd((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

pub struct SeasonRunner<'a> {
    roster: &'a dyn RosterSource,
    backfiller: Backfiller<'a>,
    seasons: &'a SeasonTable,
}

impl<'a> SeasonRunner<'a> {
    pub fn new(roster: &'a dyn RosterSource, backfiller: Backfiller<'a>, seasons: &'a SeasonTable) -> Self {
        Self {
            roster,
            backfiller,
            seasons,
        }
    }

    /// Backfill every player of `league_key` for `season`, at most
    /// `max_players` of them. Stops early, still reporting totals, when the
    /// interrupt flag is raised.
    pub async fn run(
        &self,
        league_key: &str,
        season: &str,
        max_players: Option<usize>,
    ) -> Result<SeasonTotals, RunError> {
        let window = self.seasons.resolve(season).map_err(|err| {
            error!("{}", err);
            err
        })?;

        println!("\n{}", RULE);
        println!("Backfilling season {}", season);
        println!("Date range: {} to {}", window.start, window.end);
        println!("{}\n", RULE);

        let mut players = match self.roster.league_players(league_key).await {
            Ok(players) if players.is_empty() => {
                let err = RunError::EmptyRoster(league_key.to_string());
                error!("{}", err);
                return Err(err);
            }
            Ok(players) => players,
            Err(source) => {
                let err = RunError::Roster {
                    league_key: league_key.to_string(),
                    source,
                };
                error!("{}", err);
                return Err(err);
            }
        };
        info!("Found {} players in {}", players.len(), league_key);

        if let Some(cap) = max_players.filter(|n| *n > 0) {
            players.truncate(cap);
            println!("Limiting run to the first {} players\n", cap);
        }

        let mut totals = SeasonTotals {
            total_players: players.len(),
            ..Default::default()
        };

        for (i, player) in players.iter().enumerate() {
            if self.backfiller.interrupt().is_triggered() {
                break;
            }

            println!("\n[{}/{}] {} ({})", i + 1, players.len(), player.name, player.key);
            println!("{}", THIN_RULE);

            let stats = self
                .backfiller
                .backfill_player(&player.key, &player.name, window, true)
                .await;
            totals.add(&stats);
            print_progress(&stats);
            info!(
                "Finished {} ({}): {} new, {} calls, {} errors",
                player.name, player.key, stats.new_games, stats.api_calls, stats.errors
            );
        }

        totals.interrupted = self.backfiller.interrupt().is_triggered();
        print_summary(&totals);
        Ok(totals)
    }
}

fn print_progress(stats: &BatchStats) {
    for line in progress_lines(stats) {
        println!("{}", line);
    }
}

pub fn progress_lines(stats: &BatchStats) -> Vec<String> {
    vec![
        format!("  existing: {} games", stats.existing_games),
        format!("  new: {} games", stats.new_games),
        format!("  API calls: {}", stats.api_calls),
        format!("  errors: {}", stats.errors),
    ]
}

pub fn print_summary(totals: &SeasonTotals) {
    println!("\n{}", RULE);
    if totals.interrupted {
        println!("Backfill interrupted");
    } else {
        println!("Backfill complete");
    }
    println!("{}", RULE);
    for line in summary_lines(totals) {
        println!("{}", line);
    }
    println!("{}\n", RULE);
}

pub fn summary_lines(totals: &SeasonTotals) -> Vec<String> {
    vec![
        format!("Players processed: {}/{}", totals.processed_players, totals.total_players),
        format!("Dates checked: {}", totals.total_dates),
        format!("New games: {}", totals.new_games),
        format!("Already stored: {}", totals.existing_games),
        format!("API calls: {}", totals.api_calls),
        format!("Errors: {}", totals.errors),
    ]
}
