//! Yahoo Fantasy per-game stats backfill.
//!
//! Walks every player of a league through a season's dates, asks the Yahoo
//! API for that day's stat line and upserts played games into Postgres keyed
//! by (player_key, game_date). Re-runs skip dates that are already stored.

pub mod backfill;
pub mod config;
pub mod dates;
pub mod error;
pub mod existing;
pub mod fetch;
pub mod models;
pub mod pacing;
pub mod persist;
pub mod season;
pub mod signals;
pub mod source;
pub mod store;
pub mod yahoo;

pub use backfill::Backfiller;
pub use config::Config;
pub use models::{BatchStats, GameRecord, Player, SeasonTotals, SeasonWindow, StatValue};
pub use season::{SeasonRunner, SeasonTable};
