//! Skip detection for dates that are already stored.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::warn;

use crate::dates::DateRange;
use crate::error::StoreError;
use crate::store::GameLogStore;

/// What to do when the existing-dates query fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingDatesPolicy {
    /// Assume nothing is stored and fetch every date
    #[default]
    FailOpen,
    /// Leave the player alone for this run
    SkipPlayer,
}

impl FromStr for ExistingDatesPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-open" | "fail_open" => Ok(Self::FailOpen),
            "skip-player" | "skip_player" => Ok(Self::SkipPlayer),
            other => Err(format!("unknown existing-dates policy: {}", other)),
        }
    }
}

/// Dates already stored for `player_key`. Under `FailOpen` a failed query is
/// logged and reported as an empty set; under `SkipPlayer` the error is
/// returned to the caller.
pub async fn existing_dates(
    store: &dyn GameLogStore,
    player_key: &str,
    policy: ExistingDatesPolicy,
) -> Result<HashSet<NaiveDate>, StoreError> {
    match store.existing_dates(player_key).await {
        Ok(dates) => Ok(dates),
        Err(e) => match policy {
            ExistingDatesPolicy::FailOpen => {
                warn!("Existing-dates query failed for {}: {} (assuming none)", player_key, e);
                Ok(HashSet::new())
            }
            ExistingDatesPolicy::SkipPlayer => Err(e),
        },
    }
}

/// Candidate dates in order, minus the ones already stored.
pub fn remaining_dates(range: &DateRange, existing: &HashSet<NaiveDate>) -> Vec<NaiveDate> {
    range.iter().filter(|d| !existing.contains(d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameLogRow;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    struct Broken;

    #[async_trait]
    impl GameLogStore for Broken {
        async fn existing_dates(&self, _player_key: &str) -> Result<HashSet<NaiveDate>, StoreError> {
            Err(StoreError::Unavailable("connection reset".to_string()))
        }

        async fn upsert_game_log(&self, _row: &GameLogRow) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection reset".to_string()))
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    #[tokio::test]
    async fn fail_open_yields_empty_set() {
        let dates = assert_ok!(existing_dates(&Broken, "nba.p.1", ExistingDatesPolicy::FailOpen).await);
        assert!(dates.is_empty());
    }

    #[tokio::test]
    async fn skip_player_surfaces_the_error() {
        assert_err!(existing_dates(&Broken, "nba.p.1", ExistingDatesPolicy::SkipPlayer).await);
    }

    #[test]
    fn subtracts_existing_in_order() {
        let range = DateRange::clamped(d(22), d(26), d(31));
        let existing = HashSet::from([d(23), d(25), d(1)]);
        assert_eq!(remaining_dates(&range, &existing), vec![d(22), d(24), d(26)]);
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("fail-open".parse::<ExistingDatesPolicy>(), Ok(ExistingDatesPolicy::FailOpen));
        assert_eq!("SKIP_PLAYER".parse::<ExistingDatesPolicy>(), Ok(ExistingDatesPolicy::SkipPlayer));
        assert!("retry".parse::<ExistingDatesPolicy>().is_err());
    }
}
