//! Per-player backfill: dates -> skip existing -> fetch + persist, paced.

use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::dates::DateRange;
use crate::existing::{existing_dates, remaining_dates, ExistingDatesPolicy};
use crate::fetch::{fetch_game, FetchOutcome};
use crate::models::{BatchStats, SeasonWindow};
use crate::pacing::Pacer;
use crate::persist::save_game_log;
use crate::signals::Interrupt;
use crate::source::StatsSource;
use crate::store::GameLogStore;

pub struct Backfiller<'a> {
    stats: &'a dyn StatsSource,
    store: &'a dyn GameLogStore,
    pacer: Pacer,
    policy: ExistingDatesPolicy,
    interrupt: Interrupt,
    today: Option<NaiveDate>,
}

impl<'a> Backfiller<'a> {
    pub fn new(stats: &'a dyn StatsSource, store: &'a dyn GameLogStore) -> Self {
        Self {
            stats,
            store,
            pacer: Pacer::default(),
            policy: ExistingDatesPolicy::default(),
            interrupt: Interrupt::new(),
            today: None,
        }
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_policy(mut self, policy: ExistingDatesPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Backfill one player over `window`. Lower-level failures end up in the
    /// returned counters; this never fails.
    pub async fn backfill_player(
        &self,
        player_key: &str,
        player_name: &str,
        window: SeasonWindow,
        skip_existing: bool,
    ) -> BatchStats {
        let mut stats = BatchStats::for_player(player_key, player_name);
        let range = DateRange::clamped(window.start, window.end, self.today());

        let existing = if skip_existing {
            match existing_dates(self.store, player_key, self.policy).await {
                Ok(dates) => dates,
                Err(e) => {
                    warn!("Skipping {} ({}): existing-dates query failed: {}", player_name, player_key, e);
                    stats.errors += 1;
                    return stats;
                }
            }
        } else {
            HashSet::new()
        };

        let dates = remaining_dates(&range, &existing);
        stats.total_dates = dates.len();
        stats.existing_games = existing.len();

        if dates.is_empty() {
            debug!("Nothing to fetch for {} ({})", player_name, player_key);
            return stats;
        }

        for date in dates {
            if self.interrupt.is_triggered() {
                info!("Interrupted during {} ({}) before {}", player_name, player_key, date);
                break;
            }

            stats.api_calls += 1;
            match fetch_game(self.stats, player_key, date).await {
                FetchOutcome::Game(record) => {
                    if save_game_log(self.store, player_key, player_name, &record).await {
                        stats.new_games += 1;
                    } else {
                        stats.errors += 1;
                    }
                }
                FetchOutcome::NoGame | FetchOutcome::Error(_) => {}
            }

            self.pacer.wait().await;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SourceError, StoreError};
    use crate::models::GameLogRow;
    use crate::source::RawStat;
    use crate::store::MemoryGameLogStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn window(start: u32, end: u32) -> SeasonWindow {
        SeasonWindow { start: d(start), end: d(end) }
    }

    /// Answers from a per-date script and records every requested date.
    #[derive(Default)]
    struct Scripted {
        days: HashMap<NaiveDate, Vec<RawStat>>,
        calls: Mutex<Vec<NaiveDate>>,
    }

    impl Scripted {
        fn game(mut self, date: NaiveDate, stats: &[(&str, &str)]) -> Self {
            let raw = stats.iter().map(|(id, v)| RawStat::new(*id, *v)).collect();
            self.days.insert(date, raw);
            self
        }

        fn calls(&self) -> Vec<NaiveDate> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatsSource for Scripted {
        async fn player_stats_by_date(
            &self,
            _player_key: &str,
            date: NaiveDate,
        ) -> Result<Option<Vec<RawStat>>, SourceError> {
            self.calls.lock().unwrap().push(date);
            match self.days.get(&date) {
                Some(raw) => Ok(Some(raw.clone())),
                None => Err(SourceError::Shape("no data".to_string())),
            }
        }
    }

    struct FailingWrites(MemoryGameLogStore);

    #[async_trait]
    impl GameLogStore for FailingWrites {
        async fn existing_dates(&self, player_key: &str) -> Result<HashSet<NaiveDate>, StoreError> {
            self.0.existing_dates(player_key).await
        }

        async fn upsert_game_log(&self, _row: &GameLogRow) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }
    }

    struct FailingReads;

    #[async_trait]
    impl GameLogStore for FailingReads {
        async fn existing_dates(&self, _player_key: &str) -> Result<HashSet<NaiveDate>, StoreError> {
            Err(StoreError::Unavailable("timeout".to_string()))
        }

        async fn upsert_game_log(&self, _row: &GameLogRow) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn quiet<'a>(source: &'a Scripted, store: &'a dyn GameLogStore) -> Backfiller<'a> {
        Backfiller::new(source, store)
            .with_pacer(Pacer::fixed(Duration::ZERO))
            .with_today(d(31))
    }

    #[tokio::test]
    async fn skips_dates_already_stored() {
        let source = Scripted::default().game(d(23), &[("12", "4")]);
        let store = MemoryGameLogStore::new();
        let first = quiet(&source, &store).backfill_player("nba.p.1", "P", window(22, 25), true).await;
        assert_eq!(first.new_games, 1);

        let source = Scripted::default();
        let second = quiet(&source, &store).backfill_player("nba.p.1", "P", window(22, 25), true).await;

        assert_eq!(source.calls(), vec![d(22), d(24), d(25)]);
        assert_eq!(second.total_dates, 3);
        assert_eq!(second.existing_games, 1);
        assert_eq!(second.api_calls, 3);
    }

    #[tokio::test]
    async fn refetch_ignores_stored_dates() {
        let store = MemoryGameLogStore::new();
        let seed = Scripted::default().game(d(22), &[("12", "4")]);
        quiet(&seed, &store).backfill_player("nba.p.1", "P", window(22, 22), true).await;

        let source = Scripted::default().game(d(22), &[("12", "9")]);
        let stats = quiet(&source, &store).backfill_player("nba.p.1", "P", window(22, 23), false).await;

        assert_eq!(stats.existing_games, 0);
        assert_eq!(stats.total_dates, 2);
        assert_eq!(stats.new_games, 1);
        assert_eq!(source.calls(), vec![d(22), d(23)]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn nothing_left_means_no_calls() {
        let source = Scripted::default();
        let store = MemoryGameLogStore::new();
        let backfiller = Backfiller::new(&source, &store)
            .with_pacer(Pacer::fixed(Duration::ZERO))
            .with_today(d(1));

        let stats = backfiller.backfill_player("nba.p.1", "P", window(22, 25), true).await;

        assert_eq!(stats.total_dates, 0);
        assert_eq!(stats.api_calls, 0);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn persistence_failures_are_counted() {
        let source = Scripted::default()
            .game(d(22), &[("12", "4")])
            .game(d(23), &[("12", "6")]);
        let store = FailingWrites(MemoryGameLogStore::new());

        let stats = quiet(&source, &store).backfill_player("nba.p.1", "P", window(22, 24), true).await;

        assert_eq!(stats.api_calls, 3);
        assert_eq!(stats.new_games, 0);
        assert_eq!(stats.errors, 2);
    }

    #[tokio::test]
    async fn failed_existing_query_fails_open_by_default() {
        let source = Scripted::default().game(d(22), &[("3", "30")]);
        let stats = quiet(&source, &FailingReads).backfill_player("nba.p.1", "P", window(22, 23), true).await;

        assert_eq!(stats.existing_games, 0);
        assert_eq!(stats.api_calls, 2);
        assert_eq!(stats.new_games, 1);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn failed_existing_query_can_skip_the_player() {
        let source = Scripted::default().game(d(22), &[("3", "30")]);
        let stats = quiet(&source, &FailingReads)
            .with_policy(ExistingDatesPolicy::SkipPlayer)
            .backfill_player("nba.p.1", "P", window(22, 23), true)
            .await;

        assert_eq!(stats.api_calls, 0);
        assert_eq!(stats.errors, 1);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn stops_between_dates_when_interrupted() {
        let source = Scripted::default();
        let store = MemoryGameLogStore::new();
        let backfiller = quiet(&source, &store);
        backfiller.interrupt().trigger();

        let stats = backfiller.backfill_player("nba.p.1", "P", window(22, 25), true).await;

        assert_eq!(stats.total_dates, 4);
        assert_eq!(stats.api_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_after_every_date_including_no_game() {
        let source = Scripted::default().game(d(22), &[("12", "4")]);
        let store = MemoryGameLogStore::new();
        let backfiller = Backfiller::new(&source, &store)
            .with_pacer(Pacer::fixed(Duration::from_millis(200)))
            .with_today(d(31));

        let start = tokio::time::Instant::now();
        let stats = backfiller.backfill_player("nba.p.1", "P", window(22, 24), true).await;

        assert_eq!(stats.api_calls, 3);
        assert!(start.elapsed() >= Duration::from_millis(600));
    }
}
