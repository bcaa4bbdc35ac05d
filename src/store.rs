//! Game log persistence keyed by (player_key, game_date).

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::GameLogRow;

#[async_trait]
pub trait GameLogStore: Send + Sync {
    /// Dates already stored for a player.
    async fn existing_dates(&self, player_key: &str) -> Result<HashSet<NaiveDate>, StoreError>;

    /// Insert or overwrite the row for (player_key, game_date).
    async fn upsert_game_log(&self, row: &GameLogRow) -> Result<(), StoreError>;
}

/// Postgres-backed store over the `player_game_logs` table
pub struct PgGameLogStore {
    pool: PgPool,
}

impl PgGameLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_retries: u32) -> Result<Self, StoreError> {
        let pool = Self::connect_with_retry(url, max_retries).await?;
        Ok(Self::new(pool))
    }

    async fn connect_with_retry(url: &str, max_retries: u32) -> Result<PgPool, StoreError> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("Connected to PostgreSQL");
                    return Ok(pool);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(StoreError::Database(e));
                    }
                    warn!("Database connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }
}

#[async_trait]
impl GameLogStore for PgGameLogStore {
    async fn existing_dates(&self, player_key: &str) -> Result<HashSet<NaiveDate>, StoreError> {
        let dates: Vec<NaiveDate> =
            sqlx::query_scalar("SELECT game_date FROM player_game_logs WHERE player_key = $1")
                .bind(player_key)
                .fetch_all(&self.pool)
                .await?;

        Ok(dates.into_iter().collect())
    }

    async fn upsert_game_log(&self, row: &GameLogRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO player_game_logs (
                player_key, player_name, game_date, stats, minutes_played,
                opponent, home_away, game_result, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (player_key, game_date) DO UPDATE SET
                player_name = EXCLUDED.player_name,
                stats = EXCLUDED.stats,
                minutes_played = EXCLUDED.minutes_played,
                opponent = EXCLUDED.opponent,
                home_away = EXCLUDED.home_away,
                game_result = EXCLUDED.game_result,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&row.player_key)
        .bind(&row.player_name)
        .bind(row.game_date)
        .bind(Json(&row.stats))
        .bind(row.minutes_played)
        .bind(&row.opponent)
        .bind(&row.home_away)
        .bind(&row.game_result)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-process store with the same upsert semantics. Backs `--dry-run`.
#[derive(Default)]
pub struct MemoryGameLogStore {
    rows: RwLock<BTreeMap<(String, NaiveDate), GameLogRow>>,
}

impl MemoryGameLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn get(&self, player_key: &str, date: NaiveDate) -> Option<GameLogRow> {
        let rows = self.rows.read().await;
        rows.get(&(player_key.to_string(), date)).cloned()
    }

    /// All rows ordered by natural key
    pub async fn rows(&self) -> Vec<GameLogRow> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl GameLogStore for MemoryGameLogStore {
    async fn existing_dates(&self, player_key: &str) -> Result<HashSet<NaiveDate>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .keys()
            .filter(|(key, _)| key == player_key)
            .map(|(_, date)| *date)
            .collect())
    }

    async fn upsert_game_log(&self, row: &GameLogRow) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.insert((row.player_key.clone(), row.game_date), row.clone());
        Ok(())
    }
}
