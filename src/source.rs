//! Remote capabilities the backfill depends on.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::SourceError;
use crate::models::Player;

/// One stat entry exactly as the API returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStat {
    pub stat_id: String,
    pub value: String,
}

impl RawStat {
    pub fn new(stat_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            stat_id: stat_id.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Raw stats for one player on one day. `Ok(None)` means the response
    /// carried no stats payload at all.
    async fn player_stats_by_date(
        &self,
        player_key: &str,
        date: NaiveDate,
    ) -> Result<Option<Vec<RawStat>>, SourceError>;
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Every player in the league, in listing order.
    async fn league_players(&self, league_key: &str) -> Result<Vec<Player>, SourceError>;
}
