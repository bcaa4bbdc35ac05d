use tracing::warn;

use crate::models::{GameLogRow, GameRecord};
use crate::store::GameLogStore;

/// Upsert one game record. Failures are logged and reported as `false`.
pub async fn save_game_log(
    store: &dyn GameLogStore,
    player_key: &str,
    player_name: &str,
    record: &GameRecord,
) -> bool {
    let row = GameLogRow::from_record(player_key, player_name, record);
    match store.upsert_game_log(&row).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save game log ({}, {}): {}", player_key, record.date, e);
            false
        }
    }
}
