//! Game record reads and upserts.

use crate::error::DatabaseError;
use crate::types::{GameKey, GameRecord};
use crate::{Error, Result};

use super::{Database, GameRow};

impl Database {
    /// Get the game record for a game
    pub async fn get_game(&self, key: &GameKey) -> Result<Option<GameRecord>> {
        let row = sqlx::query_as::<_, GameRow>(
            "SELECT game_key, title, icon_url FROM games WHERE game_key = ?",
        )
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get game: {}",
                e
            )))
        })?;

        Ok(row.map(GameRecord::from))
    }

    /// Insert or replace the game record for a game
    pub async fn upsert_game(&self, key: &GameKey, record: &GameRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO games (game_key, shop, object_id, title, icon_url, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(game_key) DO UPDATE SET
                title = excluded.title,
                icon_url = excluded.icon_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.to_string())
        .bind(key.shop.as_str())
        .bind(&key.object_id)
        .bind(&record.title)
        .bind(&record.icon_url)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert game: {}",
                e
            )))
        })?;

        Ok(())
    }
}
