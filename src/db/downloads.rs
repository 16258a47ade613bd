//! Download record reads and upserts.

use crate::error::DatabaseError;
use crate::types::{DownloadRecord, GameKey};
use crate::{Error, Result};
use tracing::warn;

use super::{Database, DownloadRow};

impl Database {
    /// Get the download record for a game
    pub async fn get_download(&self, key: &GameKey) -> Result<Option<DownloadRecord>> {
        let row = sqlx::query_as::<_, DownloadRow>(
            r#"
            SELECT
                game_key, shop, object_id, download_path, folder_name,
                extracting, status, updated_at
            FROM downloads
            WHERE game_key = ?
            "#,
        )
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get download: {}",
                e
            )))
        })?;

        row.map(DownloadRecord::try_from).transpose()
    }

    /// Insert or replace the download record for a game
    ///
    /// A single UPSERT statement, so the record is never half written.
    pub async fn upsert_download(&self, key: &GameKey, record: &DownloadRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO downloads (
                game_key, shop, object_id, download_path, folder_name,
                extracting, status, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(game_key) DO UPDATE SET
                download_path = excluded.download_path,
                folder_name = excluded.folder_name,
                extracting = excluded.extracting,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.to_string())
        .bind(key.shop.as_str())
        .bind(&key.object_id)
        .bind(record.download_path.to_string_lossy().into_owned())
        .bind(&record.folder_name)
        .bind(record.extracting)
        .bind(record.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert download: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// List every download record whose `extracting` flag is set
    ///
    /// Outside a running pipeline these are leftovers from an interrupted run.
    pub async fn list_extracting_downloads(&self) -> Result<Vec<(GameKey, DownloadRecord)>> {
        let rows = sqlx::query_as::<_, DownloadRow>(
            r#"
            SELECT
                game_key, shop, object_id, download_path, folder_name,
                extracting, status, updated_at
            FROM downloads
            WHERE extracting = 1
            ORDER BY updated_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list extracting downloads: {}",
                e
            )))
        })?;

        // One unreadable row must not block recovery of the others
        let mut downloads = Vec::with_capacity(rows.len());
        for row in rows {
            let game_key = row.game_key.clone();
            let decoded = row
                .key()
                .and_then(|key| DownloadRecord::try_from(row).map(|record| (key, record)));
            match decoded {
                Ok(entry) => downloads.push(entry),
                Err(e) => warn!(
                    game_key = %game_key,
                    error = %e,
                    "skipping corrupt download record flagged as extracting"
                ),
            }
        }
        Ok(downloads)
    }
}
