//! Database layer for game-unpack
//!
//! SQLite persistence for the two record kinds the pipeline works with.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - `migrations` - Database lifecycle, schema migrations
//! - `downloads` - Download record reads and upserts
//! - `games` - Game record reads and upserts
//!
//! The pipeline only sees the [`RecordStore`] trait, so hosts with their own
//! storage engine can plug it in instead of SQLite.

use crate::error::DatabaseError;
use crate::types::{DownloadRecord, DownloadStatus, GameKey, GameRecord, GameShop};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;

mod downloads;
mod games;
mod migrations;

/// Durable key-value storage for download and game records
///
/// Every `put_*` call replaces the whole record atomically; readers never see
/// a partially written record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the download record for a game, `None` if absent
    async fn get_download(&self, key: &GameKey) -> Result<Option<DownloadRecord>>;

    /// Create or replace the download record for a game
    async fn put_download(&self, key: &GameKey, record: &DownloadRecord) -> Result<()>;

    /// Load the game record for a game, `None` if absent
    async fn get_game(&self, key: &GameKey) -> Result<Option<GameRecord>>;

    /// Create or replace the game record for a game
    async fn put_game(&self, key: &GameKey, record: &GameRecord) -> Result<()>;

    /// All download records currently flagged as extracting
    async fn list_extracting(&self) -> Result<Vec<(GameKey, DownloadRecord)>>;
}

/// Download record row from database
#[derive(Debug, Clone, FromRow)]
pub struct DownloadRow {
    /// Rendered composite key (`<shop>:<object_id>`)
    pub game_key: String,
    /// Storefront identifier
    pub shop: String,
    /// Storefront-specific identifier
    pub object_id: String,
    /// Directory holding the downloaded artifact
    pub download_path: String,
    /// Artifact or extracted directory name
    pub folder_name: Option<String>,
    /// Extraction in progress flag
    pub extracting: bool,
    /// Stored status name
    pub status: String,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

impl DownloadRow {
    /// Decode the composite key stored in this row
    pub fn key(&self) -> Result<GameKey> {
        let shop = GameShop::from_str(&self.shop).map_err(|reason| {
            Error::Database(DatabaseError::CorruptRecord {
                key: self.game_key.clone(),
                reason,
            })
        })?;
        Ok(GameKey::new(shop, self.object_id.clone()))
    }
}

impl TryFrom<DownloadRow> for DownloadRecord {
    type Error = Error;

    fn try_from(row: DownloadRow) -> Result<Self> {
        let status = DownloadStatus::parse(&row.status).ok_or_else(|| {
            Error::Database(DatabaseError::CorruptRecord {
                key: row.game_key.clone(),
                reason: format!("unknown status '{}'", row.status),
            })
        })?;

        Ok(DownloadRecord {
            download_path: PathBuf::from(row.download_path),
            folder_name: row.folder_name,
            extracting: row.extracting,
            status,
        })
    }
}

/// Game record row from database
#[derive(Debug, Clone, FromRow)]
pub struct GameRow {
    /// Rendered composite key (`<shop>:<object_id>`)
    pub game_key: String,
    /// Display title
    pub title: String,
    /// Optional icon URL
    pub icon_url: Option<String>,
}

impl From<GameRow> for GameRecord {
    fn from(row: GameRow) -> Self {
        GameRecord {
            title: row.title,
            icon_url: row.icon_url,
        }
    }
}

/// Database handle for game-unpack
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl RecordStore for Database {
    async fn get_download(&self, key: &GameKey) -> Result<Option<DownloadRecord>> {
        Database::get_download(self, key).await
    }

    async fn put_download(&self, key: &GameKey, record: &DownloadRecord) -> Result<()> {
        self.upsert_download(key, record).await
    }

    async fn get_game(&self, key: &GameKey) -> Result<Option<GameRecord>> {
        Database::get_game(self, key).await
    }

    async fn put_game(&self, key: &GameKey, record: &GameRecord) -> Result<()> {
        self.upsert_game(key, record).await
    }

    async fn list_extracting(&self) -> Result<Vec<(GameKey, DownloadRecord)>> {
        self.list_extracting_downloads().await
    }
}
