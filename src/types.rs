//! Core types for game-unpack

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storefront a game was obtained from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameShop {
    /// Steam catalogue entry
    Steam,
    /// Epic Games Store catalogue entry
    Epic,
    /// User-added game without a storefront entry
    Custom,
}

impl GameShop {
    /// Lowercase identifier used in keys and events
    pub fn as_str(&self) -> &'static str {
        match self {
            GameShop::Steam => "steam",
            GameShop::Epic => "epic",
            GameShop::Custom => "custom",
        }
    }
}

impl std::fmt::Display for GameShop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameShop {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "steam" => Ok(GameShop::Steam),
            "epic" => Ok(GameShop::Epic),
            "custom" => Ok(GameShop::Custom),
            other => Err(format!("unknown shop: {}", other)),
        }
    }
}

/// Composite key addressing both the download and the game record of one game
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameKey {
    /// Storefront the game belongs to
    pub shop: GameShop,
    /// Storefront-specific identifier
    pub object_id: String,
}

impl GameKey {
    /// Create a new key
    pub fn new(shop: GameShop, object_id: impl Into<String>) -> Self {
        Self {
            shop,
            object_id: object_id.into(),
        }
    }
}

/// Renders as `<shop>:<object_id>`, the primary key used by the record store
impl std::fmt::Display for GameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.shop, self.object_id)
    }
}

/// Download status
///
/// Moves forward only: downloading → extracting → installing → complete | error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Artifact is still being fetched (or has just been fetched)
    Downloading,
    /// Extraction in progress
    Extracting,
    /// Installer stage in progress
    Installing,
    /// Pipeline finished successfully
    Complete,
    /// Installer stage failed
    Error,
}

impl DownloadStatus {
    /// Lowercase name stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Extracting => "extracting",
            DownloadStatus::Installing => "installing",
            DownloadStatus::Complete => "complete",
            DownloadStatus::Error => "error",
        }
    }

    /// Parse a stored status name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "downloading" => Some(DownloadStatus::Downloading),
            "extracting" => Some(DownloadStatus::Extracting),
            "installing" => Some(DownloadStatus::Installing),
            "complete" => Some(DownloadStatus::Complete),
            "error" => Some(DownloadStatus::Error),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DownloadStatus::Downloading => 0,
            DownloadStatus::Extracting => 1,
            DownloadStatus::Installing => 2,
            DownloadStatus::Complete | DownloadStatus::Error => 3,
        }
    }

    /// Whether the pipeline may move a record from `self` to `next`
    ///
    /// `extracting` is tracked by the record's `extracting` flag while the
    /// archiver runs, so a record may enter `installing` straight from
    /// `downloading`. Terminal states accept nothing.
    pub fn can_advance_to(&self, next: DownloadStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            DownloadStatus::Installing => self.rank() < DownloadStatus::Installing.rank(),
            DownloadStatus::Complete | DownloadStatus::Error => *self == DownloadStatus::Installing,
            _ => next.rank() > self.rank(),
        }
    }

    /// Complete and error are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Complete | DownloadStatus::Error)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted download/extraction/installation state for one game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    /// Directory holding the downloaded artifact
    pub download_path: PathBuf,
    /// Artifact file name; replaced by the extracted directory name after extraction
    pub folder_name: Option<String>,
    /// True only while the archiver is running
    pub extracting: bool,
    /// Pipeline status
    pub status: DownloadStatus,
}

/// Display metadata for a game (read-only for the pipeline)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Display title
    pub title: String,
    /// Cover or icon URL shown alongside notifications
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// Why the installation stage reached `complete`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// An installer was found, ran, and reported success
    InstallerSucceeded,
    /// No installer was found at any candidate location
    NoInstaller,
}

/// Lifecycle event emitted to observers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Extraction stage finished
    ExtractionComplete {
        /// Storefront
        shop: GameShop,
        /// Storefront-specific identifier
        object_id: String,
        /// Whether the archive was extracted
        success: bool,
    },

    /// Installation stage started
    InstallationStart {
        /// Storefront
        shop: GameShop,
        /// Storefront-specific identifier
        object_id: String,
    },

    /// Installation stage finished successfully
    InstallationComplete {
        /// Storefront
        shop: GameShop,
        /// Storefront-specific identifier
        object_id: String,
        /// Whether an installer actually ran
        reason: CompletionReason,
    },

    /// Installation stage failed
    InstallationError {
        /// Storefront
        shop: GameShop,
        /// Storefront-specific identifier
        object_id: String,
        /// Human-readable failure detail
        message: String,
    },
}

impl Event {
    /// Key of the game this event refers to
    pub fn key(&self) -> GameKey {
        match self {
            Event::ExtractionComplete {
                shop, object_id, ..
            }
            | Event::InstallationStart { shop, object_id }
            | Event::InstallationComplete {
                shop, object_id, ..
            }
            | Event::InstallationError {
                shop, object_id, ..
            } => GameKey::new(*shop, object_id.clone()),
        }
    }
}

/// Result of one pipeline run
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Download or game record was absent; nothing was touched
    Skipped,
    /// The archiver failed; `extracting` was cleared and status left as it was
    ExtractionFailed {
        /// Failure detail for logs
        reason: String,
    },
    /// The record reached `complete`
    Installed {
        /// Whether an installer ran
        reason: CompletionReason,
    },
    /// The record reached `error`
    InstallationFailed {
        /// Failure detail, same text as the emitted event
        message: String,
    },
}
