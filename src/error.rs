//! Error types for game-unpack
//!
//! This module provides the error taxonomy for the library:
//! - Extraction errors (wrong password, corrupt archive, failed cleanup)
//! - Installer errors (spawn failure, non-zero exit, timeout)
//! - Record store errors (connection, migration, query)
//!
//! Extraction and installer errors are normally absorbed by the pipeline and
//! turned into persisted status plus events. Only record store failures reach
//! the caller of [`crate::InstallPipeline`] as `Err`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for game-unpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for game-unpack
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "installer.binary_name")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Archive extraction or archive cleanup failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Installer stage failed
    #[error("installer error: {0}")]
    Installer(#[from] InstallerError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another pipeline is already running for this game
    #[error("a pipeline is already running for {key}")]
    PipelineBusy {
        /// Rendered composite key of the game
        key: String,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A stored value could not be decoded
    #[error("corrupt record {key}: {reason}")]
    CorruptRecord {
        /// Rendered composite key of the record
        key: String,
        /// What could not be decoded
        reason: String,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Wrong password for encrypted archive
    #[error("wrong password for encrypted archive {archive}")]
    WrongPassword {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
    },

    /// All passwords failed for archive extraction
    #[error("all {count} passwords failed for archive {archive}")]
    AllPasswordsFailed {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
        /// The number of passwords that were tried
        count: usize,
    },

    /// No passwords available (not even the empty one)
    #[error("no passwords available for archive {archive}")]
    NoPasswordsAvailable {
        /// The archive that was submitted
        archive: PathBuf,
    },

    /// Extension does not map to a supported archive format
    #[error("unsupported archive format: {archive}")]
    UnsupportedArchive {
        /// The file that was submitted
        archive: PathBuf,
    },

    /// A consumed archive could not be deleted
    #[error("failed to delete {path}: {reason}")]
    DeleteFailed {
        /// The file that could not be removed
        path: PathBuf,
        /// The underlying filesystem error
        reason: String,
    },

    /// One or more nested archives failed to extract
    #[error("{failed} of {total} nested archive(s) failed to extract")]
    NestedFailed {
        /// Number of extraction tasks that failed
        failed: usize,
        /// Number of extraction tasks submitted
        total: usize,
    },
}

/// Installer stage errors
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The installer executable could not be started
    #[error("failed to spawn installer {path}: {reason}")]
    SpawnFailed {
        /// Resolved installer path
        path: PathBuf,
        /// The underlying spawn error
        reason: String,
    },

    /// The installer exited with a non-zero code
    #[error("installer exited with exit code {code}")]
    NonZeroExit {
        /// Resolved installer path
        path: PathBuf,
        /// The exit code reported by the process
        code: i32,
    },

    /// The installer did not exit within the configured timeout
    #[error("installer {path} did not exit within {timeout:?}")]
    TimedOut {
        /// Resolved installer path
        path: PathBuf,
        /// The configured timeout
        timeout: Duration,
    },
}

impl Error {
    /// Whether this error came from the record store
    ///
    /// Store failures are the only ones the pipeline propagates to its caller.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Sqlx(_))
    }
}
