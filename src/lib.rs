//! # game-unpack
//!
//! Extraction and silent-install pipeline for downloaded game archives.
//!
//! Once a game artifact (a RAR, 7z or ZIP archive, possibly split into
//! volumes) has finished downloading, [`InstallPipeline`] extracts it next to
//! the download, extracts and removes any archives found inside, deletes the
//! consumed artifact, and runs an optional silent installer shipped with the
//! host application. Progress is persisted to a record store and announced on
//! an event channel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use game_unpack::{Config, GameKey, GameShop, InstallPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = InstallPipeline::new(Config::default()).await?;
//!
//!     // Clear flags left behind by a crash before starting new work
//!     pipeline.recover_interrupted().await?;
//!
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = pipeline
//!         .extract_downloaded_artifact(&GameKey::new(GameShop::Steam, "1091500"))
//!         .await?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Record store (SQLite persistence layer)
pub mod db;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Installer discovery and execution
pub mod installer;
/// User-facing notifications
pub mod notifications;
/// Extraction and installation orchestrator
pub mod pipeline;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, RecordStore};
pub use error::{DatabaseError, Error, ExtractionError, InstallerError, Result};
pub use extraction::{ArchiveExtractor, ExtractionRequest, NativeExtractor, PasswordList};
pub use installer::{Installer, InstallerRunner};
pub use notifications::{Notification, Notifier, TracingNotifier};
pub use pipeline::InstallPipeline;
pub use types::{
    CompletionReason, DownloadRecord, DownloadStatus, Event, GameKey, GameRecord, GameShop,
    PipelineOutcome,
};
