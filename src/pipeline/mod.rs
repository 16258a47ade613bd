//! Extraction/installation orchestrator split into focused submodules.
//!
//! The `InstallPipeline` struct and its methods are organized by stage:
//! - `extract` - Entry point: artifact extraction, nested archives, cleanup
//! - `transitions` - Status transitions, the recovery path, crash recovery
//! - `guard` - Per-game single-flight guard

mod extract;
mod guard;
mod transitions;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::{Database, RecordStore};
use crate::error::Result;
use crate::extraction::{ArchiveExtractor, NativeExtractor};
use crate::installer::{Installer, InstallerRunner};
use crate::notifications::{Notifier, TracingNotifier};
use crate::types::Event;
use guard::InFlight;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Buffered events per subscriber before slow subscribers start lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
///
/// One call to [`InstallPipeline::extract_downloaded_artifact`] drives one
/// game from a downloaded archive to an installed directory. Calls for
/// different games are independent and may run concurrently; a second call for
/// a game that is already running is refused.
#[derive(Clone)]
pub struct InstallPipeline {
    /// Record store holding download and game records
    pub(crate) store: Arc<dyn RecordStore>,
    /// Archive extractor used for the artifact and nested archives
    pub(crate) extractor: Arc<dyn ArchiveExtractor>,
    /// Installer stage
    pub(crate) installer: Arc<dyn Installer>,
    /// User-facing notification sink
    pub(crate) notifier: Arc<dyn Notifier>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Games with a pipeline currently running
    pub(crate) in_flight: InFlight,
}

impl InstallPipeline {
    /// Create a pipeline backed by the SQLite database named in the config
    ///
    /// Uses the native extractor, the process-backed installer runner, and
    /// the tracing notifier.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let installer = InstallerRunner::new(config.installer.clone());

        tracing::info!(
            database = ?config.persistence.database_path,
            installer_candidates = installer.candidates().len(),
            "install pipeline initialized"
        );

        Ok(Self::with_components(
            config,
            Arc::new(db),
            Arc::new(NativeExtractor),
            Arc::new(installer),
            Arc::new(TracingNotifier),
        ))
    }

    /// Create a pipeline from explicit collaborators
    pub fn with_components(
        config: Config,
        store: Arc<dyn RecordStore>,
        extractor: Arc<dyn ArchiveExtractor>,
        installer: Arc<dyn Installer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            extractor,
            installer,
            notifier,
            event_tx,
            config: Arc::new(config),
            in_flight: InFlight::default(),
        }
    }

    /// Subscribe to lifecycle events
    ///
    /// Every event is sent after the record change it announces has been
    /// persisted, so a subscriber reading the store sees the new state.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record store the pipeline writes to
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
