//! Status transitions and the recovery path.
//!
//! Every transition persists the record first and emits its events second.

use crate::error::{Error, Result};
use crate::notifications::Notification;
use crate::types::{
    CompletionReason, DownloadRecord, DownloadStatus, Event, GameKey, GameRecord,
    PipelineOutcome,
};
use tracing::{error, info, warn};

use super::InstallPipeline;

impl InstallPipeline {
    pub(crate) async fn persist(&self, key: &GameKey, record: &DownloadRecord) -> Result<()> {
        self.store.put_download(key, record).await
    }

    /// Apply `update` to a copy, persist it, then adopt it
    ///
    /// On a store failure `record` keeps its last persisted state, which is
    /// what the recovery path works from.
    pub(crate) async fn commit(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
        update: impl FnOnce(&mut DownloadRecord),
    ) -> Result<()> {
        let mut next = record.clone();
        update(&mut next);
        self.persist(key, &next).await?;
        *record = next;
        Ok(())
    }

    /// Set the `extracting` flag before the archiver starts
    pub(crate) async fn mark_extracting(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
    ) -> Result<()> {
        self.commit(key, record, |r| r.extracting = true).await
    }

    /// Recovery path: clear the `extracting` flag and persist
    pub(crate) async fn clear_extracting(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
    ) -> Result<()> {
        self.commit(key, record, |r| r.extracting = false).await
    }

    /// Best-effort recovery after a store failure mid-pipeline
    ///
    /// The store just failed once, so this may fail too; that is logged and
    /// left to [`InstallPipeline::recover_interrupted`] on the next start.
    pub(crate) async fn recover_after_store_error(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
        cause: &Error,
    ) {
        if !record.extracting {
            return;
        }
        if let Err(e) = self.clear_extracting(key, record).await {
            error!(
                key = %key,
                error = %e,
                cause = %cause,
                "failed to clear extracting flag after store error"
            );
        }
    }

    /// Extraction failed: clear the flag, keep the status, emit a failed extraction-complete
    pub(crate) async fn fail_extraction(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
        reason: String,
    ) -> Result<PipelineOutcome> {
        warn!(key = %key, %reason, status = %record.status, "extraction failed");
        self.clear_extracting(key, record).await?;
        self.emit_event(Event::ExtractionComplete {
            shop: key.shop,
            object_id: key.object_id.clone(),
            success: false,
        });
        Ok(PipelineOutcome::ExtractionFailed { reason })
    }

    /// Extraction succeeded: point the record at the extracted directory, enter `installing`
    pub(crate) async fn complete_extraction(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
        folder_name: String,
    ) -> Result<()> {
        if !record.status.can_advance_to(DownloadStatus::Installing) {
            // A finished game whose files were downloaded again starts a new lifecycle
            info!(
                key = %key,
                from = %record.status,
                "restarting lifecycle for re-extracted game"
            );
        }
        self.commit(key, record, |r| {
            r.folder_name = Some(folder_name);
            r.extracting = false;
            r.status = DownloadStatus::Installing;
        })
        .await?;

        self.emit_event(Event::ExtractionComplete {
            shop: key.shop,
            object_id: key.object_id.clone(),
            success: true,
        });
        self.emit_event(Event::InstallationStart {
            shop: key.shop,
            object_id: key.object_id.clone(),
        });
        Ok(())
    }

    /// Installer stage settled: enter `complete` or `error`
    ///
    /// "Installer succeeded" and "no installer" share one terminal transition,
    /// told apart by the [`CompletionReason`].
    pub(crate) async fn finish_installation(
        &self,
        key: &GameKey,
        record: &mut DownloadRecord,
        game: &GameRecord,
        installer_result: Result<bool>,
    ) -> Result<PipelineOutcome> {
        match installer_result {
            Ok(ran) => {
                let reason = if ran {
                    CompletionReason::InstallerSucceeded
                } else {
                    CompletionReason::NoInstaller
                };
                self.commit(key, record, |r| {
                    r.extracting = false;
                    r.status = DownloadStatus::Complete;
                })
                .await?;

                info!(key = %key, ?reason, "installation complete");
                self.emit_event(Event::InstallationComplete {
                    shop: key.shop,
                    object_id: key.object_id.clone(),
                    reason,
                });

                if self.config.notifications.notify_on_complete {
                    self.notifier
                        .publish(Notification::installation_complete(key, game))
                        .await;
                }

                Ok(PipelineOutcome::Installed { reason })
            }
            Err(e) => {
                let message = e.to_string();
                self.commit(key, record, |r| {
                    r.extracting = false;
                    r.status = DownloadStatus::Error;
                })
                .await?;

                warn!(key = %key, error = %message, "installation failed");
                self.emit_event(Event::InstallationError {
                    shop: key.shop,
                    object_id: key.object_id.clone(),
                    message: message.clone(),
                });

                Ok(PipelineOutcome::InstallationFailed { message })
            }
        }
    }

    /// Clear `extracting` on records left behind by an interrupted run
    ///
    /// Call once at startup, before any pipeline runs. Records whose pipeline
    /// is running in this process are left alone. Returns the number of
    /// records repaired; status is never changed.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let stale = self.store.list_extracting().await?;
        let mut repaired = 0;

        for (key, mut record) in stale {
            if self.in_flight.contains(&key) {
                continue;
            }
            warn!(
                key = %key,
                status = %record.status,
                "clearing extracting flag left by interrupted run"
            );
            self.clear_extracting(&key, &mut record).await?;
            repaired += 1;
        }

        if repaired > 0 {
            info!(repaired, "recovered interrupted extractions");
        }
        Ok(repaired)
    }
}
