//! Pipeline entry point.

use crate::error::{ExtractionError, Result};
use crate::extraction::{ExtractionRequest, PasswordList, extract_all_in_directory};
use crate::types::{DownloadRecord, GameKey, GameRecord, PipelineOutcome};
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::InstallPipeline;

/// Name of the directory an artifact extracts into: the file name minus its last extension
pub fn extraction_dir_name(folder_name: &str) -> String {
    Path::new(folder_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder_name.to_string())
}

impl InstallPipeline {
    /// Extract a downloaded artifact and run the installer stage
    ///
    /// Loads the download and game records for `key`. When either is missing,
    /// or the download names no artifact, returns [`PipelineOutcome::Skipped`]
    /// without touching anything. Otherwise extracts
    /// `download_path/folder_name` into `download_path/<folder_name minus
    /// extension>`, extracts and removes nested archives, removes the artifact,
    /// and runs the installer.
    ///
    /// Extraction and installer failures are absorbed into the persisted record
    /// and the emitted events; the returned outcome says which path was taken.
    /// Only record store failures are returned as `Err`. On every return the
    /// persisted `extracting` flag is false, unless the store itself is down.
    pub async fn extract_downloaded_artifact(&self, key: &GameKey) -> Result<PipelineOutcome> {
        let _guard = self.in_flight.acquire(key)?;

        let Some(mut download) = self.store.get_download(key).await? else {
            warn!(key = %key, "no download record, skipping extraction");
            return Ok(PipelineOutcome::Skipped);
        };
        let Some(game) = self.store.get_game(key).await? else {
            warn!(key = %key, "no game record, skipping extraction");
            return Ok(PipelineOutcome::Skipped);
        };
        let Some(folder_name) = download.folder_name.clone() else {
            warn!(key = %key, "download record names no artifact, skipping extraction");
            return Ok(PipelineOutcome::Skipped);
        };

        match self
            .run_stages(key, &mut download, &game, &folder_name)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if !e.is_store_error() {
                    error!(key = %key, error = %e, "non-store error escaped the pipeline stages");
                }
                self.recover_after_store_error(key, &mut download, &e).await;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        key: &GameKey,
        download: &mut DownloadRecord,
        game: &GameRecord,
        folder_name: &str,
    ) -> Result<PipelineOutcome> {
        let file_path = download.download_path.join(folder_name);
        let dir_name = extraction_dir_name(folder_name);
        let extraction_path = download.download_path.join(&dir_name);

        info!(
            key = %key,
            artifact = ?file_path,
            destination = ?extraction_path,
            "extracting downloaded artifact"
        );

        self.mark_extracting(key, download).await?;

        let passwords = PasswordList::collect(&self.config.extraction).await;
        let request = ExtractionRequest::new(
            file_path.clone(),
            download.download_path.clone(),
            Some(extraction_path.clone()),
            passwords.clone(),
        );

        if let Err(e) = self.extractor.extract(&request).await {
            return self.fail_extraction(key, download, e.to_string()).await;
        }

        match extract_all_in_directory(
            self.extractor.as_ref(),
            &extraction_path,
            &passwords,
            &self.config.extraction.archive_extensions,
        )
        .await
        {
            Ok(nested) => {
                if let Some(failure) = nested.delete_failure {
                    self.on_delete_failure(key, download, &failure).await?;
                }
            }
            Err(e) => return self.fail_extraction(key, download, e.to_string()).await,
        }

        self.remove_artifact(key, download, &file_path, &extraction_path)
            .await?;

        self.complete_extraction(key, download, dir_name).await?;

        let installer_result = self.installer.run_installer_if_present().await;
        self.finish_installation(key, download, game, installer_result)
            .await
    }

    /// Remove the top-level artifact once its content is on disk
    async fn remove_artifact(
        &self,
        key: &GameKey,
        download: &mut DownloadRecord,
        file_path: &Path,
        extraction_path: &Path,
    ) -> Result<()> {
        if file_path == extraction_path
            || !path_exists(file_path).await
            || !path_exists(extraction_path).await
        {
            debug!(key = %key, artifact = ?file_path, "artifact not removable, keeping it");
            return Ok(());
        }

        match tokio::fs::remove_file(file_path).await {
            Ok(()) => {
                debug!(key = %key, artifact = ?file_path, "removed extracted artifact");
                Ok(())
            }
            Err(e) => {
                let failure = ExtractionError::DeleteFailed {
                    path: file_path.to_path_buf(),
                    reason: e.to_string(),
                };
                self.on_delete_failure(key, download, &failure).await
            }
        }
    }

    /// Deletion failures run the recovery path and the pipeline carries on
    async fn on_delete_failure(
        &self,
        key: &GameKey,
        download: &mut DownloadRecord,
        failure: &ExtractionError,
    ) -> Result<()> {
        warn!(key = %key, error = %failure, "failed to delete consumed archive");
        self.clear_extracting(key, download).await
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
