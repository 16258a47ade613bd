//! Nested archive extraction.
//!
//! Game archives often wrap further archives (a `setup.zip` next to a split
//! `data.partN.rar` set). One pass over the extraction root handles them:
//! every first volume is extracted in place, concurrently, then every matched
//! archive file is removed.

use crate::error::{Error, ExtractionError, Result};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::shared::is_archive;
use super::volumes::is_first_volume;
use super::{ArchiveExtractor, ExtractionRequest, PasswordList};

/// What a nested extraction pass did
#[derive(Debug, Default)]
pub struct NestedExtraction {
    /// Archives handed to the extractor (first volumes only)
    pub submitted: Vec<PathBuf>,
    /// Archive files removed afterwards, later volumes included
    pub deleted: Vec<PathBuf>,
    /// First deletion failure, if any; later ones are only logged
    pub delete_failure: Option<ExtractionError>,
}

impl NestedExtraction {
    /// True when the directory held no archives
    pub fn is_noop(&self) -> bool {
        self.submitted.is_empty() && self.deleted.is_empty() && self.delete_failure.is_none()
    }
}

/// Extract every archive directly inside `dir`, then delete the archive files
///
/// Only the first volume of a `partN.rar` set is submitted; the other volumes
/// are consumed by that extraction and deleted with the rest. All extractions
/// run concurrently and are awaited to completion, even when one fails.
/// Deletion runs after every extraction has settled, whatever the outcome.
///
/// Returns [`ExtractionError::NestedFailed`] if any extraction failed. A
/// missing directory, or one without archives, is a no-op.
pub async fn extract_all_in_directory(
    extractor: &dyn ArchiveExtractor,
    dir: &Path,
    passwords: &PasswordList,
    archive_extensions: &[String],
) -> Result<NestedExtraction> {
    let matched = match find_archives(dir, archive_extensions).await {
        Ok(matched) => matched,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?dir, "extraction directory does not exist, nothing nested");
            return Ok(NestedExtraction::default());
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if matched.is_empty() {
        debug!(?dir, "no nested archives found");
        return Ok(NestedExtraction::default());
    }

    let submitted: Vec<PathBuf> = matched
        .iter()
        .filter(|path| is_first_volume(path))
        .cloned()
        .collect();

    info!(
        ?dir,
        matched = matched.len(),
        submitted = submitted.len(),
        "extracting nested archives"
    );

    let requests: Vec<ExtractionRequest> = submitted
        .iter()
        .map(|file| ExtractionRequest::new(file.clone(), dir, None, passwords.clone()))
        .collect();

    let results = join_all(requests.iter().map(|request| extractor.extract(request))).await;

    let mut failed = 0;
    for (file, result) in submitted.iter().zip(&results) {
        if let Err(e) = result {
            warn!(?file, error = %e, "nested archive extraction failed");
            failed += 1;
        }
    }

    let mut report = NestedExtraction {
        submitted,
        ..Default::default()
    };

    for file in &matched {
        match fs::try_exists(file).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(?file, error = %e, "failed to check archive before deletion");
                continue;
            }
        }

        match fs::remove_file(file).await {
            Ok(()) => {
                debug!(?file, "deleted nested archive");
                report.deleted.push(file.clone());
            }
            Err(e) => {
                warn!(?file, error = %e, "failed to delete nested archive");
                if report.delete_failure.is_none() {
                    report.delete_failure = Some(ExtractionError::DeleteFailed {
                        path: file.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    if failed > 0 {
        return Err(Error::Extraction(ExtractionError::NestedFailed {
            failed,
            total: report.submitted.len(),
        }));
    }

    info!(
        ?dir,
        extracted = report.submitted.len(),
        deleted = report.deleted.len(),
        "nested extraction complete"
    );

    Ok(report)
}

/// Archive files directly inside `dir`, sorted by name
async fn find_archives(dir: &Path, archive_extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut archives = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_archive(&path, archive_extensions) {
            archives.push(path);
        }
    }

    archives.sort();
    Ok(archives)
}
