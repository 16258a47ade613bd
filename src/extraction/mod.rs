//! Archive extraction with password support
//!
//! This module is the Archive Extractor boundary of the pipeline:
//! - [`ArchiveExtractor`] - the trait the pipeline calls, one request per archive
//! - [`NativeExtractor`] - in-process RAR, 7z, and ZIP extraction
//! - [`PasswordList`] - ordered password candidates tried until one works
//! - [`extract_all_in_directory`] - nested archive extraction and cleanup
//! - [`volumes`] - `partN.rar` multi-volume naming rules

mod nested;
mod password_list;
mod rar;
mod sevenz;
mod shared;
pub mod volumes;
mod zip;


// Re-exports
pub use nested::{NestedExtraction, extract_all_in_directory};
pub use password_list::PasswordList;
pub use rar::RarExtractor;
pub use sevenz::SevenZipExtractor;
pub use shared::{detect_archive_type, is_archive};
pub use zip::ZipExtractor;

use crate::error::{Error, ExtractionError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Archive format recognized by the native extractor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    /// RAR archive, single or multi-volume
    Rar,
    /// 7-Zip archive
    SevenZip,
    /// ZIP archive
    Zip,
}

/// One extraction job handed to an [`ArchiveExtractor`]
#[derive(Clone, Debug)]
pub struct ExtractionRequest {
    /// Archive to extract; relative paths resolve against `cwd`
    pub file_path: PathBuf,
    /// Working directory of the extraction
    pub cwd: PathBuf,
    /// Output directory; `None` extracts into `cwd`
    pub output_path: Option<PathBuf>,
    /// Password candidates in trial order
    pub passwords: PasswordList,
}

impl ExtractionRequest {
    /// Request extracting `file_path` into `output_path`
    pub fn new(
        file_path: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
        passwords: PasswordList,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            cwd: cwd.into(),
            output_path,
            passwords,
        }
    }

    /// Absolute path of the archive
    pub fn archive_path(&self) -> PathBuf {
        resolve(&self.cwd, &self.file_path)
    }

    /// Absolute path of the directory the archive's content lands in
    pub fn destination(&self) -> PathBuf {
        match &self.output_path {
            Some(output) => resolve(&self.cwd, output),
            None => self.cwd.clone(),
        }
    }
}

fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Extracts one archive per call
///
/// A call resolves exactly once: `Ok` with the extracted files, or `Err` when
/// the archive could not be extracted with any candidate password.
/// Implementations are stateless per call and safe to run concurrently.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract the archive named by the request
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<PathBuf>>;
}

/// In-process extractor for RAR, 7z, and ZIP archives
///
/// Detects the archive type by extension and routes to the matching format
/// extractor, trying every password from the request in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeExtractor;

#[async_trait]
impl ArchiveExtractor for NativeExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<PathBuf>> {
        let archive_path = request.archive_path();
        let dest_path = request.destination();

        let archive_type = detect_archive_type(&archive_path).ok_or_else(|| {
            Error::Extraction(ExtractionError::UnsupportedArchive {
                archive: archive_path.clone(),
            })
        })?;

        info!(
            ?archive_path,
            ?dest_path,
            ?archive_type,
            "dispatching extraction to appropriate extractor"
        );

        let passwords = &request.passwords;
        match archive_type {
            ArchiveType::Rar => {
                RarExtractor::extract_with_passwords(&archive_path, &dest_path, passwords).await
            }
            ArchiveType::SevenZip => {
                SevenZipExtractor::extract_with_passwords(&archive_path, &dest_path, passwords)
                    .await
            }
            ArchiveType::Zip => {
                ZipExtractor::extract_with_passwords(&archive_path, &dest_path, passwords).await
            }
        }
    }
}
