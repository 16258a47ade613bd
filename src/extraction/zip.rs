use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::password_list::PasswordList;
use super::shared::extract_with_passwords_impl;

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    fn failed(archive_path: &Path, reason: String) -> Error {
        Error::Extraction(ExtractionError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason,
        })
    }

    fn wrong_password(archive_path: &Path) -> Error {
        Error::Extraction(ExtractionError::WrongPassword {
            archive: archive_path.to_path_buf(),
        })
    }

    fn is_password_error(err_str: &str) -> bool {
        let lower = err_str.to_lowercase();
        lower.contains("password") || lower.contains("encrypted")
    }

    /// Open a ZIP entry by index, handling password decryption if needed
    fn open_zip_entry<'a>(
        archive: &'a mut zip::ZipArchive<std::fs::File>,
        index: usize,
        password: &str,
        archive_path: &Path,
    ) -> Result<zip::read::ZipFile<'a>> {
        let classify = |e: zip::result::ZipError| {
            let err_str = e.to_string();
            if Self::is_password_error(&err_str) {
                Self::wrong_password(archive_path)
            } else {
                Self::failed(archive_path, format!("failed to read ZIP entry: {}", e))
            }
        };

        if password.is_empty() {
            archive.by_index(index).map_err(classify)
        } else {
            archive
                .by_index_decrypt(index, password.as_bytes())
                .map_err(classify)?
                .map_err(|_| Self::wrong_password(archive_path))
        }
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(?archive_path, "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| {
                Self::failed(archive_path, format!("failed to create directory: {}", e))
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Self::failed(
                    archive_path,
                    format!("failed to create parent directories: {}", e),
                )
            })?;
        }

        let mut outfile = std::fs::File::create(&file_path).map_err(|e| {
            Self::failed(archive_path, format!("failed to create output file: {}", e))
        })?;

        // ZipCrypto only detects most wrong passwords at header check time;
        // the rest surface as a checksum error while reading
        if let Err(e) = std::io::copy(&mut file, &mut outfile) {
            drop(outfile);
            let _ = std::fs::remove_file(&file_path);
            let err_str = e.to_string();
            let bad_key =
                Self::is_password_error(&err_str) || err_str.to_lowercase().contains("checksum");
            return Err(if bad_key {
                Self::wrong_password(archive_path)
            } else {
                Self::failed(archive_path, format!("failed to extract file: {}", e))
            });
        }

        Ok(Some(file_path))
    }

    /// Try to extract a ZIP archive with a single password
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting ZIP extraction"
        );

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Self::failed(archive_path, format!("failed to create destination: {}", e))
        })?;

        let file = std::fs::File::open(archive_path).map_err(|e| {
            Self::failed(archive_path, format!("failed to open ZIP archive: {}", e))
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            Self::failed(archive_path, format!("failed to read ZIP archive: {}", e))
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let file = Self::open_zip_entry(&mut archive, i, password, archive_path)?;

            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        Ok(extracted_files)
    }

    /// Extract ZIP archive with password attempts
    pub async fn extract_with_passwords(
        archive_path: &Path,
        dest_path: &Path,
        passwords: &PasswordList,
    ) -> Result<Vec<PathBuf>> {
        extract_with_passwords_impl("ZIP", Self::try_extract, archive_path, dest_path, passwords)
            .await
    }
}
