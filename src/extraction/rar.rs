use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use unrar::error::{Code, UnrarError, When};

use super::password_list::PasswordList;
use super::shared::{extract_with_passwords_impl, sanitize_entry_path};

/// Archive extractor for RAR files
///
/// Given the first volume of a split archive, unrar follows the remaining
/// `partN.rar` volumes on its own.
pub struct RarExtractor;

impl RarExtractor {
    /// Whether an unrar failure means the password did not fit
    ///
    /// RAR4 archives never report a bad password. Data decrypted with the
    /// wrong key fails its CRC, so unrar returns `BadData` instead. That
    /// counts as a wrong password when a non-empty password was tried on
    /// encrypted content, or when the archive could not even be opened.
    pub(crate) fn is_password_failure(e: &UnrarError, password: &str, encrypted: bool) -> bool {
        match e.code {
            Code::BadPassword | Code::MissingPassword => true,
            Code::BadData => !password.is_empty() && (encrypted || e.when == When::Open),
            _ => false,
        }
    }

    /// Convert an unrar error to our error type, checking for password errors
    fn convert_unrar_error(
        e: UnrarError,
        archive_path: &Path,
        password: &str,
        encrypted: bool,
    ) -> Error {
        if Self::is_password_failure(&e, password, encrypted) {
            debug!(?archive_path, error = %e, "unrar rejected the password");
            Error::Extraction(ExtractionError::WrongPassword {
                archive: archive_path.to_path_buf(),
            })
        } else {
            Error::Extraction(ExtractionError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }

    fn skip_failed(e: UnrarError, archive_path: &Path) -> Error {
        Error::Extraction(ExtractionError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to skip entry: {}", e),
        })
    }

    /// Try to extract a RAR archive with a single password
    ///
    /// Returns `WrongPassword` if the password is incorrect, other errors for
    /// corrupt archives, missing volumes, disk full, etc.
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting RAR extraction"
        );

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Extraction(ExtractionError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to create destination: {}", e),
            })
        })?;

        let archive = if password.is_empty() {
            unrar::Archive::new(archive_path)
        } else {
            unrar::Archive::with_password(archive_path, password.as_bytes())
        };

        let mut at_header = archive
            .open_for_processing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path, password, false))?;
        let headers_encrypted = at_header.has_encrypted_headers();

        let mut extracted_files = Vec::new();

        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break,
                Err(e) => {
                    return Err(Self::convert_unrar_error(
                        e,
                        archive_path,
                        password,
                        headers_encrypted,
                    ));
                }
            };

            let header = at_file.entry();
            let sanitized = sanitize_entry_path(&header.filename);

            if sanitized.as_os_str().is_empty() || header.is_directory() {
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::skip_failed(e, archive_path))?;
                continue;
            }

            let encrypted = headers_encrypted || header.is_encrypted();
            let file_path = dest_path.join(&sanitized);
            let existed = file_path.exists();
            at_header = match at_file.extract_to(&file_path) {
                Ok(next) => next,
                Err(e) => {
                    // A failed entry may leave a truncated file behind
                    if !existed {
                        Self::remove_partial_output(&file_path);
                    }
                    return Err(Self::convert_unrar_error(
                        e,
                        archive_path,
                        password,
                        encrypted,
                    ));
                }
            };
            extracted_files.push(file_path);
        }

        Ok(extracted_files)
    }

    fn remove_partial_output(path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(?path, error = %e, "failed to remove partial RAR output");
            }
        }
    }

    /// Extract RAR archive with password attempts
    pub async fn extract_with_passwords(
        archive_path: &Path,
        dest_path: &Path,
        passwords: &PasswordList,
    ) -> Result<Vec<PathBuf>> {
        extract_with_passwords_impl("RAR", Self::try_extract, archive_path, dest_path, passwords)
            .await
    }
}
