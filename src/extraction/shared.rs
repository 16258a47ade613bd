use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::ArchiveType;
use super::password_list::PasswordList;

/// Shared implementation for archive extraction with password attempts.
///
/// Tries each password in the list by calling `try_extract_fn` via `spawn_blocking`.
/// A wrong password moves on to the next candidate; any other failure aborts.
///
/// This is the single implementation behind `RarExtractor::extract_with_passwords`,
/// `SevenZipExtractor::extract_with_passwords`, and `ZipExtractor::extract_with_passwords`.
pub(crate) async fn extract_with_passwords_impl(
    format_name: &str,
    try_extract_fn: impl Fn(&Path, &str, &Path) -> Result<Vec<PathBuf>> + Send + 'static + Clone,
    archive_path: &Path,
    dest_path: &Path,
    passwords: &PasswordList,
) -> Result<Vec<PathBuf>> {
    if passwords.is_empty() {
        warn!(
            ?archive_path,
            "no passwords to try for {} extraction", format_name
        );
        return Err(Error::Extraction(ExtractionError::NoPasswordsAvailable {
            archive: archive_path.to_path_buf(),
        }));
    }

    info!(
        ?archive_path,
        ?dest_path,
        password_count = passwords.len(),
        "attempting {} extraction with {} password(s)",
        format_name,
        passwords.len()
    );

    for (i, password) in passwords.iter().enumerate() {
        debug!(
            attempt = i + 1,
            total = passwords.len(),
            password_length = password.len(),
            "trying password {}/{}",
            i + 1,
            passwords.len()
        );

        // Use spawn_blocking to avoid blocking the async runtime during extraction
        let archive_path_owned = archive_path.to_path_buf();
        let dest_path_owned = dest_path.to_path_buf();
        let password_owned = password.clone();
        let try_fn = try_extract_fn.clone();

        let result =
            spawn_blocking(move || try_fn(&archive_path_owned, &password_owned, &dest_path_owned))
                .await
                .map_err(|e| {
                    Error::Extraction(ExtractionError::ExtractionFailed {
                        archive: archive_path.to_path_buf(),
                        reason: format!("extraction task panicked: {}", e),
                    })
                })?;

        match result {
            Ok(files) => {
                info!(
                    ?archive_path,
                    attempt = i + 1,
                    extracted_count = files.len(),
                    "{} extraction successful on attempt {}/{}",
                    format_name,
                    i + 1,
                    passwords.len()
                );
                return Ok(files);
            }
            Err(Error::Extraction(ExtractionError::WrongPassword { .. })) => {
                debug!(attempt = i + 1, "wrong password, trying next");
                continue;
            }
            Err(e) => {
                // Corrupt archive, disk full, etc.
                warn!(
                    error = %e,
                    ?archive_path,
                    "{} extraction failed with non-password error",
                    format_name
                );
                return Err(e);
            }
        }
    }

    warn!(
        ?archive_path,
        attempted = passwords.len(),
        "all passwords failed for {} extraction",
        format_name
    );
    Err(Error::Extraction(ExtractionError::AllPasswordsFailed {
        archive: archive_path.to_path_buf(),
        count: passwords.len(),
    }))
}

/// Detect archive type by file extension
///
/// Supports RAR (.rar, .r00), 7z (.7z), and ZIP (.zip) formats.
pub fn detect_archive_type(path: &Path) -> Option<ArchiveType> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "rar" | "r00" => Some(ArchiveType::Rar),
        "7z" => Some(ArchiveType::SevenZip),
        "zip" => Some(ArchiveType::Zip),
        _ => None,
    }
}

/// Check if a file is an archive based on its extension
///
/// Compares case-insensitively against the configured extensions (without dots).
pub fn is_archive(path: &Path, archive_extensions: &[String]) -> bool {
    if let Some(ext) = path.extension() {
        let ext_str = ext.to_string_lossy().to_lowercase();
        archive_extensions
            .iter()
            .any(|ae| ae.to_lowercase() == ext_str)
    } else {
        false
    }
}

/// Strip every path component that could escape the destination directory
pub(crate) fn sanitize_entry_path(name: &Path) -> PathBuf {
    name.components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect()
}
