use crate::error::{Error, ExtractionError, Result};
use sevenz_rust::{Password, SevenZMethod};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::password_list::PasswordList;
use super::shared::{extract_with_passwords_impl, sanitize_entry_path};

/// Archive extractor for 7z files
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Try to extract a 7z archive with a single password
    ///
    /// Returns the files this attempt wrote. On failure, files the attempt
    /// created are removed again so the next password starts clean.
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting 7z extraction"
        );

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Self::failed(archive_path, format!("failed to create destination: {}", e))
        })?;

        let file = std::fs::File::open(archive_path)
            .map_err(|e| Self::failed(archive_path, format!("failed to open archive: {}", e)))?;

        let mut written: Vec<PathBuf> = Vec::new();
        let mut created: Vec<PathBuf> = Vec::new();
        let result = sevenz_rust::decompress_with_extract_fn_and_password(
            file,
            dest_path,
            Password::from(password),
            |entry, reader, _| {
                let relative = sanitize_entry_path(Path::new(entry.name()));
                if relative.as_os_str().is_empty() {
                    return Ok(true);
                }
                let target = dest_path.join(relative);
                if !entry.is_directory() {
                    if !target.exists() {
                        created.push(target.clone());
                    }
                    written.push(target.clone());
                }
                sevenz_rust::default_entry_extract_fn(entry, reader, &target)
            },
        );

        if let Err(e) = result {
            Self::remove_partial_output(&created);
            return Err(Self::classify_error(archive_path, password, e));
        }

        Self::validate_extracted_paths(archive_path, dest_path)?;

        Ok(written)
    }

    /// Map a 7z error onto the crate's extraction errors
    ///
    /// A wrong AES key does not fail with a password error: the decrypted
    /// stream is garbage, so it surfaces as a checksum mismatch or corrupt
    /// data. Those count as a wrong password when a non-empty password was
    /// tried against an encrypted archive.
    fn classify_error(archive_path: &Path, password: &str, err: sevenz_rust::Error) -> Error {
        use sevenz_rust::Error as SevenZError;
        use std::io::ErrorKind;

        let garbled = match &err {
            SevenZError::PasswordRequired => {
                return Error::Extraction(ExtractionError::WrongPassword {
                    archive: archive_path.to_path_buf(),
                });
            }
            SevenZError::ChecksumVerificationFailed
            | SevenZError::NextHeaderCrcMismatch
            | SevenZError::BadTerminatedStreamsInfo(_)
            | SevenZError::BadTerminatedUnpackInfo
            | SevenZError::BadTerminatedPackInfo(_)
            | SevenZError::BadTerminatedSubStreamsInfo
            | SevenZError::BadTerminatedheader(_)
            | SevenZError::Other(_) => true,
            SevenZError::Io(io, _) => matches!(
                io.kind(),
                ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof
            ),
            _ => false,
        };

        if garbled && !password.is_empty() && Self::is_encrypted(archive_path) {
            debug!(
                ?archive_path,
                error = %err,
                "7z data did not decrypt, treating as wrong password"
            );
            return Error::Extraction(ExtractionError::WrongPassword {
                archive: archive_path.to_path_buf(),
            });
        }

        Self::failed(archive_path, format!("failed to extract 7z archive: {}", err))
    }

    /// Whether the archive's header or any of its folders is AES encrypted
    fn is_encrypted(archive_path: &Path) -> bool {
        match sevenz_rust::Archive::open(archive_path) {
            Err(sevenz_rust::Error::PasswordRequired) => true,
            Ok(archive) => archive.folders.iter().any(|folder| {
                folder
                    .coders
                    .iter()
                    .any(|coder| coder.decompression_method_id() == SevenZMethod::ID_AES256SHA256)
            }),
            Err(_) => false,
        }
    }

    fn remove_partial_output(created: &[PathBuf]) {
        for path in created {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(?path, error = %e, "failed to remove partial 7z output");
                }
            }
        }
    }

    fn failed(archive_path: &Path, reason: String) -> Error {
        Error::Extraction(ExtractionError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason,
        })
    }

    /// Test-only public accessor for `validate_extracted_paths`
    #[cfg(test)]
    pub(crate) fn validate_extracted_paths_pub(dest_path: &Path) -> Result<()> {
        Self::validate_extracted_paths(dest_path, dest_path)
    }

    /// Validate that all extracted files are within the destination directory.
    /// This protects against path traversal attacks in 7z archives.
    fn validate_extracted_paths(archive_path: &Path, dest_path: &Path) -> Result<()> {
        let canonical_dest = dest_path.canonicalize().map_err(|e| {
            Self::failed(
                archive_path,
                format!("failed to canonicalize destination path: {}", e),
            )
        })?;

        for entry in walk(dest_path).map_err(|e| Self::failed(archive_path, e.to_string()))? {
            let canonical = entry.canonicalize().map_err(|e| {
                Self::failed(
                    archive_path,
                    format!("failed to canonicalize extracted path: {}", e),
                )
            })?;
            if !canonical.starts_with(&canonical_dest) {
                return Err(Self::failed(
                    archive_path,
                    format!(
                        "path traversal detected: extracted file {:?} is outside destination",
                        canonical
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Extract 7z archive with password attempts
    pub async fn extract_with_passwords(
        archive_path: &Path,
        dest_path: &Path,
        passwords: &PasswordList,
    ) -> Result<Vec<PathBuf>> {
        extract_with_passwords_impl("7z", Self::try_extract, archive_path, dest_path, passwords)
            .await
    }
}

/// Every entry below `dir`, directories included
fn walk(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path.clone());
            }
            out.push(path);
        }
    }
    Ok(out)
}
