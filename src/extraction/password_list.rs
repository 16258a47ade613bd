use crate::config::ExtractionConfig;
use std::path::Path;
use tracing::{debug, warn};

/// Password candidates for archive extraction
///
/// Collected in priority order, de-duplicated:
/// 1. Configured passwords (in the order given)
/// 2. Password file (one password per line)
/// 3. Empty password (optional fallback)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasswordList {
    passwords: Vec<String>,
}

impl PasswordList {
    /// Build the list from configured passwords without touching the filesystem
    pub fn new<I, S>(passwords: I, try_empty: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for pw in passwords {
            list.push(pw.into());
        }
        if try_empty {
            list.push_empty();
        }
        list
    }

    /// Collect passwords from every source named by the extraction config
    ///
    /// An unreadable password file is logged and skipped.
    pub async fn collect(config: &ExtractionConfig) -> Self {
        let mut list = Self::new(config.passwords.iter().cloned(), false);

        if let Some(path) = config.password_file.as_deref() {
            list.extend_from_file(path).await;
        }

        if config.try_empty_password {
            list.push_empty();
        }

        debug!(
            "collected {} unique passwords for extraction",
            list.passwords.len()
        );

        list
    }

    async fn extend_from_file(&mut self, path: &Path) {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                for line in content.lines() {
                    let pw = line.trim();
                    if !pw.is_empty() {
                        self.push(pw.to_string());
                    }
                }
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to read password file, skipping");
            }
        }
    }

    fn push(&mut self, password: String) {
        if !self.passwords.contains(&password) {
            self.passwords.push(password);
        }
    }

    fn push_empty(&mut self) {
        self.push(String::new());
    }

    /// Get an iterator over passwords
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.passwords.iter()
    }

    /// Check if there are any passwords to try
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    /// Get the number of passwords
    pub fn len(&self) -> usize {
        self.passwords.len()
    }
}
