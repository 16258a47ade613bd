//! Installer Runner
//!
//! Locates a silent installer shipped with the host application and runs it
//! after extraction. The installer is optional: when no candidate location
//! holds one, the stage is skipped rather than failed.
//!
//! The pipeline talks to the [`Installer`] trait; [`InstallerRunner`] is the
//! process-backed implementation.

mod candidates;
mod process;

pub use candidates::{candidate_paths, candidate_paths_from, first_existing};

use crate::config::InstallerConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Runs the post-extraction installer stage
#[async_trait]
pub trait Installer: Send + Sync {
    /// Run the installer if one is available
    ///
    /// Returns `Ok(false)` when no installer exists, `Ok(true)` when one ran
    /// and succeeded, and `Err` on spawn failure, non-zero exit, or timeout.
    async fn run_installer_if_present(&self) -> Result<bool>;
}

/// Installer discovered on disk and run as a child process
///
/// # Examples
///
/// ```no_run
/// use game_unpack::config::InstallerConfig;
/// use game_unpack::installer::{Installer, InstallerRunner};
///
/// # async fn example() -> game_unpack::Result<()> {
/// let runner = InstallerRunner::new(InstallerConfig::default());
/// if runner.run_installer_if_present().await? {
///     println!("installer ran");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InstallerRunner {
    config: InstallerConfig,
    candidates: Vec<PathBuf>,
}

impl InstallerRunner {
    /// Create a runner searching the configured candidate locations
    pub fn new(config: InstallerConfig) -> Self {
        let candidates = candidate_paths(&config);
        Self { config, candidates }
    }

    /// Create a runner searching an explicit candidate list
    pub fn with_candidates(config: InstallerConfig, candidates: Vec<PathBuf>) -> Self {
        Self { config, candidates }
    }

    /// Candidate locations, in search order
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Resolve the installer path, `None` if no candidate exists
    pub async fn locate(&self) -> Option<PathBuf> {
        first_existing(&self.candidates).await
    }
}

#[async_trait]
impl Installer for InstallerRunner {
    async fn run_installer_if_present(&self) -> Result<bool> {
        let Some(path) = self.locate().await else {
            info!(
                candidates = self.candidates.len(),
                "no installer found, skipping installation"
            );
            return Ok(false);
        };

        info!(installer = ?path, "running installer");
        process::run_to_exit(&path, self.config.timeout).await?;
        Ok(true)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
