//! Installer discovery.

use crate::config::InstallerConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate installer locations in search order
///
/// Reads the running executable's directory and the working directory from
/// the process; see [`candidate_paths_from`] for the pure version.
pub fn candidate_paths(config: &InstallerConfig) -> Vec<PathBuf> {
    let exe_dir = if config.search_binary_dir {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
    } else {
        None
    };
    let cwd = if config.search_working_dir {
        std::env::current_dir().ok()
    } else {
        None
    };

    candidate_paths_from(config, exe_dir.as_deref(), cwd.as_deref())
}

/// Candidate installer locations for explicit executable and working directories
pub fn candidate_paths_from(
    config: &InstallerConfig,
    exe_dir: Option<&Path>,
    cwd: Option<&Path>,
) -> Vec<PathBuf> {
    let in_resources = |resources: &Path| {
        resources
            .join(&config.resource_subdir)
            .join(&config.binary_name)
    };

    let mut candidates = Vec::with_capacity(4);
    if let Some(resources) = &config.resources_path {
        candidates.push(in_resources(resources));
    }
    if let Some(root) = &config.app_root {
        candidates.push(in_resources(&root.join("resources")));
    }
    if let Some(dir) = exe_dir.filter(|_| config.search_binary_dir) {
        candidates.push(in_resources(&dir.join("..").join("resources")));
    }
    if let Some(dir) = cwd.filter(|_| config.search_working_dir) {
        candidates.push(in_resources(&dir.join("resources")));
    }
    candidates
}

/// First candidate that exists as a file, canonicalized
///
/// Falls back to the absolute form of the candidate when canonicalization
/// fails (broken link chain, permission on a parent directory).
pub async fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        let is_file = tokio::fs::metadata(candidate)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            debug!(?candidate, "installer candidate not found");
            continue;
        }

        let resolved = match tokio::fs::canonicalize(candidate).await {
            Ok(path) => path,
            Err(e) => {
                debug!(?candidate, error = %e, "canonicalize failed, using absolute path");
                std::path::absolute(candidate).unwrap_or_else(|_| candidate.clone())
            }
        };
        return Some(resolved);
    }
    None
}
