//! Configuration types for game-unpack

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for [`crate::InstallPipeline`]
///
/// Every field has a default, so `Config::default()` works out of the box and a
/// JSON file only needs to name the settings it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Installer discovery and execution settings
    #[serde(default)]
    pub installer: InstallerConfig,

    /// Record store location
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// User-facing notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.extraction.archive_extensions.is_empty() {
            return Err(Error::Config {
                message: "at least one archive extension is required".into(),
                key: Some("extraction.archive_extensions".into()),
            });
        }
        if self.installer.binary_name.trim().is_empty() {
            return Err(Error::Config {
                message: "installer binary name must not be empty".into(),
                key: Some("installer.binary_name".into()),
            });
        }
        if self.installer.timeout == Some(Duration::ZERO) {
            return Err(Error::Config {
                message: "installer timeout must be greater than zero".into(),
                key: Some("installer.timeout".into()),
            });
        }
        Ok(())
    }
}

/// Archive extraction configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// File extensions (without dots) treated as archives during nested extraction
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// Passwords tried in order for every archive
    #[serde(default = "default_passwords")]
    pub passwords: Vec<String>,

    /// Optional file with additional passwords, one per line (tried after `passwords`)
    #[serde(default)]
    pub password_file: Option<PathBuf>,

    /// Try the empty password last (default: true)
    #[serde(default = "default_true")]
    pub try_empty_password: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            archive_extensions: default_archive_extensions(),
            passwords: default_passwords(),
            password_file: None,
            try_empty_password: true,
        }
    }
}

/// Installer discovery and execution configuration
///
/// Candidates are searched in this order, first existing file wins:
/// 1. `resources_path/<resource_subdir>/<binary_name>` (packaged resources)
/// 2. `app_root/resources/<resource_subdir>/<binary_name>`
/// 3. `<dir of current executable>/../resources/<resource_subdir>/<binary_name>`
/// 4. `<working directory>/resources/<resource_subdir>/<binary_name>`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// Packaged resources directory (None = candidate skipped)
    #[serde(default)]
    pub resources_path: Option<PathBuf>,

    /// Application root directory (None = candidate skipped)
    #[serde(default)]
    pub app_root: Option<PathBuf>,

    /// Directory under `resources` holding the installer (default: "installer")
    #[serde(default = "default_resource_subdir")]
    pub resource_subdir: String,

    /// Installer executable file name, platform suffix included
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Search relative to the running executable (default: true)
    #[serde(default = "default_true")]
    pub search_binary_dir: bool,

    /// Search relative to the working directory (default: true)
    #[serde(default = "default_true")]
    pub search_working_dir: bool,

    /// Kill the installer and fail the stage after this long (None = wait forever)
    #[serde(default, with = "optional_duration_serde")]
    pub timeout: Option<Duration>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            resources_path: None,
            app_root: None,
            resource_subdir: default_resource_subdir(),
            binary_name: default_binary_name(),
            search_binary_dir: true,
            search_working_dir: true,
            timeout: None,
        }
    }
}

/// Record store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./game-unpack.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// User-facing notification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Publish a notification when installation completes (default: true)
    #[serde(default = "default_true")]
    pub notify_on_complete: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_on_complete: true,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_archive_extensions() -> Vec<String> {
    vec!["rar".into(), "zip".into(), "7z".into()]
}

fn default_passwords() -> Vec<String> {
    vec!["online-fix.me".into(), "steamrip.com".into()]
}

fn default_resource_subdir() -> String {
    "installer".into()
}

fn default_binary_name() -> String {
    format!("installer{}", std::env::consts::EXE_SUFFIX)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("game-unpack.db")
}

/// Serde helper for `Option<Duration>` stored as whole seconds
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
