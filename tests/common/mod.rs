//! Common test utilities for game-unpack integration tests


#[allow(unused_imports)]
pub use fixtures::*;

use game_unpack::{
    Config, Database, DownloadRecord, DownloadStatus, GameKey, GameRecord, GameShop,
    InstallPipeline, InstallerRunner, NativeExtractor, TracingNotifier,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Pipeline backed by a real SQLite database in a temp directory
pub struct TestEnv {
    pub pipeline: InstallPipeline,
    pub db: Arc<Database>,
    pub downloads: PathBuf,
    pub _temp: TempDir,
}

impl TestEnv {
    /// Create an environment whose installer is looked up at `installer`
    pub async fn new(installer: Option<PathBuf>) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let downloads = temp.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();

        let mut config = Config::default();
        config.persistence.database_path = temp.path().join("state.db");

        let db = Arc::new(
            Database::new(&config.persistence.database_path)
                .await
                .unwrap(),
        );
        let candidates = vec![installer.unwrap_or_else(|| temp.path().join("no-installer"))];
        let runner = InstallerRunner::with_candidates(config.installer.clone(), candidates);

        let pipeline = InstallPipeline::with_components(
            config,
            db.clone(),
            Arc::new(NativeExtractor),
            Arc::new(runner),
            Arc::new(TracingNotifier),
        );

        Self {
            pipeline,
            db,
            downloads,
            _temp: temp,
        }
    }

    /// Persist a freshly downloaded artifact for `key`
    pub async fn seed(&self, key: &GameKey, artifact: &str) {
        self.db
            .upsert_download(
                key,
                &DownloadRecord {
                    download_path: self.downloads.clone(),
                    folder_name: Some(artifact.to_string()),
                    extracting: false,
                    status: DownloadStatus::Downloading,
                },
            )
            .await
            .unwrap();
        self.db
            .upsert_game(
                key,
                &GameRecord {
                    title: "Cyberpunk 2077".into(),
                    icon_url: Some("https://cdn.example.com/icon.png".into()),
                },
            )
            .await
            .unwrap();
    }

    pub async fn record(&self, key: &GameKey) -> DownloadRecord {
        self.db.get_download(key).await.unwrap().unwrap()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.downloads.join(relative)
    }
}

pub fn steam_key() -> GameKey {
    GameKey::new(GameShop::Steam, "1091500")
}

/// Relative paths of every file under `root`, sorted
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
