use crate::config::Config;
use crate::error::Error;
use crate::pipeline::test_helpers::*;
use crate::types::{CompletionReason, DownloadStatus, Event, GameShop, PipelineOutcome};
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn extraction_complete(success: bool) -> Event {
    Event::ExtractionComplete {
        shop: GameShop::Steam,
        object_id: test_key().object_id,
        success,
    }
}

fn installation_start() -> Event {
    Event::InstallationStart {
        shop: GameShop::Steam,
        object_id: test_key().object_id,
    }
}

fn installation_complete(reason: CompletionReason) -> Event {
    Event::InstallationComplete {
        shop: GameShop::Steam,
        object_id: test_key().object_id,
        reason,
    }
}

/// Temp download dir holding `game.zip` with a single executable
fn clean_artifact() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_zip(&dir.path().join("game.zip"), &[("game.exe", b"MZ")]);
    dir
}

// ===========================================================================
// Happy paths
// ===========================================================================

#[tokio::test]
async fn clean_archive_without_installer_reaches_complete() {
    let dir = clean_artifact();
    let mut harness = Harness::new(FakeInstall::Absent);
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Installed {
            reason: CompletionReason::NoInstaller
        }
    );

    let record = harness.record();
    assert_eq!(record.folder_name.as_deref(), Some("game"));
    assert_eq!(record.status, DownloadStatus::Complete);
    assert!(!record.extracting);

    assert_eq!(
        harness.drain_events(),
        vec![
            extraction_complete(true),
            installation_start(),
            installation_complete(CompletionReason::NoInstaller),
        ]
    );

    assert!(dir.path().join("game").join("game.exe").exists());
    assert!(
        !dir.path().join("game.zip").exists(),
        "consumed artifact is removed"
    );
}

#[tokio::test]
async fn successful_installer_publishes_one_notification() {
    let dir = clean_artifact();
    let mut harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Installed {
            reason: CompletionReason::InstallerSucceeded
        }
    );
    assert_eq!(harness.record().status, DownloadStatus::Complete);
    assert_eq!(harness.installer.calls.load(Ordering::SeqCst), 1);

    let published = harness.notifier.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1, "exactly one notification");
    assert_eq!(published[0].body, "Test Game is ready to play");

    assert_eq!(
        harness.drain_events().last(),
        Some(&installation_complete(CompletionReason::InstallerSucceeded))
    );
}

#[tokio::test]
async fn notification_can_be_disabled() {
    let dir = clean_artifact();
    let mut config = Config::default();
    config.notifications.notify_on_complete = false;
    let harness = Harness::with_config(config, FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let _ = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert_eq!(harness.record().status, DownloadStatus::Complete);
    assert!(harness.notifier.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn installer_sees_installing_record_with_flag_cleared() {
    let dir = clean_artifact();
    let harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let _ = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    let seen = harness.installer.seen_record.lock().unwrap().clone().unwrap();
    assert_eq!(seen.status, DownloadStatus::Installing);
    assert!(!seen.extracting);
    assert_eq!(seen.folder_name.as_deref(), Some("game"));
}

#[tokio::test]
async fn extracting_flag_is_persisted_before_extraction_and_status_only_moves_forward() {
    let dir = clean_artifact();
    let harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let _ = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    let writes = harness.store.writes();
    assert!(writes[0].extracting, "first write sets the flag");
    assert_eq!(writes[0].status, DownloadStatus::Downloading);

    for pair in writes.windows(2) {
        let (from, to) = (pair[0].status, pair[1].status);
        assert!(
            from == to || from.can_advance_to(to),
            "status regressed from {from} to {to}"
        );
    }
    assert!(!writes.last().unwrap().extracting);
}

#[tokio::test]
async fn second_password_opens_protected_archive() {
    let dir = TempDir::new().unwrap();
    write_encrypted_zip(
        &dir.path().join("game.zip"),
        "game.exe",
        b"MZ",
        b"steamrip.com",
    );
    let harness = Harness::new(FakeInstall::Absent);
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Installed { .. }));
    assert_eq!(
        std::fs::read(dir.path().join("game").join("game.exe")).unwrap(),
        b"MZ"
    );
}

#[tokio::test]
async fn nested_archives_are_extracted_and_removed() {
    let dir = TempDir::new().unwrap();
    let inner = zip_bytes(&[("data.pak", b"level data")]);
    write_zip(
        &dir.path().join("game.zip"),
        &[("game.exe", b"MZ"), ("data.zip", &inner)],
    );
    let harness = Harness::new(FakeInstall::Absent);
    harness.seed(dir.path(), "game.zip");

    let _ = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    let game_dir = dir.path().join("game");
    assert_eq!(
        std::fs::read(game_dir.join("data.pak")).unwrap(),
        b"level data"
    );
    assert!(!game_dir.join("data.zip").exists());
    assert_eq!(harness.record().status, DownloadStatus::Complete);
}

// ===========================================================================
// Failure paths
// ===========================================================================

#[tokio::test]
async fn installer_exit_code_one_ends_in_error_status() {
    let dir = clean_artifact();
    let mut harness = Harness::new(FakeInstall::ExitsWith(1));
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    let message = match outcome {
        PipelineOutcome::InstallationFailed { message } => message,
        other => panic!("expected InstallationFailed, got {other:?}"),
    };
    assert!(message.contains("exit code 1"), "got: {message}");

    let record = harness.record();
    assert_eq!(record.status, DownloadStatus::Error);
    assert!(!record.extracting);

    let events = harness.drain_events();
    assert_eq!(
        events,
        vec![
            extraction_complete(true),
            installation_start(),
            Event::InstallationError {
                shop: GameShop::Steam,
                object_id: test_key().object_id,
                message,
            },
        ]
    );
    assert!(harness.notifier.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn installer_spawn_failure_ends_in_error_status() {
    let dir = clean_artifact();
    let mut harness = Harness::new(FakeInstall::SpawnFails);
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        PipelineOutcome::InstallationFailed { ref message } if message.contains("failed to spawn")
    ));
    assert_eq!(harness.record().status, DownloadStatus::Error);
    assert!(matches!(
        harness.drain_events().last(),
        Some(Event::InstallationError { .. })
    ));
}

#[tokio::test]
async fn corrupt_archive_leaves_status_unchanged() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("game.zip"), b"this is not a zip file").unwrap();
    let mut harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::ExtractionFailed { .. }));

    let record = harness.record();
    assert!(!record.extracting);
    assert_eq!(record.status, DownloadStatus::Downloading);
    assert_eq!(record.folder_name.as_deref(), Some("game.zip"));

    assert_eq!(harness.drain_events(), vec![extraction_complete(false)]);
    assert_eq!(harness.installer.calls.load(Ordering::SeqCst), 0);
    assert!(dir.path().join("game.zip").exists(), "artifact is kept");
}

#[tokio::test]
async fn failed_nested_archive_fails_extraction_and_is_still_removed() {
    let dir = TempDir::new().unwrap();
    write_zip(
        &dir.path().join("game.zip"),
        &[("game.exe", b"MZ"), ("broken.zip", b"garbage")],
    );
    let mut harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::ExtractionFailed { reason } => {
            assert!(reason.contains("nested"), "got: {reason}")
        }
        other => panic!("expected ExtractionFailed, got {other:?}"),
    }
    assert!(!dir.path().join("game").join("broken.zip").exists());

    let record = harness.record();
    assert!(!record.extracting);
    assert_eq!(record.status, DownloadStatus::Downloading);
    assert_eq!(harness.drain_events(), vec![extraction_complete(false)]);
    assert_eq!(harness.installer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_failure_propagates_after_clearing_the_flag() {
    let dir = clean_artifact();
    let mut harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");
    // Write 1 sets the flag, write 2 enters installing
    *harness.store.fail_write.lock().unwrap() = Some(2);

    let err = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap_err();

    assert!(err.is_store_error());
    let record = harness.record();
    assert!(!record.extracting, "recovery path must clear the flag");
    assert_eq!(record.status, DownloadStatus::Downloading);
    assert_eq!(harness.installer.calls.load(Ordering::SeqCst), 0);
    assert!(harness.drain_events().is_empty());
}

// ===========================================================================
// Missing records
// ===========================================================================

#[tokio::test]
async fn missing_download_record_is_skipped() {
    let mut harness = Harness::new(FakeInstall::Succeeds);

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::Skipped);
    assert!(harness.store.writes().is_empty());
    assert!(harness.drain_events().is_empty());
}

#[tokio::test]
async fn missing_game_record_is_skipped() {
    let dir = clean_artifact();
    let mut harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");
    let other = crate::types::GameKey::new(GameShop::Epic, test_key().object_id);
    harness
        .store
        .insert_download(&other, harness.record());

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&other)
        .await
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::Skipped);
    assert!(harness.store.writes().is_empty());
    assert!(harness.drain_events().is_empty());
    assert!(dir.path().join("game.zip").exists());
}

#[tokio::test]
async fn download_without_artifact_name_is_skipped() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");
    let mut record = harness.record();
    record.folder_name = None;
    harness.store.insert_download(&test_key(), record);

    let outcome = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();
    assert_eq!(outcome, PipelineOutcome::Skipped);
}

// ===========================================================================
// Single-flight and crash recovery
// ===========================================================================

#[tokio::test]
async fn concurrent_run_for_same_game_is_refused() {
    let dir = clean_artifact();
    let harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let _running = harness.pipeline.in_flight.acquire(&test_key()).unwrap();

    let err = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PipelineBusy { .. }));
    assert!(harness.store.writes().is_empty());
}

#[tokio::test]
async fn guard_is_released_after_a_run() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("game.zip"), b"corrupt").unwrap();
    let harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");

    let first = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();
    let second = harness
        .pipeline
        .extract_downloaded_artifact(&test_key())
        .await
        .unwrap();

    assert!(matches!(first, PipelineOutcome::ExtractionFailed { .. }));
    assert!(matches!(second, PipelineOutcome::ExtractionFailed { .. }));
}

#[tokio::test]
async fn recover_interrupted_clears_stale_flags_only() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new(FakeInstall::Succeeds);
    harness.seed(dir.path(), "game.zip");
    let mut stale = harness.record();
    stale.extracting = true;
    harness.store.insert_download(&test_key(), stale);

    let busy = crate::types::GameKey::new(GameShop::Epic, "busy");
    let mut running = harness.record();
    running.extracting = true;
    harness.store.insert_download(&busy, running);
    let _guard = harness.pipeline.in_flight.acquire(&busy).unwrap();

    let repaired = harness.pipeline.recover_interrupted().await.unwrap();

    assert_eq!(repaired, 1);
    let record = harness.record();
    assert!(!record.extracting);
    assert_eq!(record.status, DownloadStatus::Downloading, "status untouched");
    assert!(
        harness.store.download(&busy).unwrap().extracting,
        "running pipeline keeps its flag"
    );
}

#[tokio::test]
async fn recover_interrupted_with_nothing_to_do() {
    let harness = Harness::new(FakeInstall::Succeeds);
    assert_eq!(harness.pipeline.recover_interrupted().await.unwrap(), 0);
}
