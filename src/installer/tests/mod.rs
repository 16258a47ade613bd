use crate::config::InstallerConfig;
use crate::error::{Error, InstallerError};
use crate::installer::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn runner_for(candidates: Vec<PathBuf>) -> InstallerRunner {
    InstallerRunner::with_candidates(InstallerConfig::default(), candidates)
}

/// Write an executable shell script
#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{body}").unwrap();
    file.sync_all().unwrap();
    drop(file);
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn missing_installer_is_not_an_error() {
    let temp = TempDir::new().unwrap();
    let runner = runner_for(vec![
        temp.path().join("a").join("installer"),
        temp.path().join("b").join("installer"),
    ]);

    assert_eq!(runner.locate().await, None);
    assert!(!runner.run_installer_if_present().await.unwrap());
}

#[test]
fn new_runner_builds_candidates_from_config() {
    let config = InstallerConfig {
        resources_path: Some(PathBuf::from("/res")),
        search_binary_dir: false,
        search_working_dir: false,
        ..Default::default()
    };
    let runner = InstallerRunner::new(config.clone());
    assert_eq!(
        runner.candidates(),
        &[PathBuf::from("/res")
            .join(&config.resource_subdir)
            .join(&config.binary_name)]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn successful_installer_reports_ran() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("ran");
    let script = temp.path().join("res").join("installer");
    write_script(
        &script,
        &format!("echo installing; echo warn >&2; touch '{}'", marker.display()),
    );

    let runner = runner_for(vec![temp.path().join("missing"), script]);
    assert!(runner.run_installer_if_present().await.unwrap());
    assert!(marker.exists(), "installer must run to completion before returning");
}

#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_carries_the_code() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("installer");
    write_script(&script, "exit 1");

    let err = runner_for(vec![script])
        .run_installer_if_present()
        .await
        .unwrap_err();
    match &err {
        Error::Installer(InstallerError::NonZeroExit { code, .. }) => assert_eq!(*code, 1),
        other => panic!("expected NonZeroExit, got: {other:?}"),
    }
    assert!(err.to_string().contains("exit code 1"));
}

#[cfg(unix)]
#[tokio::test]
async fn signal_termination_counts_as_success() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("installer");
    write_script(&script, "kill -9 $$");

    assert!(
        runner_for(vec![script])
            .run_installer_if_present()
            .await
            .unwrap()
    );
}

#[cfg(unix)]
#[tokio::test]
async fn non_executable_file_is_a_spawn_failure() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("installer");
    std::fs::write(&path, b"not a program").unwrap();

    let err = runner_for(vec![path.clone()])
        .run_installer_if_present()
        .await
        .unwrap_err();
    match err {
        Error::Installer(InstallerError::SpawnFailed { path: p, .. }) => {
            assert_eq!(p, path.canonicalize().unwrap());
        }
        other => panic!("expected SpawnFailed, got: {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn hung_installer_times_out_when_configured() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("installer");
    write_script(&script, "exec sleep 30");

    let config = InstallerConfig {
        timeout: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let runner = InstallerRunner::with_candidates(config, vec![script]);

    let started = std::time::Instant::now();
    let err = runner.run_installer_if_present().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Installer(InstallerError::TimedOut { .. })
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_installer_resolves_to_target() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("real").join("installer");
    write_script(&target, "exit 0");
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let runner = runner_for(vec![link]);
    assert_eq!(runner.locate().await, Some(target.canonicalize().unwrap()));
}

#[cfg(unix)]
#[tokio::test]
async fn returns_when_installer_exits_despite_background_helper() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("installer");
    write_script(&script, "sleep 5 &\nexit 0");

    let started = std::time::Instant::now();
    let ran = runner_for(vec![script])
        .run_installer_if_present()
        .await
        .unwrap();

    assert!(ran);
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "waited {:?} for a helper that outlived the installer",
        started.elapsed()
    );
}

#[cfg(unix)]
#[tokio::test]
async fn non_utf8_output_does_not_mask_the_exit_code() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("installer");
    write_script(
        &script,
        "printf '\\377\\376 OEM codepage\\n'\n\
         printf '\\377\\n' >&2\n\
         sleep 1\n\
         i=0\n\
         while [ $i -lt 2000 ]; do echo \"copying file $i\"; i=$((i+1)); done\n\
         exit 3",
    );

    let err = runner_for(vec![script])
        .run_installer_if_present()
        .await
        .unwrap_err();
    match err {
        Error::Installer(InstallerError::NonZeroExit { code, .. }) => assert_eq!(code, 3),
        other => panic!("expected NonZeroExit, got: {other:?}"),
    }
}
