use crate::error::{Error, InstallerError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long output is still read once the installer itself has exited
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run the installer to completion
///
/// No arguments, stdin closed, stdout and stderr logged line by line (lossy
/// UTF-8, never parsed). Returns once the installer process exits, even if
/// processes it started still hold its output open. Exit code 0, or
/// termination by a signal (no exit code), is success.
pub(crate) async fn run_to_exit(path: &Path, timeout: Option<Duration>) -> Result<()> {
    let mut child = Command::new(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            Error::Installer(InstallerError::SpawnFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

    info!(installer = ?path, pid = ?child.id(), "installer started");

    let mut log_tasks = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        log_tasks.push(spawn_line_logger(stdout, path.to_path_buf(), Stream::Stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        log_tasks.push(spawn_line_logger(stderr, path.to_path_buf(), Stream::Stderr));
    }

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited,
            Err(_) => {
                warn!(installer = ?path, timeout = ?limit, "installer timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!(installer = ?path, error = %e, "failed to kill installer");
                }
                // Grandchildren may still hold the pipes open
                for task in log_tasks {
                    task.abort();
                }
                return Err(Error::Installer(InstallerError::TimedOut {
                    path: path.to_path_buf(),
                    timeout: limit,
                }));
            }
        },
        None => child.wait().await,
    };

    let status = waited?;

    // Background helpers started by the installer may keep the pipes open
    let drain_deadline = tokio::time::Instant::now() + OUTPUT_DRAIN_GRACE;
    for mut task in log_tasks {
        if tokio::time::timeout_at(drain_deadline, &mut task)
            .await
            .is_err()
        {
            debug!(installer = ?path, "output still open after installer exit, detaching");
            task.abort();
        }
    }

    match status.code() {
        Some(0) => {
            info!(installer = ?path, "installer exited successfully");
            Ok(())
        }
        None => {
            info!(installer = ?path, %status, "installer terminated without exit code");
            Ok(())
        }
        Some(code) => {
            warn!(installer = ?path, code, "installer failed");
            Err(Error::Installer(InstallerError::NonZeroExit {
                path: path.to_path_buf(),
                code,
            }))
        }
    }
}

fn spawn_line_logger<R>(reader: R, path: PathBuf, stream: Stream) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']);
                    match stream {
                        Stream::Stdout => info!(installer = ?path, %line, "installer stdout"),
                        Stream::Stderr => warn!(installer = ?path, %line, "installer stderr"),
                    }
                }
                Err(e) => {
                    debug!(installer = ?path, error = %e, "stopped reading installer output");
                    break;
                }
            }
        }
    })
}
