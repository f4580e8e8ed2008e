// src/exec/launcher.rs

//! Launching a single script process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::device::DeviceId;
use crate::types::EventKind;

/// Why a script launch did not end in a successful exit.
///
/// Never fatal: the runner logs it and the daemon carries on.
#[derive(Error, Debug)]
pub enum ActionLaunchError {
    #[error("script {path:?} not found")]
    NotFound { path: PathBuf },

    #[error("failed to start script {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for script {path:?}: {source}")]
    Wait {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("script {path:?} exited with status {code}")]
    NonZeroExit { path: PathBuf, code: i32 },

    #[error("script {path:?} was terminated by a signal")]
    Killed { path: PathBuf },

    #[error("script {path:?} did not finish within {after:?} and was killed")]
    TimedOut { path: PathBuf, after: Duration },
}

/// Start `script` with no arguments.
///
/// stdin is closed, stdout/stderr are inherited from the daemon, and `env`
/// is added to the inherited environment. Returns as soon as the process
/// exists.
pub fn spawn_process(
    script: &Path,
    env: &[(&'static str, String)],
) -> Result<Child, ActionLaunchError> {
    let mut cmd = Command::new(script);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    for (key, value) in env {
        cmd.env(key, value);
    }

    cmd.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ActionLaunchError::NotFound {
            path: script.to_path_buf(),
        },
        _ => ActionLaunchError::Spawn {
            path: script.to_path_buf(),
            source,
        },
    })
}

/// Wait for a started script and classify how it ended. With a `timeout`,
/// a script that runs longer is killed.
pub async fn wait_process(
    mut child: Child,
    script: &Path,
    timeout: Option<Duration>,
) -> Result<(), ActionLaunchError> {
    let path = script.to_path_buf();

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(script = ?path, error = %e, "failed to kill timed-out script");
                }
                return Err(ActionLaunchError::TimedOut { path, after: limit });
            }
        },
        None => child.wait().await,
    };

    let status = waited.map_err(|source| ActionLaunchError::Wait {
        path: path.clone(),
        source,
    })?;

    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ActionLaunchError::NonZeroExit { path, code }),
        None => Err(ActionLaunchError::Killed { path }),
    }
}

/// Run `script` to completion: [`spawn_process`] then [`wait_process`].
pub async fn launch_process(
    script: &Path,
    env: &[(&'static str, String)],
    timeout: Option<Duration>,
) -> Result<(), ActionLaunchError> {
    let child = spawn_process(script, env)?;
    wait_process(child, script, timeout).await
}

/// A script that has been started and is being reported on.
pub(crate) struct RunningScript {
    child: Child,
    script: PathBuf,
    kind: EventKind,
    device: DeviceId,
}

/// Start `script` and log the attempt. A launch failure is logged here and
/// yields `None`.
pub(crate) fn start_and_report(
    script: PathBuf,
    kind: EventKind,
    device: DeviceId,
    env: &[(&'static str, String)],
) -> Option<RunningScript> {
    info!(kind = %kind, device = %device, script = ?script, "executing script");

    match spawn_process(&script, env) {
        Ok(child) => Some(RunningScript {
            child,
            script,
            kind,
            device,
        }),
        Err(err) => {
            error!(kind = %kind, device = %device, error = %err, "script launch failed");
            None
        }
    }
}

impl RunningScript {
    /// Wait for the script and log how it ended. Errors stop here.
    pub(crate) async fn finish_and_report(self, timeout: Option<Duration>) {
        let RunningScript {
            child,
            script,
            kind,
            device,
        } = self;

        match wait_process(child, &script, timeout).await {
            Ok(()) => info!(kind = %kind, device = %device, script = ?script, "script finished"),
            Err(err) => error!(
                kind = %kind,
                device = %device,
                error = %err,
                "script failed"
            ),
        }
    }
}
