// src/exec/backend.rs

//! Pluggable action runner abstraction.
//!
//! The dispatcher talks to an `ActionRunner` instead of spawning processes
//! itself, so tests can record requested actions without running anything.
//!
//! - `ProcessLauncher` is the production implementation.
//! - Tests provide their own runner (see the `hidkitd-test-utils` crate).

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::device::{DeviceId, DeviceProperties};
use crate::types::{EventKind, ScriptMode};

use super::launcher::start_and_report;

/// One action the dispatcher wants performed for one device.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub kind: EventKind,
    /// `None` when no script is configured for `kind`.
    pub script: Option<PathBuf>,
    pub device: DeviceId,
    pub properties: Arc<DeviceProperties>,
}

impl ActionRequest {
    /// Environment passed to the script.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("HIDKITD_EVENT", self.kind.as_env_value().to_string()),
            ("HIDKITD_DEVICE", self.device.to_string()),
        ];
        vars.extend(self.properties.env_vars());
        vars
    }
}

/// Trait abstracting how actions are executed.
///
/// Implementations must not fail: whatever happens to the script is
/// reported through logs, never to the caller.
pub trait ActionRunner: Send {
    /// Perform `request`. A request without a script is a no-op.
    ///
    /// The returned future resolves once the runner is done with the
    /// request, which for a detached launch is as soon as the process has
    /// been started.
    fn run_action(
        &mut self,
        request: ActionRequest,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Runs scripts as real OS processes.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    mode: ScriptMode,
    timeout: Option<Duration>,
}

impl ProcessLauncher {
    pub fn new(mode: ScriptMode, timeout: Option<Duration>) -> Self {
        Self { mode, timeout }
    }

    pub fn mode(&self) -> ScriptMode {
        self.mode
    }
}

impl ActionRunner for ProcessLauncher {
    fn run_action(
        &mut self,
        request: ActionRequest,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let mode = self.mode;
        let timeout = self.timeout;

        Box::pin(async move {
            let Some(script) = request.script.clone() else {
                debug!(kind = %request.kind, device = %request.device, "no script configured");
                return;
            };

            // The process is started before this future resolves, so
            // launches follow delivery order in both modes.
            let env = request.env();
            let Some(running) = start_and_report(script, request.kind, request.device, &env)
            else {
                return;
            };

            match mode {
                ScriptMode::Detached => {
                    tokio::spawn(running.finish_and_report(timeout));
                }
                ScriptMode::Wait => running.finish_and_report(timeout).await,
            }
        })
    }
}
