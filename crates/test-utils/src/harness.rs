use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use hidkitd::config::{ActionSet, FilterSpec};
use hidkitd::dispatch::{DispatchStats, EventDispatcher};
use hidkitd::engine::{Daemon, ShutdownHandle, shutdown_channel};
use hidkitd::errors::Result;
use hidkitd::provider::{MemoryProvider, Notification, notification_channel};

use crate::recording_runner::RecordingRunner;
use crate::{wait_until, with_timeout};

/// A memory provider plus a recording runner, ready to host a daemon.
///
/// Set up devices on `provider` (e.g. `add_present`) before calling
/// [`Harness::spawn`] to exercise startup catch-up.
pub struct Harness {
    pub provider: MemoryProvider,
    pub runner: RecordingRunner,
    rx: Option<mpsc::Receiver<Notification>>,
}

impl Harness {
    pub fn new() -> Self {
        let (tx, rx) = notification_channel();
        Self {
            provider: MemoryProvider::new(tx),
            runner: RecordingRunner::new(),
            rx: Some(rx),
        }
    }

    /// Spawn the daemon loop and wait until both subscriptions exist.
    ///
    /// Panics if called twice on the same harness.
    pub async fn spawn(&mut self, filter: FilterSpec, actions: ActionSet) -> RunningDaemon {
        let rx = self.rx.take().expect("harness daemon already spawned");
        let (shutdown, shutdown_rx) = shutdown_channel();

        let dispatcher = EventDispatcher::new(Arc::new(actions), self.runner.clone());
        let daemon = Daemon::new(self.provider.clone(), rx, dispatcher, filter, shutdown_rx);
        let join = tokio::spawn(daemon.run());

        let provider = self.provider.clone();
        wait_until(|| provider.subscription_count() == 2).await;

        RunningDaemon { shutdown, join }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A daemon loop running on its own task.
pub struct RunningDaemon {
    shutdown: ShutdownHandle,
    join: JoinHandle<Result<DispatchStats>>,
}

impl RunningDaemon {
    /// Raise the shutdown signal and wait for the loop to exit cleanly.
    pub async fn stop(self) -> DispatchStats {
        self.shutdown.trigger();
        with_timeout(self.join)
            .await
            .expect("daemon task panicked")
            .expect("daemon loop returned an error")
    }
}
