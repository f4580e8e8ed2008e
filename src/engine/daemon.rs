// src/engine/daemon.rs

use std::fmt;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::FilterSpec;
use crate::dispatch::{DispatchStats, EventDispatcher};
use crate::errors::{HidkitError, Result};
use crate::exec::ActionRunner;
use crate::provider::{Notification, NotificationService};

use super::DaemonState;

/// Result of one wait in the main loop.
enum LoopStep {
    Shutdown { sender_gone: bool },
    Event(Option<Notification>),
}

/// The process-wide event loop.
///
/// Owns the provider (keeping its subscriptions alive), the receiving end
/// of the provider's notification channel, and the dispatcher. Every
/// notification is handled to completion before the next one is read.
pub struct Daemon<P: NotificationService, R: ActionRunner> {
    provider: P,
    events: mpsc::Receiver<Notification>,
    dispatcher: EventDispatcher<R>,
    filter: FilterSpec,
    shutdown: watch::Receiver<bool>,
    state: DaemonState,
}

impl<P: NotificationService, R: ActionRunner> fmt::Debug for Daemon<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Daemon")
            .field("state", &self.state)
            .field("filter", &self.filter)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<P: NotificationService, R: ActionRunner> Daemon<P, R> {
    pub fn new(
        provider: P,
        events: mpsc::Receiver<Notification>,
        dispatcher: EventDispatcher<R>,
        filter: FilterSpec,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            provider,
            events,
            dispatcher,
            filter,
            shutdown,
            state: DaemonState::Starting,
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Register both subscriptions and process devices already present.
    ///
    /// Any error here is fatal; the loop is never entered.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != DaemonState::Starting {
            return Ok(());
        }

        info!("starting up");
        self.dispatcher
            .register(&mut self.provider, &self.filter)
            .await?;

        self.state = DaemonState::Monitoring;
        info!("monitoring started");
        Ok(())
    }

    /// Start (if not already started) and pump notifications until the
    /// shutdown signal is raised or its sender is dropped.
    ///
    /// Returns the dispatcher's counters on shutdown, or
    /// [`HidkitError::EventChannelClosed`] if the provider stops delivering.
    pub async fn run(mut self) -> Result<DispatchStats> {
        self.start().await?;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let step = tokio::select! {
                biased;
                changed = self.shutdown.changed() => LoopStep::Shutdown {
                    sender_gone: changed.is_err(),
                },
                event = self.events.recv() => LoopStep::Event(event),
            };

            match step {
                LoopStep::Shutdown { sender_gone: true } => {
                    debug!("shutdown sender dropped");
                    break;
                }
                // The flag is re-checked at the top of the loop.
                LoopStep::Shutdown { sender_gone: false } => continue,
                LoopStep::Event(Some(notification)) => {
                    self.dispatcher.dispatch(notification).await;
                }
                LoopStep::Event(None) => {
                    warn!("device notification channel closed");
                    self.state = DaemonState::Stopped;
                    return Err(HidkitError::EventChannelClosed);
                }
            }
        }

        self.state = DaemonState::Stopped;
        let stats = self.dispatcher.stats();
        info!(
            batches = stats.batches,
            devices = stats.devices,
            launches = stats.launches,
            "monitoring stopped"
        );
        Ok(stats)
    }
}
