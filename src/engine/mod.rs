// src/engine/mod.rs

//! The daemon loop.
//!
//! [`daemon::Daemon`] drives the dispatcher from the provider's
//! notification channel. It stops when its shutdown signal is raised,
//! which production wires to SIGINT/SIGTERM and tests raise directly.

use tokio::sync::watch;

pub mod daemon;

pub use daemon::Daemon;

/// Lifecycle of the daemon loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Constructed; subscriptions not registered yet.
    Starting,
    /// Subscriptions live; processing events.
    Monitoring,
    /// Loop exited (shutdown requested or provider gone).
    Stopped,
}

/// Sending side of the daemon's shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Ask the daemon loop to stop after the notification it is handling.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

pub fn shutdown_channel() -> (ShutdownHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, rx)
}
