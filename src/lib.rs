// src/lib.rs

pub mod cli;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod matcher;
pub mod provider;
pub mod types;

use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{DaemonConfig, DaemonSettings, RawDaemonConfig};
use crate::dispatch::EventDispatcher;
use crate::engine::{Daemon, ShutdownHandle, shutdown_channel};
use crate::errors::Result;
use crate::exec::ProcessLauncher;
use crate::matcher::filter_fields;
use crate::provider::{SysfsProvider, notification_channel};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (flags over optional TOML file)
/// - the sysfs provider and its notification channel
/// - the process launcher and dispatcher
/// - SIGINT/SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    if args.list_devices {
        return list_devices(&args);
    }

    let cfg = config::load_and_validate(args.config.as_deref(), args.overrides())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let (tx, rx) = notification_channel();
    let provider = SysfsProvider::new(
        cfg.settings.dev_dir.clone(),
        cfg.settings.sysfs_class_dir.clone(),
        tx,
    );

    let (shutdown, shutdown_rx) = shutdown_channel();
    spawn_signal_listener(shutdown);

    let runner = ProcessLauncher::new(cfg.settings.script_mode, cfg.settings.script_timeout);
    let dispatcher = EventDispatcher::new(Arc::new(cfg.actions), runner);

    let daemon = Daemon::new(provider, rx, dispatcher, cfg.filter, shutdown_rx);
    let stats = daemon.run().await?;

    info!(devices = stats.devices, launches = stats.launches, "hidkitd exiting");
    Ok(())
}

/// Raise the shutdown signal on Ctrl-C or SIGTERM.
fn spawn_signal_listener(shutdown: ShutdownHandle) {
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("termination requested; shutting down");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        warn!("failed to listen for Ctrl+C: {e}");
                        std::future::pending::<()>().await;
                    }
                }
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("failed to listen for SIGTERM: {e}");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

/// `--list-devices`: print what the provider can see, one device per line.
fn list_devices(args: &CliArgs) -> Result<()> {
    let base = match args.config.as_deref() {
        Some(path) => config::load_from_path(path)?,
        None => RawDaemonConfig::default(),
    };
    let settings = DaemonSettings::try_from(base.merged_with(args.overrides()).daemon)?;

    // Nothing is subscribed, so the channel never carries anything.
    let (tx, _rx) = notification_channel();
    let provider = SysfsProvider::new(settings.dev_dir, settings.sysfs_class_dir, tx);

    let devices = provider.list_devices()?;
    if devices.is_empty() {
        println!("no hidraw devices found");
    }
    for (id, props) in devices {
        println!("{id}: {props}");
    }
    Ok(())
}

/// Simple dry-run output: print filters, actions and settings.
fn print_dry_run(cfg: &DaemonConfig) {
    println!("hidkitd dry-run");
    println!("filters (AND):");
    for (key, value) in filter_fields(&cfg.filter) {
        println!("  {key} = {value}");
    }

    println!("actions:");
    if let Some(path) = cfg.actions.on_connect() {
        println!("  on-connect: {}", path.display());
    }
    if let Some(path) = cfg.actions.on_disconnect() {
        println!("  on-disconnect: {}", path.display());
    }

    println!("daemon:");
    println!("  script_mode = {:?}", cfg.settings.script_mode);
    if let Some(timeout) = cfg.settings.script_timeout {
        println!("  script_timeout = {timeout:?}");
    }
    println!("  dev_dir = {}", cfg.settings.dev_dir.display());
    println!("  sysfs_class_dir = {}", cfg.settings.sysfs_class_dir.display());
}
