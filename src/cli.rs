// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{RawActionSet, RawDaemonConfig, RawDaemonSection, RawFilterSpec};
use crate::types::ScriptMode;

const AFTER_HELP: &str = "\
Only hidraw devices (keyboards, mice, game controllers, custom HID hardware) are watched.

HOW TO FIND FILTER VALUES:
  1. Connect your device.
  2. Run: hidkitd --list-devices
  3. Find your device's line and copy the values you want to filter on:
     VendorID, ProductID, PrimaryUsagePage, PrimaryUsage, Product, DeviceAddress.

EXAMPLE (a standard keyboard, without extra triggers from its media-key interface):
  hidkitd \\
    --name \"My Custom Keyboard\" \\
    --usage-page 1 --usage 6 \\
    --on-connect /path/to/connect_script.sh \\
    --on-disconnect /path/to/disconnect_script.sh";

/// Command-line arguments for `hidkitd`.
///
/// Filters combine with AND logic; at least one filter and at least one
/// action are required (from flags or from `--config`).
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hidkitd",
    version,
    about = "A persistent daemon that runs scripts when matching HID devices connect or disconnect.",
    long_about = None,
    after_help = AFTER_HELP,
    arg_required_else_help = true
)]
pub struct CliArgs {
    /// Match by USB vendor id (decimal or 0x-prefixed hex).
    #[arg(long, value_name = "ID", value_parser = parse_id, help_heading = "Filters")]
    pub vendor_id: Option<u32>,

    /// Match by USB product id (decimal or 0x-prefixed hex).
    #[arg(long, value_name = "ID", value_parser = parse_id, help_heading = "Filters")]
    pub product_id: Option<u32>,

    /// Match by HID primary usage page.
    #[arg(long, value_name = "ID", value_parser = parse_id, help_heading = "Filters")]
    pub usage_page: Option<u32>,

    /// Match by HID primary usage.
    #[arg(long, value_name = "ID", value_parser = parse_id, help_heading = "Filters")]
    pub usage: Option<u32>,

    /// Match by product name (exact).
    #[arg(long = "name", value_name = "STRING", help_heading = "Filters")]
    pub product_name: Option<String>,

    /// Match by device (e.g. Bluetooth) address.
    #[arg(long = "address", value_name = "ADDRESS", help_heading = "Filters")]
    pub device_address: Option<String>,

    /// Script to run when a matching device connects.
    #[arg(long, value_name = "PATH", help_heading = "Actions")]
    pub on_connect: Option<PathBuf>,

    /// Script to run when a matching device disconnects.
    #[arg(long, value_name = "PATH", help_heading = "Actions")]
    pub on_disconnect: Option<PathBuf>,

    /// Optional TOML config file; flags override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Wait for each script to exit before handling the next device.
    #[arg(long)]
    pub wait_for_scripts: bool,

    /// Kill scripts that run longer than this many seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub script_timeout: Option<u64>,

    /// Directory where device nodes appear.
    #[arg(long, value_name = "DIR", hide = true)]
    pub dev_dir: Option<PathBuf>,

    /// sysfs class directory describing hidraw devices.
    #[arg(long, value_name = "DIR", hide = true)]
    pub sysfs_class_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HIDKITD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the configuration, print it, and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the properties of every connected device and exit.
    #[arg(long)]
    pub list_devices: bool,
}

impl CliArgs {
    /// The flags as a config layer to put on top of `--config`.
    pub fn overrides(&self) -> RawDaemonConfig {
        RawDaemonConfig {
            filter: RawFilterSpec {
                vendor_id: self.vendor_id,
                product_id: self.product_id,
                usage_page: self.usage_page,
                usage: self.usage,
                product_name: self.product_name.clone(),
                device_address: self.device_address.clone(),
            },
            action: RawActionSet {
                on_connect: self.on_connect.clone(),
                on_disconnect: self.on_disconnect.clone(),
            },
            daemon: RawDaemonSection {
                script_mode: self.wait_for_scripts.then_some(ScriptMode::Wait),
                script_timeout_secs: self.script_timeout,
                dev_dir: self.dev_dir.clone(),
                sysfs_class_dir: self.sysfs_class_dir.clone(),
            },
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse a positive id given in decimal or `0x` hex.
pub fn parse_id(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    match parsed {
        Ok(0) => Err("must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid id '{s}': {e}")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
