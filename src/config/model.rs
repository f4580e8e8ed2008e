// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{EventKind, ScriptMode};

/// Default directory watched for device nodes appearing/disappearing.
pub const DEFAULT_DEV_DIR: &str = "/dev";
/// Default sysfs class directory describing hidraw devices.
pub const DEFAULT_SYSFS_CLASS_DIR: &str = "/sys/class/hidraw";

/// Configuration as read from a TOML file and/or the command line, before
/// validation.
///
/// ```toml
/// [filter]
/// vendor_id = 1452
/// product_id = 615
/// usage_page = 1
/// usage = 6
/// product_name = "My Custom Keyboard"
/// device_address = "ab-cd-ef-12-34-56"
///
/// [action]
/// on_connect = "/path/to/connect.sh"
/// on_disconnect = "/path/to/disconnect.sh"
///
/// [daemon]
/// script_mode = "detached"
/// script_timeout_secs = 30
/// ```
///
/// Every field is optional here; [`DaemonConfig`] is the validated form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDaemonConfig {
    #[serde(default)]
    pub filter: RawFilterSpec,

    #[serde(default)]
    pub action: RawActionSet,

    #[serde(default)]
    pub daemon: RawDaemonSection,
}

impl RawDaemonConfig {
    /// Layer `overrides` on top of `self`, field by field. Fields set in
    /// `overrides` win.
    pub fn merged_with(self, overrides: RawDaemonConfig) -> RawDaemonConfig {
        RawDaemonConfig {
            filter: RawFilterSpec {
                vendor_id: overrides.filter.vendor_id.or(self.filter.vendor_id),
                product_id: overrides.filter.product_id.or(self.filter.product_id),
                usage_page: overrides.filter.usage_page.or(self.filter.usage_page),
                usage: overrides.filter.usage.or(self.filter.usage),
                product_name: overrides.filter.product_name.or(self.filter.product_name),
                device_address: overrides
                    .filter
                    .device_address
                    .or(self.filter.device_address),
            },
            action: RawActionSet {
                on_connect: overrides.action.on_connect.or(self.action.on_connect),
                on_disconnect: overrides.action.on_disconnect.or(self.action.on_disconnect),
            },
            daemon: RawDaemonSection {
                script_mode: overrides.daemon.script_mode.or(self.daemon.script_mode),
                script_timeout_secs: overrides
                    .daemon
                    .script_timeout_secs
                    .or(self.daemon.script_timeout_secs),
                dev_dir: overrides.daemon.dev_dir.or(self.daemon.dev_dir),
                sysfs_class_dir: overrides
                    .daemon
                    .sysfs_class_dir
                    .or(self.daemon.sysfs_class_dir),
            },
        }
    }
}

/// `[filter]` section. Multiple fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFilterSpec {
    #[serde(default)]
    pub vendor_id: Option<u32>,
    #[serde(default)]
    pub product_id: Option<u32>,
    #[serde(default)]
    pub usage_page: Option<u32>,
    #[serde(default)]
    pub usage: Option<u32>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub device_address: Option<String>,
}

/// `[action]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawActionSet {
    #[serde(default)]
    pub on_connect: Option<PathBuf>,
    #[serde(default)]
    pub on_disconnect: Option<PathBuf>,
}

/// `[daemon]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDaemonSection {
    #[serde(default)]
    pub script_mode: Option<ScriptMode>,
    #[serde(default)]
    pub script_timeout_secs: Option<u64>,
    #[serde(default)]
    pub dev_dir: Option<PathBuf>,
    #[serde(default)]
    pub sysfs_class_dir: Option<PathBuf>,
}

/// Which devices to watch.
///
/// Validated: at least one field is set, numbers are non-zero and strings
/// are non-empty. Immutable once built; construct it via
/// `FilterSpec::try_from(RawFilterSpec)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    vendor_id: Option<u32>,
    product_id: Option<u32>,
    usage_page: Option<u32>,
    usage: Option<u32>,
    product_name: Option<String>,
    device_address: Option<String>,
}

impl FilterSpec {
    pub(crate) fn new_unchecked(raw: RawFilterSpec) -> Self {
        Self {
            vendor_id: raw.vendor_id,
            product_id: raw.product_id,
            usage_page: raw.usage_page,
            usage: raw.usage,
            product_name: raw.product_name,
            device_address: raw.device_address,
        }
    }

    pub fn vendor_id(&self) -> Option<u32> {
        self.vendor_id
    }

    pub fn product_id(&self) -> Option<u32> {
        self.product_id
    }

    pub fn usage_page(&self) -> Option<u32> {
        self.usage_page
    }

    pub fn usage(&self) -> Option<u32> {
        self.usage
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn device_address(&self) -> Option<&str> {
        self.device_address.as_deref()
    }
}

/// Scripts to run per event kind. At least one is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    on_connect: Option<PathBuf>,
    on_disconnect: Option<PathBuf>,
}

impl ActionSet {
    pub(crate) fn new_unchecked(raw: RawActionSet) -> Self {
        Self {
            on_connect: raw.on_connect,
            on_disconnect: raw.on_disconnect,
        }
    }

    pub fn on_connect(&self) -> Option<&Path> {
        self.on_connect.as_deref()
    }

    pub fn on_disconnect(&self) -> Option<&Path> {
        self.on_disconnect.as_deref()
    }

    /// The script bound to `kind`, if any.
    pub fn script_for(&self, kind: EventKind) -> Option<&Path> {
        match kind {
            EventKind::Arrival => self.on_connect(),
            EventKind::Removal => self.on_disconnect(),
        }
    }
}

/// Validated `[daemon]` settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    pub script_mode: ScriptMode,
    pub script_timeout: Option<Duration>,
    pub dev_dir: PathBuf,
    pub sysfs_class_dir: PathBuf,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            script_mode: ScriptMode::default(),
            script_timeout: None,
            dev_dir: PathBuf::from(DEFAULT_DEV_DIR),
            sysfs_class_dir: PathBuf::from(DEFAULT_SYSFS_CLASS_DIR),
        }
    }
}

/// Fully validated daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub filter: FilterSpec,
    pub actions: ActionSet,
    pub settings: DaemonSettings,
}
