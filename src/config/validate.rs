// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{
    ActionSet, DaemonConfig, DaemonSettings, FilterSpec, RawActionSet, RawDaemonConfig,
    RawDaemonSection, RawFilterSpec,
};
use crate::errors::{HidkitError, Result};

impl TryFrom<RawFilterSpec> for FilterSpec {
    type Error = HidkitError;

    fn try_from(raw: RawFilterSpec) -> std::result::Result<Self, Self::Error> {
        validate_filter(&raw)?;
        Ok(FilterSpec::new_unchecked(raw))
    }
}

impl TryFrom<RawActionSet> for ActionSet {
    type Error = HidkitError;

    fn try_from(raw: RawActionSet) -> std::result::Result<Self, Self::Error> {
        validate_actions(&raw)?;
        Ok(ActionSet::new_unchecked(raw))
    }
}

impl TryFrom<RawDaemonSection> for DaemonSettings {
    type Error = HidkitError;

    fn try_from(raw: RawDaemonSection) -> std::result::Result<Self, Self::Error> {
        let script_timeout = match raw.script_timeout_secs {
            Some(0) => {
                return Err(HidkitError::ConfigError(
                    "[daemon].script_timeout_secs must be >= 1 (got 0)".to_string(),
                ));
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let defaults = DaemonSettings::default();
        Ok(DaemonSettings {
            script_mode: raw.script_mode.unwrap_or(defaults.script_mode),
            script_timeout,
            dev_dir: non_empty_dir(raw.dev_dir, "dev_dir")?.unwrap_or(defaults.dev_dir),
            sysfs_class_dir: non_empty_dir(raw.sysfs_class_dir, "sysfs_class_dir")?
                .unwrap_or(defaults.sysfs_class_dir),
        })
    }
}

impl TryFrom<RawDaemonConfig> for DaemonConfig {
    type Error = HidkitError;

    fn try_from(raw: RawDaemonConfig) -> std::result::Result<Self, Self::Error> {
        Ok(DaemonConfig {
            filter: FilterSpec::try_from(raw.filter)?,
            actions: ActionSet::try_from(raw.action)?,
            settings: DaemonSettings::try_from(raw.daemon)?,
        })
    }
}

fn validate_filter(raw: &RawFilterSpec) -> Result<()> {
    let numbers = [
        ("vendor_id", raw.vendor_id),
        ("product_id", raw.product_id),
        ("usage_page", raw.usage_page),
        ("usage", raw.usage),
    ];
    for (name, value) in numbers {
        if value == Some(0) {
            return Err(HidkitError::ConfigError(format!(
                "filter '{name}' must be greater than 0"
            )));
        }
    }

    let texts = [
        ("product_name", raw.product_name.as_deref()),
        ("device_address", raw.device_address.as_deref()),
    ];
    for (name, value) in texts {
        if value.is_some_and(|s| s.trim().is_empty()) {
            return Err(HidkitError::ConfigError(format!(
                "filter '{name}' must not be empty"
            )));
        }
    }

    if numbers.iter().all(|(_, v)| v.is_none()) && texts.iter().all(|(_, v)| v.is_none()) {
        return Err(HidkitError::ConfigError(
            "at least one filter must be given (vendor id, product id, usage page, usage, name or address)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_actions(raw: &RawActionSet) -> Result<()> {
    for (name, path) in [
        ("on_connect", raw.on_connect.as_ref()),
        ("on_disconnect", raw.on_disconnect.as_ref()),
    ] {
        if path.is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(HidkitError::ConfigError(format!(
                "action '{name}' must not be an empty path"
            )));
        }
    }

    if raw.on_connect.is_none() && raw.on_disconnect.is_none() {
        return Err(HidkitError::ConfigError(
            "at least one action script must be given (on-connect or on-disconnect)".to_string(),
        ));
    }

    Ok(())
}

fn non_empty_dir(dir: Option<PathBuf>, name: &str) -> Result<Option<PathBuf>> {
    match dir {
        Some(d) if d.as_os_str().is_empty() => Err(HidkitError::ConfigError(format!(
            "[daemon].{name} must not be empty"
        ))),
        other => Ok(other),
    }
}
