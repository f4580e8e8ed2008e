// tests/config_validation.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;

use hidkitd::cli::{CliArgs, parse_id};
use hidkitd::config::{RawDaemonConfig, RawFilterSpec, load_and_validate};
use hidkitd::errors::HidkitError;
use hidkitd::types::{EventKind, ScriptMode};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_file_is_loaded_with_defaults_applied() {
    let file = config_file(
        r#"
[filter]
vendor_id = 1234
product_id = 5678
product_name = "My Custom Keyboard"

[action]
on_connect = "/tmp/c.sh"
"#,
    );

    let cfg = load_and_validate(Some(file.path()), RawDaemonConfig::default()).unwrap();

    assert_eq!(cfg.filter.vendor_id(), Some(1234));
    assert_eq!(cfg.filter.product_id(), Some(5678));
    assert_eq!(cfg.filter.product_name(), Some("My Custom Keyboard"));
    assert_eq!(cfg.filter.usage_page(), None);
    assert_eq!(cfg.actions.script_for(EventKind::Arrival), Some(PathBuf::from("/tmp/c.sh").as_path()));
    assert_eq!(cfg.actions.script_for(EventKind::Removal), None);
    assert_eq!(cfg.settings.script_mode, ScriptMode::Detached);
    assert_eq!(cfg.settings.script_timeout, None);
    assert_eq!(cfg.settings.dev_dir, PathBuf::from("/dev"));
    assert_eq!(cfg.settings.sysfs_class_dir, PathBuf::from("/sys/class/hidraw"));
}

#[test]
fn empty_filter_is_rejected() {
    let file = config_file(
        r#"
[action]
on_connect = "/tmp/c.sh"
"#,
    );

    match load_and_validate(Some(file.path()), RawDaemonConfig::default()) {
        Err(HidkitError::ConfigError(msg)) => assert!(msg.contains("at least one filter")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn missing_actions_are_rejected() {
    let file = config_file(
        r#"
[filter]
vendor_id = 1234
"#,
    );

    match load_and_validate(Some(file.path()), RawDaemonConfig::default()) {
        Err(HidkitError::ConfigError(msg)) => assert!(msg.contains("at least one action")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_ids_and_empty_strings_are_rejected() {
    let zero = config_file(
        r#"
[filter]
usage_page = 0
[action]
on_disconnect = "/tmp/d.sh"
"#,
    );
    match load_and_validate(Some(zero.path()), RawDaemonConfig::default()) {
        Err(HidkitError::ConfigError(msg)) => assert!(msg.contains("usage_page")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }

    let blank = config_file(
        r#"
[filter]
product_name = "  "
[action]
on_disconnect = "/tmp/d.sh"
"#,
    );
    match load_and_validate(Some(blank.path()), RawDaemonConfig::default()) {
        Err(HidkitError::ConfigError(msg)) => assert!(msg.contains("product_name")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unknown_keys_and_bad_values_are_toml_errors() {
    let typo = config_file(
        r#"
[filter]
vendorid = 1234
"#,
    );
    assert!(matches!(
        load_and_validate(Some(typo.path()), RawDaemonConfig::default()),
        Err(HidkitError::TomlError(_))
    ));

    let bad_mode = config_file(
        r#"
[filter]
vendor_id = 1
[action]
on_connect = "/tmp/c.sh"
[daemon]
script_mode = "sometimes"
"#,
    );
    assert!(matches!(
        load_and_validate(Some(bad_mode.path()), RawDaemonConfig::default()),
        Err(HidkitError::TomlError(_))
    ));
}

#[test]
fn zero_script_timeout_is_rejected() {
    let file = config_file(
        r#"
[filter]
vendor_id = 1
[action]
on_connect = "/tmp/c.sh"
[daemon]
script_timeout_secs = 0
"#,
    );
    match load_and_validate(Some(file.path()), RawDaemonConfig::default()) {
        Err(HidkitError::ConfigError(msg)) => assert!(msg.contains("script_timeout_secs")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn missing_config_file_is_an_io_error() {
    let result = load_and_validate(
        Some(std::path::Path::new("/definitely/not/here/hidkitd.toml")),
        RawDaemonConfig::default(),
    );
    assert!(matches!(result, Err(HidkitError::IoError(_))));
}

#[test]
fn flags_override_file_values_field_by_field() {
    let file = config_file(
        r#"
[filter]
vendor_id = 1234
product_id = 5678

[action]
on_connect = "/tmp/file-connect.sh"
on_disconnect = "/tmp/file-disconnect.sh"

[daemon]
script_mode = "wait"
"#,
    );

    let args = CliArgs::try_parse_from([
        "hidkitd",
        "--product-id",
        "0x270F",
        "--on-connect",
        "/tmp/flag-connect.sh",
        "--script-timeout",
        "30",
    ])
    .unwrap();

    let cfg = load_and_validate(Some(file.path()), args.overrides()).unwrap();

    assert_eq!(cfg.filter.vendor_id(), Some(1234));
    assert_eq!(cfg.filter.product_id(), Some(9999));
    assert_eq!(cfg.actions.on_connect(), Some(PathBuf::from("/tmp/flag-connect.sh").as_path()));
    assert_eq!(
        cfg.actions.on_disconnect(),
        Some(PathBuf::from("/tmp/file-disconnect.sh").as_path())
    );
    // --wait-for-scripts was not given, so the file's mode stands.
    assert_eq!(cfg.settings.script_mode, ScriptMode::Wait);
    assert_eq!(cfg.settings.script_timeout, Some(Duration::from_secs(30)));
}

#[test]
fn flags_alone_are_a_complete_config() {
    let args = CliArgs::try_parse_from([
        "hidkitd",
        "--name",
        "My Custom Keyboard",
        "--usage-page",
        "1",
        "--usage",
        "6",
        "--on-disconnect",
        "/tmp/d.sh",
        "--wait-for-scripts",
    ])
    .unwrap();

    let cfg = load_and_validate(None, args.overrides()).unwrap();
    assert_eq!(cfg.filter.product_name(), Some("My Custom Keyboard"));
    assert_eq!(cfg.filter.usage_page(), Some(1));
    assert_eq!(cfg.filter.usage(), Some(6));
    assert_eq!(cfg.settings.script_mode, ScriptMode::Wait);
}

#[test]
fn cli_rejects_zero_and_malformed_ids() {
    assert!(CliArgs::try_parse_from(["hidkitd", "--vendor-id", "0", "--on-connect", "/x"]).is_err());
    assert!(CliArgs::try_parse_from(["hidkitd", "--vendor-id", "abc", "--on-connect", "/x"]).is_err());
    assert!(CliArgs::try_parse_from(["hidkitd", "--bogus-flag", "1"]).is_err());
    assert!(CliArgs::try_parse_from(["hidkitd", "--vendor-id"]).is_err());
}

#[test]
fn parse_id_accepts_decimal_and_hex() {
    assert_eq!(parse_id("1234"), Ok(1234));
    assert_eq!(parse_id("0x046d"), Ok(0x046d));
    assert_eq!(parse_id("0X046D"), Ok(0x046d));
    assert!(parse_id("0").is_err());
    assert!(parse_id("0x0").is_err());
    assert!(parse_id("-5").is_err());
}

#[test]
fn raw_filter_round_trips_through_validation_unchanged() {
    let raw = RawFilterSpec {
        device_address: Some("ab-cd-ef-12-34-56".to_string()),
        ..RawFilterSpec::default()
    };
    let filter = hidkitd::config::FilterSpec::try_from(raw).unwrap();
    assert_eq!(filter.device_address(), Some("ab-cd-ef-12-34-56"));
    assert_eq!(filter.vendor_id(), None);
}
