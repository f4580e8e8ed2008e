// src/provider/hidraw.rs

//! Reading hidraw device properties out of sysfs.
//!
//! For a node `hidrawN` the kernel exposes, under
//! `/sys/class/hidraw/hidrawN/device/`:
//!
//! ```text
//! uevent:             HID_ID=0003:0000046D:0000C52B
//!                     HID_NAME=Logitech USB Receiver
//!                     HID_UNIQ=ab:cd:ef:12:34:56
//! report_descriptor:  raw HID report descriptor bytes
//! ```

use std::path::Path;

use anyhow::{Context, Result};

use crate::device::DeviceProperties;
use crate::fs::FileSystem;

/// Node names that belong to the hidraw class.
pub fn is_hidraw_node(name: &str) -> bool {
    name.strip_prefix("hidraw")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Read the properties of `node` from `class_dir` (e.g. `/sys/class/hidraw`).
///
/// The `uevent` file is required; a missing or unreadable report
/// descriptor only leaves the usage fields unset.
pub fn read_device(fs: &dyn FileSystem, class_dir: &Path, node: &str) -> Result<DeviceProperties> {
    let device_dir = class_dir.join(node).join("device");
    let uevent = fs
        .read_to_string(&device_dir.join("uevent"))
        .with_context(|| format!("reading uevent for {node}"))?;

    let mut props = parse_uevent(&uevent);

    if let Ok(descriptor) = fs.read(&device_dir.join("report_descriptor")) {
        let (page, usage) = primary_usage(&descriptor);
        props.primary_usage_page = page;
        props.primary_usage = usage;
    }

    Ok(props)
}

/// Extract vendor/product/name/address from a HID `uevent` file.
pub fn parse_uevent(contents: &str) -> DeviceProperties {
    let mut props = DeviceProperties::default();

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "HID_ID" => {
                // bus:vendor:product, all hex
                let mut parts = value.split(':').skip(1);
                props.vendor_id = parts.next().and_then(parse_hex);
                props.product_id = parts.next().and_then(parse_hex);
            }
            "HID_NAME" if !value.is_empty() => props.product = Some(value.to_string()),
            "HID_UNIQ" if !value.is_empty() => props.address = Some(value.to_string()),
            _ => {}
        }
    }

    props
}

fn parse_hex(s: &str) -> Option<u32> {
    u32::from_str_radix(s.trim(), 16).ok().filter(|n| *n != 0)
}

/// The primary usage page and usage of a report descriptor: the first
/// Usage Page and Usage items that appear before the first Collection.
///
/// Only short items are interpreted; long items are skipped.
pub fn primary_usage(descriptor: &[u8]) -> (Option<u32>, Option<u32>) {
    const LONG_ITEM: u8 = 0xFE;
    const USAGE_PAGE: u8 = 0x04;
    const USAGE: u8 = 0x08;
    const COLLECTION: u8 = 0xA0;

    let mut page = None;
    let mut usage = None;
    let mut i = 0;

    while i < descriptor.len() {
        let prefix = descriptor[i];

        if prefix == LONG_ITEM {
            let size = descriptor.get(i + 1).copied().unwrap_or(0) as usize;
            i += 3 + size;
            continue;
        }

        let size = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let end = i + 1 + size;
        if end > descriptor.len() {
            break;
        }
        let value = descriptor[i + 1..end]
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

        match prefix & 0xFC {
            USAGE_PAGE if page.is_none() => page = Some(value),
            USAGE if usage.is_none() => usage = Some(value),
            COLLECTION => break,
            _ => {}
        }
        i = end;
    }

    // A 4-byte Usage carries its own page in the high half.
    if let Some(u) = usage.filter(|u| *u > 0xFFFF) {
        page = Some(u >> 16);
        usage = Some(u & 0xFFFF);
    }

    (page, usage)
}
