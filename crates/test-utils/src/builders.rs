#![allow(dead_code)]

use hidkitd::config::{ActionSet, FilterSpec, RawActionSet, RawFilterSpec};
use hidkitd::device::DeviceProperties;

/// Builder for `FilterSpec` to simplify test setup.
#[derive(Debug, Clone, Default)]
pub struct FilterSpecBuilder {
    raw: RawFilterSpec,
}

impl FilterSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vendor_id(mut self, id: u32) -> Self {
        self.raw.vendor_id = Some(id);
        self
    }

    pub fn product_id(mut self, id: u32) -> Self {
        self.raw.product_id = Some(id);
        self
    }

    pub fn usage_page(mut self, page: u32) -> Self {
        self.raw.usage_page = Some(page);
        self
    }

    pub fn usage(mut self, usage: u32) -> Self {
        self.raw.usage = Some(usage);
        self
    }

    pub fn product_name(mut self, name: &str) -> Self {
        self.raw.product_name = Some(name.to_string());
        self
    }

    pub fn device_address(mut self, address: &str) -> Self {
        self.raw.device_address = Some(address.to_string());
        self
    }

    pub fn raw(self) -> RawFilterSpec {
        self.raw
    }

    pub fn build(self) -> FilterSpec {
        FilterSpec::try_from(self.raw).expect("Failed to build valid filter from builder")
    }
}

/// Builder for `ActionSet`.
#[derive(Debug, Clone, Default)]
pub struct ActionSetBuilder {
    raw: RawActionSet,
}

impl ActionSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, path: &str) -> Self {
        self.raw.on_connect = Some(path.into());
        self
    }

    pub fn on_disconnect(mut self, path: &str) -> Self {
        self.raw.on_disconnect = Some(path.into());
        self
    }

    pub fn build(self) -> ActionSet {
        ActionSet::try_from(self.raw).expect("Failed to build valid action set from builder")
    }
}

/// Properties of a device with the given vendor/product ids.
pub fn device(vendor_id: u32, product_id: u32) -> DeviceProperties {
    DeviceProperties {
        vendor_id: Some(vendor_id),
        product_id: Some(product_id),
        ..DeviceProperties::default()
    }
}

/// A keyboard-like device: generic desktop page, keyboard usage.
pub fn keyboard(vendor_id: u32, product_id: u32, name: &str) -> DeviceProperties {
    DeviceProperties {
        primary_usage_page: Some(1),
        primary_usage: Some(6),
        product: Some(name.to_string()),
        ..device(vendor_id, product_id)
    }
}
