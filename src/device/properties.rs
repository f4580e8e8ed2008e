// src/device/properties.rs

use std::fmt;

/// Provider-assigned identity of a device instance (e.g. `hidraw3`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes a provider reports for one device. Anything the provider
/// could not determine is `None` and will never satisfy a filter on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProperties {
    pub vendor_id: Option<u32>,
    pub product_id: Option<u32>,
    pub primary_usage_page: Option<u32>,
    pub primary_usage: Option<u32>,
    pub product: Option<String>,
    pub address: Option<String>,
}

impl DeviceProperties {
    /// Environment variables describing this device, for scripts.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();
        if let Some(v) = self.vendor_id {
            vars.push(("HIDKITD_VENDOR_ID", v.to_string()));
        }
        if let Some(v) = self.product_id {
            vars.push(("HIDKITD_PRODUCT_ID", v.to_string()));
        }
        if let Some(v) = self.primary_usage_page {
            vars.push(("HIDKITD_USAGE_PAGE", v.to_string()));
        }
        if let Some(v) = self.primary_usage {
            vars.push(("HIDKITD_USAGE", v.to_string()));
        }
        if let Some(ref v) = self.product {
            vars.push(("HIDKITD_PRODUCT", v.clone()));
        }
        if let Some(ref v) = self.address {
            vars.push(("HIDKITD_ADDRESS", v.clone()));
        }
        vars
    }
}

impl fmt::Display for DeviceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "VendorID={} ProductID={} PrimaryUsagePage={} PrimaryUsage={} Product={:?} DeviceAddress={:?}",
            opt(&self.vendor_id),
            opt(&self.product_id),
            opt(&self.primary_usage_page),
            opt(&self.primary_usage),
            self.product.as_deref().unwrap_or(""),
            self.address.as_deref().unwrap_or(""),
        )
    }
}
