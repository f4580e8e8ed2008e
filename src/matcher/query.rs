// src/matcher/query.rs

use std::collections::BTreeMap;
use std::fmt;

use crate::device::DeviceProperties;

/// Device attribute names a query can constrain.
///
/// These mirror the property names HID stacks commonly report, so the
/// values a user reads off their system can be used verbatim as filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    VendorId,
    ProductId,
    PrimaryUsagePage,
    PrimaryUsage,
    Product,
    DeviceAddress,
}

impl PropertyKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKey::VendorId => "VendorID",
            PropertyKey::ProductId => "ProductID",
            PropertyKey::PrimaryUsagePage => "PrimaryUsagePage",
            PropertyKey::PrimaryUsage => "PrimaryUsage",
            PropertyKey::Product => "Product",
            PropertyKey::DeviceAddress => "DeviceAddress",
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Number(u32),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Compiled, provider-specific representation of a filter.
///
/// A query is a base device category (the family of devices the provider
/// can watch, e.g. `hidraw`) plus a set of property constraints. All
/// constraints must hold for a device to match.
///
/// Each subscription consumes its own query; build one per subscription
/// with [`crate::matcher::compile`] instead of sharing.
#[derive(Debug, PartialEq, Eq)]
pub struct MatcherQuery {
    category: String,
    fields: BTreeMap<PropertyKey, PropertyValue>,
}

impl MatcherQuery {
    /// An unconstrained query for the given category.
    ///
    /// Only providers should call this, from
    /// [`crate::provider::NotificationService::base_category_filter`].
    pub fn for_category(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Constrain `key` to `value`, replacing any previous constraint on it.
    pub fn set_field(&mut self, key: PropertyKey, value: PropertyValue) {
        self.fields.insert(key, value);
    }

    pub fn field(&self, key: PropertyKey) -> Option<&PropertyValue> {
        self.fields.get(&key)
    }

    /// Constrained fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (PropertyKey, &PropertyValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_unconstrained(&self) -> bool {
        self.fields.is_empty()
    }

    /// True if every constrained field is present on `device` with an
    /// equal value. Missing device properties never match a constraint.
    pub fn matches(&self, device: &DeviceProperties) -> bool {
        self.fields
            .iter()
            .all(|(key, expected)| field_matches(*key, expected, device))
    }
}

impl fmt::Display for MatcherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)?;
        if self.fields.is_empty() {
            return Ok(());
        }
        f.write_str(" where ")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

fn field_matches(key: PropertyKey, expected: &PropertyValue, device: &DeviceProperties) -> bool {
    match (key, expected) {
        (PropertyKey::VendorId, PropertyValue::Number(n)) => device.vendor_id == Some(*n),
        (PropertyKey::ProductId, PropertyValue::Number(n)) => device.product_id == Some(*n),
        (PropertyKey::PrimaryUsagePage, PropertyValue::Number(n)) => {
            device.primary_usage_page == Some(*n)
        }
        (PropertyKey::PrimaryUsage, PropertyValue::Number(n)) => device.primary_usage == Some(*n),
        (PropertyKey::Product, PropertyValue::Text(s)) => device.product.as_deref() == Some(s.as_str()),
        (PropertyKey::DeviceAddress, PropertyValue::Text(s)) => device
            .address
            .as_deref()
            .is_some_and(|addr| same_address(addr, s)),
        // A value of the wrong shape for its key can never match.
        _ => false,
    }
}

/// Compare device addresses ignoring case and treating `-` and `:` as the
/// same separator (`ab-cd-ef-12-34-56` == `AB:CD:EF:12:34:56`).
pub fn same_address(a: &str, b: &str) -> bool {
    fn normalise(c: char) -> char {
        if c == '-' { ':' } else { c.to_ascii_lowercase() }
    }
    a.chars().map(normalise).eq(b.chars().map(normalise))
}
