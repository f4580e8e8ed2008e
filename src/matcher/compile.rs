// src/matcher/compile.rs

//! Filter → query compilation.

use tracing::debug;

use crate::config::FilterSpec;
use crate::errors::MatcherBuildError;
use crate::matcher::query::{MatcherQuery, PropertyKey, PropertyValue};
use crate::provider::NotificationService;

/// Compile `filter` into a query for `provider`.
///
/// The result is the AND of every field present in the filter; absent
/// fields leave the corresponding property unconstrained. Calling this
/// twice with the same filter yields two independent, equal queries.
///
/// Fails only if the provider cannot build its base category filter.
pub fn compile<P: NotificationService + ?Sized>(
    provider: &P,
    filter: &FilterSpec,
) -> Result<MatcherQuery, MatcherBuildError> {
    let mut query = provider.base_category_filter()?;

    for (key, value) in filter_fields(filter) {
        query.set_field(key, value);
    }

    debug!(query = %query, "compiled matcher query");
    Ok(query)
}

/// The `(key, value)` pairs a filter constrains, in a fixed order.
pub fn filter_fields(filter: &FilterSpec) -> Vec<(PropertyKey, PropertyValue)> {
    let numbers = [
        (PropertyKey::VendorId, filter.vendor_id()),
        (PropertyKey::ProductId, filter.product_id()),
        (PropertyKey::PrimaryUsagePage, filter.usage_page()),
        (PropertyKey::PrimaryUsage, filter.usage()),
    ];
    let texts = [
        (PropertyKey::Product, filter.product_name()),
        (PropertyKey::DeviceAddress, filter.device_address()),
    ];

    numbers
        .into_iter()
        .filter_map(|(key, v)| v.map(|n| (key, PropertyValue::Number(n))))
        .chain(
            texts
                .into_iter()
                .filter_map(|(key, v)| v.map(|s| (key, PropertyValue::Text(s.to_string())))),
        )
        .collect()
}
