// src/matcher/mod.rs

//! Matcher compilation.
//!
//! Turns a validated [`crate::config::FilterSpec`] into a [`MatcherQuery`]
//! the notification service understands. One query is built per
//! subscription, so the arrival and removal subscriptions never alias.

pub mod compile;
pub mod query;

pub use compile::{compile, filter_fields};
pub use query::{MatcherQuery, PropertyKey, PropertyValue, same_address};
