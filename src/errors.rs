// src/errors.rs

//! Crate-wide error types.
//!
//! Everything in here is fatal at startup. Script failures have their own
//! type ([`crate::exec::ActionLaunchError`]) because they never leave the
//! action runner.

use thiserror::Error;

/// The provider could not construct the base category filter for the
/// family of devices being watched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot build base filter for device category '{category}': {reason}")]
pub struct MatcherBuildError {
    pub category: String,
    pub reason: String,
}

/// The provider refused to register a subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot register {kind} subscription: {reason}")]
pub struct SubscriptionError {
    pub kind: crate::types::EventKind,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum HidkitError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    MatcherBuild(#[from] MatcherBuildError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("device notification channel closed")]
    EventChannelClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HidkitError>;
