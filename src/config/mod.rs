// src/config/mod.rs

//! Configuration for hidkitd.
//!
//! - `model.rs`: raw (deserialisable) and validated data model.
//! - `loader.rs`: optional TOML file + command-line overrides.
//! - `validate.rs`: `TryFrom` conversions enforcing the invariants.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ActionSet, DaemonConfig, DaemonSettings, FilterSpec, RawActionSet, RawDaemonConfig,
    RawDaemonSection, RawFilterSpec,
};
