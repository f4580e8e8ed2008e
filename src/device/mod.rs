// src/device/mod.rs

//! Device identities, properties and handles shared by providers and the
//! dispatcher.

pub mod handle;
pub mod properties;

pub use handle::{DeviceHandle, NoopRelease, ReleaseHook};
pub use properties::{DeviceId, DeviceProperties};
