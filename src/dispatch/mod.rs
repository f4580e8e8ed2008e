// src/dispatch/mod.rs

//! Event dispatch: subscriptions, catch-up and per-device actions.

pub mod dispatcher;

pub use dispatcher::{DeviceEvent, DispatchStats, EventDispatcher};
