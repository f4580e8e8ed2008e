// src/device/handle.rs

//! Owned references to matched devices.
//!
//! A [`DeviceHandle`] is lent to the daemon by the notification service and
//! must be given back exactly once. Ownership enforces that: the handle is
//! released either explicitly via [`DeviceHandle::release`] or implicitly
//! on drop, and it cannot be released twice.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::properties::{DeviceId, DeviceProperties};

/// Provider-side hook invoked when a handle is released.
pub trait ReleaseHook: Send + Sync {
    fn release(&self, id: &DeviceId);
}

/// Hook for providers that keep no per-handle bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelease;

impl ReleaseHook for NoopRelease {
    fn release(&self, _id: &DeviceId) {}
}

pub struct DeviceHandle {
    id: DeviceId,
    properties: Arc<DeviceProperties>,
    hook: Option<Arc<dyn ReleaseHook>>,
}

impl DeviceHandle {
    pub fn new(id: DeviceId, properties: Arc<DeviceProperties>, hook: Arc<dyn ReleaseHook>) -> Self {
        Self {
            id,
            properties,
            hook: Some(hook),
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Shared snapshot of the properties that outlives the handle.
    pub fn properties_arc(&self) -> Arc<DeviceProperties> {
        Arc::clone(&self.properties)
    }

    /// Hand the device back to the provider.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(hook) = self.hook.take() {
            trace!(device = %self.id, "releasing device handle");
            hook.release(&self.id);
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("properties", &self.properties)
            .field("released", &self.hook.is_none())
            .finish()
    }
}
