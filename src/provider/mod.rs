// src/provider/mod.rs

//! Device-notification services.
//!
//! A provider enumerates devices of one category, matches them against
//! [`MatcherQuery`]s and reports arrivals/removals for every registered
//! subscription over a single channel of [`Notification`]s. The daemon
//! loop owns the receiving end of that channel.
//!
//! - [`memory`] is a deterministic in-process provider used by tests.
//! - [`sysfs`] watches Linux hidraw devices (`/dev` + `/sys/class/hidraw`).

use tokio::sync::mpsc;

use crate::device::DeviceHandle;
use crate::errors::{MatcherBuildError, SubscriptionError};
use crate::matcher::MatcherQuery;
use crate::types::EventKind;

pub mod hidraw;
pub mod memory;
pub mod sysfs;

pub use memory::MemoryProvider;
pub use sysfs::SysfsProvider;

/// Capacity of the provider → daemon notification channel.
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

pub type SubscriptionId = u64;

/// A registered subscription: one query bound to one event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    kind: EventKind,
}

impl SubscriptionHandle {
    pub fn new(id: SubscriptionId, kind: EventKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// One delivery from a provider: every device that matched `subscription`
/// in a single notification, in provider order.
#[derive(Debug)]
pub struct Notification {
    pub subscription: SubscriptionId,
    pub devices: Vec<DeviceHandle>,
}

pub fn notification_channel() -> (mpsc::Sender<Notification>, mpsc::Receiver<Notification>) {
    mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY)
}

/// Interface the daemon needs from a device-notification service.
pub trait NotificationService: Send {
    /// An unconstrained query for the device category this provider
    /// watches. Fields are added with [`MatcherQuery::set_field`].
    fn base_category_filter(&self) -> Result<MatcherQuery, MatcherBuildError>;

    /// Register interest in `kind` events for devices matching `query`.
    ///
    /// Future events are delivered over the provider's notification
    /// channel. Devices that already match are held back until
    /// [`NotificationService::drain_current_matches`] is called.
    fn subscribe(
        &mut self,
        kind: EventKind,
        query: MatcherQuery,
    ) -> Result<SubscriptionHandle, SubscriptionError>;

    /// Take the devices that matched `subscription` at registration time.
    ///
    /// Arrival subscriptions return the devices already present; removal
    /// subscriptions return nothing. A second call returns nothing.
    fn drain_current_matches(&mut self, subscription: &SubscriptionHandle) -> Vec<DeviceHandle>;
}
