// src/dispatch/dispatcher.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ActionSet, FilterSpec};
use crate::device::DeviceHandle;
use crate::errors::Result;
use crate::exec::{ActionRequest, ActionRunner};
use crate::matcher::compile;
use crate::provider::{Notification, NotificationService, SubscriptionHandle, SubscriptionId};
use crate::types::EventKind;

/// A batch of matched devices of one kind, as handed to the dispatcher.
#[derive(Debug)]
pub struct DeviceEvent {
    pub kind: EventKind,
    pub devices: Vec<DeviceHandle>,
}

/// Counters describing what the dispatcher has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Event batches processed, catch-up batches included.
    pub batches: u64,
    /// Devices processed (one runner invocation and one release each).
    pub devices: u64,
    /// Runner invocations that carried a script.
    pub launches: u64,
}

/// Subscription + callback core.
///
/// Owns the action set and the runner, both injected at construction. Each
/// registered subscription maps to the event kind its callback handles.
pub struct EventDispatcher<R: ActionRunner> {
    actions: Arc<ActionSet>,
    runner: R,
    subscriptions: HashMap<SubscriptionId, SubscriptionHandle>,
    stats: DispatchStats,
}

impl<R: ActionRunner> fmt::Debug for EventDispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("actions", &self.actions)
            .field("subscriptions", &self.subscriptions)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R: ActionRunner> EventDispatcher<R> {
    pub fn new(actions: Arc<ActionSet>, runner: R) -> Self {
        Self {
            actions,
            runner,
            subscriptions: HashMap::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &SubscriptionHandle> {
        self.subscriptions.values()
    }

    /// Subscribe to arrivals and removals of devices matching `filter`.
    ///
    /// Each subscription gets its own compiled query. Right after each one
    /// is registered, the devices it already matches are processed, so a
    /// device connected before startup still triggers the connect action.
    pub async fn register<P: NotificationService>(
        &mut self,
        provider: &mut P,
        filter: &FilterSpec,
    ) -> Result<()> {
        for kind in EventKind::ALL {
            let query = compile(&*provider, filter)?;
            info!(kind = %kind, query = %query, "registering subscription");

            let handle = provider.subscribe(kind, query)?;
            self.subscriptions.insert(handle.id(), handle);

            let present = provider.drain_current_matches(&handle);
            if !present.is_empty() {
                info!(
                    kind = %kind,
                    count = present.len(),
                    "processing devices matched at registration"
                );
            }
            self.handle_event(DeviceEvent {
                kind,
                devices: present,
            })
            .await;
        }
        Ok(())
    }

    /// Route a provider notification to the callback of its subscription.
    pub async fn dispatch(&mut self, notification: Notification) {
        let Some(handle) = self.subscriptions.get(&notification.subscription).copied() else {
            warn!(
                subscription = notification.subscription,
                devices = notification.devices.len(),
                "notification for unknown subscription; releasing devices"
            );
            for device in notification.devices {
                device.release();
            }
            return;
        };

        self.handle_event(DeviceEvent {
            kind: handle.kind(),
            devices: notification.devices,
        })
        .await;
    }

    /// Process every device in `event`, in delivery order: run the action
    /// configured for the event kind, then release the device.
    pub async fn handle_event(&mut self, event: DeviceEvent) {
        if event.devices.is_empty() {
            return;
        }
        self.stats.batches += 1;

        for device in event.devices {
            info!(kind = %event.kind, device = %device.id(), "received device event");
            debug!(device = %device.id(), properties = %device.properties(), "device properties");

            let script = self.actions.script_for(event.kind).map(|p| p.to_path_buf());
            if script.is_some() {
                self.stats.launches += 1;
            }

            let request = ActionRequest {
                kind: event.kind,
                script,
                device: device.id().clone(),
                properties: device.properties_arc(),
            };
            self.runner.run_action(request).await;

            self.stats.devices += 1;
            device.release();
        }
    }
}
