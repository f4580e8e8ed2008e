// src/provider/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::device::{DeviceHandle, DeviceId, DeviceProperties, ReleaseHook};
use crate::errors::{MatcherBuildError, SubscriptionError};
use crate::matcher::MatcherQuery;
use crate::provider::{Notification, NotificationService, SubscriptionHandle, SubscriptionId};
use crate::types::EventKind;

/// Category reported by [`MemoryProvider::base_category_filter`].
pub const MEMORY_CATEGORY: &str = "memory-hid";

/// In-process notification service.
///
/// Devices are plugged and unplugged by calling methods on the provider,
/// which emits notifications exactly like a real provider would. Clones
/// share state, so a test can keep one clone to drive events while the
/// daemon owns another.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    state: Arc<Mutex<MemoryState>>,
    releases: Arc<ReleaseLedger>,
    tx: mpsc::Sender<Notification>,
}

#[derive(Debug, Default)]
struct MemoryState {
    base_filter_error: Option<String>,
    refused: HashSet<EventKind>,
    next_subscription: SubscriptionId,
    next_device: u64,
    subscriptions: Vec<MemorySubscription>,
    present: BTreeMap<DeviceId, Arc<DeviceProperties>>,
}

#[derive(Debug)]
struct MemorySubscription {
    handle: SubscriptionHandle,
    query: MatcherQuery,
    pending: Vec<(DeviceId, Arc<DeviceProperties>)>,
}

/// Counts handles given out and released, per device.
#[derive(Debug, Default)]
struct ReleaseLedger {
    inner: Mutex<LedgerCounts>,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    issued: usize,
    released: HashMap<DeviceId, usize>,
}

impl ReleaseHook for ReleaseLedger {
    fn release(&self, id: &DeviceId) {
        let mut counts = self.inner.lock().unwrap();
        *counts.released.entry(id.clone()).or_default() += 1;
    }
}

impl MemoryProvider {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            releases: Arc::new(ReleaseLedger::default()),
            tx,
        }
    }

    /// Make `base_category_filter` fail with `reason`.
    pub fn fail_base_filter(&self, reason: impl Into<String>) {
        self.state.lock().unwrap().base_filter_error = Some(reason.into());
    }

    /// Make `subscribe` refuse subscriptions of `kind`.
    pub fn refuse_subscriptions(&self, kind: EventKind) {
        self.state.lock().unwrap().refused.insert(kind);
    }

    /// Add a device without emitting any notification, as if it had been
    /// connected before the daemon started.
    pub fn add_present(&self, properties: DeviceProperties) -> DeviceId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        state.present.insert(id.clone(), Arc::new(properties));
        id
    }

    /// Connect a device and notify matching arrival subscriptions.
    pub async fn plug(&self, properties: DeviceProperties) -> DeviceId {
        let (id, notifications) = {
            let mut state = self.state.lock().unwrap();
            let id = state.allocate_id();
            let props = Arc::new(properties);
            state.present.insert(id.clone(), Arc::clone(&props));
            let batch = vec![(id.clone(), props)];
            (id, self.notifications_for(&state, EventKind::Arrival, &batch))
        };
        self.send_all(notifications).await;
        id
    }

    /// Disconnect a device and notify matching removal subscriptions.
    /// Unknown ids are ignored.
    pub async fn unplug(&self, id: &DeviceId) {
        let notifications = {
            let mut state = self.state.lock().unwrap();
            match state.present.remove(id) {
                Some(props) => {
                    let batch = vec![(id.clone(), props)];
                    self.notifications_for(&state, EventKind::Removal, &batch)
                }
                None => Vec::new(),
            }
        };
        self.send_all(notifications).await;
    }

    /// Connect several devices at once; each matching arrival subscription
    /// receives them in one notification, in the given order.
    pub async fn plug_batch(&self, devices: Vec<DeviceProperties>) -> Vec<DeviceId> {
        let (ids, notifications) = {
            let mut state = self.state.lock().unwrap();
            let mut batch = Vec::with_capacity(devices.len());
            for properties in devices {
                let id = state.allocate_id();
                let props = Arc::new(properties);
                state.present.insert(id.clone(), Arc::clone(&props));
                batch.push((id, props));
            }
            let ids = batch.iter().map(|(id, _)| id.clone()).collect();
            (ids, self.notifications_for(&state, EventKind::Arrival, &batch))
        };
        self.send_all(notifications).await;
        ids
    }

    /// How many times the handle for `id` has been released.
    pub fn release_count(&self, id: &DeviceId) -> usize {
        let counts = self.releases.inner.lock().unwrap();
        counts.released.get(id).copied().unwrap_or(0)
    }

    /// Total handles given out so far.
    pub fn issued_handles(&self) -> usize {
        self.releases.inner.lock().unwrap().issued
    }

    /// Handles given out but not yet released.
    pub fn outstanding_handles(&self) -> usize {
        let counts = self.releases.inner.lock().unwrap();
        counts.issued - counts.released.values().sum::<usize>()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }

    fn handle_for(&self, id: DeviceId, props: Arc<DeviceProperties>) -> DeviceHandle {
        self.releases.inner.lock().unwrap().issued += 1;
        DeviceHandle::new(id, props, Arc::clone(&self.releases) as Arc<dyn ReleaseHook>)
    }

    fn notifications_for(
        &self,
        state: &MemoryState,
        kind: EventKind,
        batch: &[(DeviceId, Arc<DeviceProperties>)],
    ) -> Vec<Notification> {
        state
            .subscriptions
            .iter()
            .filter(|s| s.handle.kind() == kind)
            .filter_map(|s| {
                let devices: Vec<DeviceHandle> = batch
                    .iter()
                    .filter(|(_, props)| s.query.matches(props))
                    .map(|(id, props)| self.handle_for(id.clone(), Arc::clone(props)))
                    .collect();
                (!devices.is_empty()).then(|| Notification {
                    subscription: s.handle.id(),
                    devices,
                })
            })
            .collect()
    }

    async fn send_all(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if self.tx.send(notification).await.is_err() {
                debug!("notification receiver dropped; discarding event");
                return;
            }
        }
    }
}

impl MemoryState {
    fn allocate_id(&mut self) -> DeviceId {
        self.next_device += 1;
        DeviceId::new(format!("mem{}", self.next_device))
    }
}

impl NotificationService for MemoryProvider {
    fn base_category_filter(&self) -> Result<MatcherQuery, MatcherBuildError> {
        match self.state.lock().unwrap().base_filter_error {
            Some(ref reason) => Err(MatcherBuildError {
                category: MEMORY_CATEGORY.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(MatcherQuery::for_category(MEMORY_CATEGORY)),
        }
    }

    fn subscribe(
        &mut self,
        kind: EventKind,
        query: MatcherQuery,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        let mut state = self.state.lock().unwrap();
        if state.refused.contains(&kind) {
            return Err(SubscriptionError {
                kind,
                reason: "refused by memory provider".to_string(),
            });
        }

        state.next_subscription += 1;
        let handle = SubscriptionHandle::new(state.next_subscription, kind);

        let pending = match kind {
            EventKind::Arrival => state
                .present
                .iter()
                .filter(|(_, props)| query.matches(props))
                .map(|(id, props)| (id.clone(), Arc::clone(props)))
                .collect(),
            EventKind::Removal => Vec::new(),
        };

        state.subscriptions.push(MemorySubscription {
            handle,
            query,
            pending,
        });
        Ok(handle)
    }

    fn drain_current_matches(&mut self, subscription: &SubscriptionHandle) -> Vec<DeviceHandle> {
        let pending = {
            let mut state = self.state.lock().unwrap();
            state
                .subscriptions
                .iter_mut()
                .find(|s| s.handle == *subscription)
                .map(|s| std::mem::take(&mut s.pending))
                .unwrap_or_default()
        };
        pending
            .into_iter()
            .map(|(id, props)| self.handle_for(id, props))
            .collect()
    }
}
