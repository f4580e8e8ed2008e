// src/provider/sysfs.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::event::EventKind as NotifyKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::device::{DeviceHandle, DeviceId, DeviceProperties, NoopRelease, ReleaseHook};
use crate::errors::{MatcherBuildError, SubscriptionError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::matcher::MatcherQuery;
use crate::provider::hidraw::{is_hidraw_node, read_device};
use crate::provider::{Notification, NotificationService, SubscriptionHandle, SubscriptionId};
use crate::types::EventKind;

/// Category this provider watches.
pub const HIDRAW_CATEGORY: &str = "hidraw";

/// A hidraw node appearing in or disappearing from the device directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeChange {
    Added(String),
    Removed(String),
}

/// Linux hidraw notification service.
///
/// Arrivals and removals are detected by watching the device directory
/// (normally `/dev`) for `hidrawN` nodes; properties come from the sysfs
/// class directory (normally `/sys/class/hidraw`). Properties are cached
/// when a device is first seen so that removals can still be matched after
/// its sysfs entry is gone.
pub struct SysfsProvider {
    fs: Arc<dyn FileSystem>,
    dev_dir: PathBuf,
    class_dir: PathBuf,
    state: Arc<Mutex<SysfsState>>,
    tx: mpsc::Sender<Notification>,
    watcher: Option<RecommendedWatcher>,
}

#[derive(Debug, Default)]
struct SysfsState {
    next_subscription: SubscriptionId,
    subscriptions: Vec<SysfsSubscription>,
    known: HashMap<DeviceId, Arc<DeviceProperties>>,
}

#[derive(Debug)]
struct SysfsSubscription {
    handle: SubscriptionHandle,
    query: MatcherQuery,
    pending: Vec<(DeviceId, Arc<DeviceProperties>)>,
}

impl std::fmt::Debug for SysfsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysfsProvider")
            .field("dev_dir", &self.dev_dir)
            .field("class_dir", &self.class_dir)
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl SysfsProvider {
    pub fn new(
        dev_dir: impl Into<PathBuf>,
        class_dir: impl Into<PathBuf>,
        tx: mpsc::Sender<Notification>,
    ) -> Self {
        Self::with_fs(Arc::new(RealFileSystem), dev_dir, class_dir, tx)
    }

    pub fn with_fs(
        fs: Arc<dyn FileSystem>,
        dev_dir: impl Into<PathBuf>,
        class_dir: impl Into<PathBuf>,
        tx: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            fs,
            dev_dir: dev_dir.into(),
            class_dir: class_dir.into(),
            state: Arc::new(Mutex::new(SysfsState::default())),
            tx,
            watcher: None,
        }
    }

    /// Every hidraw device currently present, sorted by node name.
    ///
    /// Devices whose properties cannot be read are skipped with a warning.
    pub fn list_devices(&self) -> anyhow::Result<Vec<(DeviceId, DeviceProperties)>> {
        let mut devices = enumerate(self.fs.as_ref(), &self.class_dir)?;
        devices.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(devices)
    }

    /// Turn one node change into the notifications it causes.
    ///
    /// Used by the watcher task; public so the matching logic can be
    /// exercised without a real device directory.
    pub fn handle_node_change(&self, change: NodeChange) -> Vec<Notification> {
        process_node_change(&self.state, self.fs.as_ref(), &self.class_dir, change)
    }

    /// Start watching the device directory, once.
    fn ensure_watching(&mut self, kind: EventKind) -> Result<(), SubscriptionError> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let refuse = |reason: String| SubscriptionError { kind, reason };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| refuse(format!("no async runtime to deliver events on: {e}")))?;

        // Channel from the blocking notify callback into the async world.
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = raw_tx.send(event) {
                        eprintln!("hidkitd: failed to forward device event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("hidkitd: device watch error: {err}");
                }
            },
            Config::default(),
        )
        .map_err(|e| refuse(format!("creating device watcher: {e}")))?;

        watcher
            .watch(&self.dev_dir, RecursiveMode::NonRecursive)
            .map_err(|e| refuse(format!("watching {:?}: {e}", self.dev_dir)))?;

        info!(dev_dir = ?self.dev_dir, class_dir = ?self.class_dir, "device watcher started");

        let state = Arc::clone(&self.state);
        let fs = Arc::clone(&self.fs);
        let class_dir = self.class_dir.clone();
        let tx = self.tx.clone();

        runtime.spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                for change in node_changes(&event) {
                    debug!(?change, "device node change");
                    for notification in process_node_change(&state, fs.as_ref(), &class_dir, change)
                    {
                        if tx.send(notification).await.is_err() {
                            debug!("notification receiver dropped; stopping device watcher task");
                            return;
                        }
                    }
                }
            }
            debug!("device watcher event loop finished");
        });

        self.watcher = Some(watcher);
        Ok(())
    }
}

impl NotificationService for SysfsProvider {
    fn base_category_filter(&self) -> Result<MatcherQuery, MatcherBuildError> {
        if !self.fs.is_dir(&self.class_dir) {
            return Err(MatcherBuildError {
                category: HIDRAW_CATEGORY.to_string(),
                reason: format!("{:?} does not exist or is not a directory", self.class_dir),
            });
        }
        Ok(MatcherQuery::for_category(HIDRAW_CATEGORY))
    }

    fn subscribe(
        &mut self,
        kind: EventKind,
        query: MatcherQuery,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        if query.category() != HIDRAW_CATEGORY {
            return Err(SubscriptionError {
                kind,
                reason: format!(
                    "query for category '{}' cannot be served by the {HIDRAW_CATEGORY} provider",
                    query.category()
                ),
            });
        }

        // Watch first, then snapshot: a node appearing in between shows up
        // in both, and the watcher skips nodes already in `known`.
        self.ensure_watching(kind)?;

        let present = enumerate(self.fs.as_ref(), &self.class_dir).map_err(|e| SubscriptionError {
            kind,
            reason: format!("enumerating present devices: {e:#}"),
        })?;

        let mut state = self.state.lock().unwrap();
        let mut pending = Vec::new();
        for (id, props) in present {
            let props = Arc::new(props);
            if kind == EventKind::Arrival && query.matches(&props) {
                pending.push((id.clone(), Arc::clone(&props)));
            }
            state.known.insert(id, props);
        }

        state.next_subscription += 1;
        let handle = SubscriptionHandle::new(state.next_subscription, kind);
        state.subscriptions.push(SysfsSubscription {
            handle,
            query,
            pending,
        });
        Ok(handle)
    }

    fn drain_current_matches(&mut self, subscription: &SubscriptionHandle) -> Vec<DeviceHandle> {
        let mut state = self.state.lock().unwrap();
        state
            .subscriptions
            .iter_mut()
            .find(|s| s.handle == *subscription)
            .map(|s| std::mem::take(&mut s.pending))
            .unwrap_or_default()
            .into_iter()
            .map(|(id, props)| new_handle(id, props))
            .collect()
    }
}

fn new_handle(id: DeviceId, props: Arc<DeviceProperties>) -> DeviceHandle {
    // Nothing to give back to sysfs; releasing is bookkeeping only.
    DeviceHandle::new(id, props, Arc::new(NoopRelease) as Arc<dyn ReleaseHook>)
}

fn enumerate(fs: &dyn FileSystem, class_dir: &Path) -> anyhow::Result<Vec<(DeviceId, DeviceProperties)>> {
    let mut devices = Vec::new();
    for entry in fs.read_dir(class_dir)? {
        let Some(node) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_hidraw_node(node) {
            continue;
        }
        match read_device(fs, class_dir, node) {
            Ok(props) => devices.push((DeviceId::new(node), props)),
            Err(err) => warn!(node, error = %format!("{err:#}"), "skipping unreadable device"),
        }
    }
    Ok(devices)
}

/// hidraw node changes carried by one notify event.
fn node_changes(event: &Event) -> Vec<NodeChange> {
    let make: fn(String) -> NodeChange = match event.kind {
        NotifyKind::Create(_) => NodeChange::Added,
        NotifyKind::Remove(_) => NodeChange::Removed,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .filter(|name| is_hidraw_node(name))
        .map(|name| make(name.to_string()))
        .collect()
}

fn process_node_change(
    state: &Mutex<SysfsState>,
    fs: &dyn FileSystem,
    class_dir: &Path,
    change: NodeChange,
) -> Vec<Notification> {
    let (kind, id, props) = match change {
        NodeChange::Added(node) => {
            let id = DeviceId::new(node);
            if state.lock().unwrap().known.contains_key(&id) {
                debug!(device = %id, "device already reported; ignoring");
                return Vec::new();
            }
            let props = match read_device(fs, class_dir, id.as_str()) {
                Ok(props) => Arc::new(props),
                Err(err) => {
                    warn!(device = %id, error = %format!("{err:#}"), "cannot read properties of new device");
                    return Vec::new();
                }
            };
            // Re-checked under the lock; `subscribe` may have listed it meanwhile.
            let mut guard = state.lock().unwrap();
            if guard.known.contains_key(&id) {
                return Vec::new();
            }
            guard.known.insert(id.clone(), Arc::clone(&props));
            (EventKind::Arrival, id, props)
        }
        NodeChange::Removed(node) => {
            let id = DeviceId::new(node);
            match state.lock().unwrap().known.remove(&id) {
                Some(props) => (EventKind::Removal, id, props),
                None => {
                    debug!(device = %id, "removal of a device never seen; ignoring");
                    return Vec::new();
                }
            }
        }
    };

    let state = state.lock().unwrap();
    state
        .subscriptions
        .iter()
        .filter(|s| s.handle.kind() == kind && s.query.matches(&props))
        .map(|s| Notification {
            subscription: s.handle.id(),
            devices: vec![new_handle(id.clone(), Arc::clone(&props))],
        })
        .collect()
}
