// tests/daemon_memory_provider.rs

mod common;
use crate::common::builders::{ActionSetBuilder, FilterSpecBuilder, device};
use crate::common::{Harness, RecordingRunner, init_tracing, wait_until, with_timeout};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hidkitd::device::{DeviceHandle, DeviceId, ReleaseHook};
use hidkitd::dispatch::{DispatchStats, EventDispatcher};
use hidkitd::engine::{Daemon, DaemonState, shutdown_channel};
use hidkitd::errors::HidkitError;
use hidkitd::provider::{MemoryProvider, Notification, notification_channel};
use hidkitd::types::EventKind;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn matching_device_triggers_exactly_one_connect_launch() -> TestResult {
    init_tracing();

    let mut h = Harness::new();
    let daemon = h
        .spawn(
            FilterSpecBuilder::new().vendor_id(1234).product_id(5678).build(),
            ActionSetBuilder::new().on_connect("/tmp/c.sh").build(),
        )
        .await;

    // Non-matching first; the matching one after it proves the first was seen.
    h.provider.plug(device(1234, 9999)).await;
    let id = h.provider.plug(device(1234, 5678)).await;

    let runner = h.runner.clone();
    wait_until(|| runner.invocation_count() == 1).await;

    let stats = daemon.stop().await;

    assert_eq!(h.runner.launches(), vec![PathBuf::from("/tmp/c.sh")]);
    let request = &h.runner.requests()[0];
    assert_eq!(request.kind, EventKind::Arrival);
    assert_eq!(request.device, id);
    assert_eq!(h.provider.release_count(&id), 1);
    assert_eq!(h.provider.outstanding_handles(), 0);
    assert_eq!(stats.launches, 1);
    Ok(())
}

#[tokio::test]
async fn device_present_at_startup_fires_once_during_catch_up() -> TestResult {
    init_tracing();

    let mut h = Harness::new();
    let present = h.provider.add_present(device(1, 2));
    h.provider.add_present(device(3, 4));

    let daemon = h
        .spawn(
            FilterSpecBuilder::new().vendor_id(1).build(),
            ActionSetBuilder::new()
                .on_connect("/tmp/c.sh")
                .on_disconnect("/tmp/d.sh")
                .build(),
        )
        .await;

    // Catch-up has finished by the time both subscriptions exist.
    assert_eq!(h.runner.invocation_count(), 1);
    assert_eq!(h.runner.requests()[0].device, present);
    assert_eq!(h.provider.release_count(&present), 1);

    // Removing it afterwards fires the disconnect action, not a second connect.
    h.provider.unplug(&present).await;
    let runner = h.runner.clone();
    wait_until(|| runner.invocation_count() == 2).await;

    daemon.stop().await;

    assert_eq!(
        h.runner.launches(),
        vec![PathBuf::from("/tmp/c.sh"), PathBuf::from("/tmp/d.sh")]
    );
    assert_eq!(h.provider.release_count(&present), 2);
    assert_eq!(h.provider.outstanding_handles(), 0);
    Ok(())
}

#[tokio::test]
async fn restart_against_same_present_device_fires_once_per_run() -> TestResult {
    init_tracing();

    for _run in 0..2 {
        let mut h = Harness::new();
        h.provider.add_present(device(1, 2));

        let daemon = h
            .spawn(
                FilterSpecBuilder::new().vendor_id(1).build(),
                ActionSetBuilder::new().on_connect("/tmp/c.sh").build(),
            )
            .await;
        daemon.stop().await;

        assert_eq!(h.runner.launches().len(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn batch_of_n_devices_gives_n_invocations_and_n_releases() -> TestResult {
    init_tracing();

    let mut h = Harness::new();
    let daemon = h
        .spawn(
            FilterSpecBuilder::new().usage_page(1).build(),
            ActionSetBuilder::new().on_connect("/tmp/c.sh").build(),
        )
        .await;

    let devices = (0..5)
        .map(|i| hidkitd::device::DeviceProperties {
            primary_usage_page: Some(1),
            product_id: Some(100 + i),
            ..Default::default()
        })
        .collect();
    let ids = h.provider.plug_batch(devices).await;

    let runner = h.runner.clone();
    wait_until(|| runner.invocation_count() == 5).await;
    let stats = daemon.stop().await;

    // Delivery order is preserved within the batch.
    let seen: Vec<_> = h.runner.requests().into_iter().map(|r| r.device).collect();
    assert_eq!(seen, ids);
    for id in &ids {
        assert_eq!(h.provider.release_count(id), 1);
    }
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.devices, 5);
    Ok(())
}

#[tokio::test]
async fn arrival_without_connect_script_launches_nothing_but_releases() -> TestResult {
    init_tracing();

    let mut h = Harness::new();
    let daemon = h
        .spawn(
            FilterSpecBuilder::new().vendor_id(7).build(),
            ActionSetBuilder::new().on_disconnect("/tmp/d.sh").build(),
        )
        .await;

    let id = h.provider.plug(device(7, 1)).await;
    let runner = h.runner.clone();
    wait_until(|| runner.invocation_count() == 1).await;

    let stats = daemon.stop().await;

    assert!(h.runner.launches().is_empty());
    assert_eq!(h.runner.requests()[0].script, None);
    assert_eq!(h.provider.release_count(&id), 1);
    assert_eq!(stats.launches, 0);
    assert_eq!(stats.devices, 1);
    Ok(())
}

#[tokio::test]
async fn removal_of_unmatched_device_is_ignored() -> TestResult {
    init_tracing();

    let mut h = Harness::new();
    let daemon = h
        .spawn(
            FilterSpecBuilder::new().vendor_id(7).build(),
            ActionSetBuilder::new().on_disconnect("/tmp/d.sh").build(),
        )
        .await;

    let other = h.provider.plug(device(8, 1)).await;
    h.provider.unplug(&other).await;
    let mine = h.provider.plug(device(7, 1)).await;
    h.provider.unplug(&mine).await;

    let runner = h.runner.clone();
    wait_until(|| runner.launches().len() == 1).await;
    daemon.stop().await;

    let removal: Vec<_> = h
        .runner
        .requests()
        .into_iter()
        .filter(|r| r.kind == EventKind::Removal)
        .map(|r| r.device)
        .collect();
    assert_eq!(removal, vec![mine]);
    assert_eq!(h.provider.issued_handles(), 2);
    assert_eq!(h.provider.outstanding_handles(), 0);
    Ok(())
}

#[tokio::test]
async fn refused_subscription_is_fatal_before_the_loop() -> TestResult {
    init_tracing();

    let (tx, rx) = notification_channel();
    let provider = MemoryProvider::new(tx);
    provider.add_present(device(1, 1));
    provider.refuse_subscriptions(EventKind::Arrival);

    let runner = RecordingRunner::new();
    let dispatcher = EventDispatcher::new(
        Arc::new(ActionSetBuilder::new().on_connect("/tmp/c.sh").build()),
        runner.clone(),
    );
    let (_shutdown, shutdown_rx) = shutdown_channel();
    let daemon = Daemon::new(
        provider.clone(),
        rx,
        dispatcher,
        FilterSpecBuilder::new().vendor_id(1).build(),
        shutdown_rx,
    );

    match with_timeout(daemon.run()).await {
        Err(HidkitError::Subscription(err)) => assert_eq!(err.kind, EventKind::Arrival),
        other => panic!("Expected SubscriptionError, got: {:?}", other),
    }
    assert_eq!(runner.invocation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn matcher_build_failure_is_fatal_before_any_subscription() -> TestResult {
    init_tracing();

    let (tx, rx) = notification_channel();
    let provider = MemoryProvider::new(tx);
    provider.fail_base_filter("category unavailable");

    let dispatcher = EventDispatcher::new(
        Arc::new(ActionSetBuilder::new().on_connect("/tmp/c.sh").build()),
        RecordingRunner::new(),
    );
    let (_shutdown, shutdown_rx) = shutdown_channel();
    let mut daemon = Daemon::new(
        provider.clone(),
        rx,
        dispatcher,
        FilterSpecBuilder::new().vendor_id(1).build(),
        shutdown_rx,
    );

    let result = daemon.start().await;
    assert!(matches!(result, Err(HidkitError::MatcherBuild(_))));
    assert_eq!(daemon.state(), DaemonState::Starting);
    assert_eq!(provider.subscription_count(), 0);
    Ok(())
}

#[tokio::test]
async fn start_moves_to_monitoring_and_shutdown_stops_the_loop() -> TestResult {
    init_tracing();

    let (tx, rx) = notification_channel();
    let provider = MemoryProvider::new(tx);
    let dispatcher = EventDispatcher::new(
        Arc::new(ActionSetBuilder::new().on_connect("/tmp/c.sh").build()),
        RecordingRunner::new(),
    );
    let (shutdown, shutdown_rx) = shutdown_channel();
    let mut daemon = Daemon::new(
        provider.clone(),
        rx,
        dispatcher,
        FilterSpecBuilder::new().vendor_id(1).build(),
        shutdown_rx,
    );

    assert_eq!(daemon.state(), DaemonState::Starting);
    daemon.start().await?;
    assert_eq!(daemon.state(), DaemonState::Monitoring);
    assert_eq!(provider.subscription_count(), 2);

    // Raised before run(): the loop exits without waiting for events.
    shutdown.trigger();
    let stats = with_timeout(daemon.run()).await?;
    assert_eq!(stats.devices, 0);
    Ok(())
}

#[tokio::test]
async fn closed_notification_channel_ends_the_loop_with_an_error() -> TestResult {
    init_tracing();

    // The daemon listens on a channel whose only sender is already gone.
    let (tx, rx) = notification_channel();
    drop(tx);
    let (unused_tx, _unused_rx) = notification_channel();

    let dispatcher = EventDispatcher::new(
        Arc::new(ActionSetBuilder::new().on_connect("/tmp/c.sh").build()),
        RecordingRunner::new(),
    );
    let (_shutdown, shutdown_rx) = shutdown_channel();
    let daemon = Daemon::new(
        MemoryProvider::new(unused_tx),
        rx,
        dispatcher,
        FilterSpecBuilder::new().vendor_id(1).build(),
        shutdown_rx,
    );

    assert!(matches!(
        with_timeout(daemon.run()).await,
        Err(HidkitError::EventChannelClosed)
    ));
    Ok(())
}

#[derive(Default)]
struct CountingHook(AtomicUsize);

impl ReleaseHook for CountingHook {
    fn release(&self, _id: &DeviceId) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn notification_for_unknown_subscription_only_releases() -> TestResult {
    init_tracing();

    let runner = RecordingRunner::new();
    let mut dispatcher = EventDispatcher::new(
        Arc::new(ActionSetBuilder::new().on_connect("/tmp/c.sh").build()),
        runner.clone(),
    );

    let hook = Arc::new(CountingHook::default());
    let devices = ["a", "b"]
        .into_iter()
        .map(|id| {
            DeviceHandle::new(
                DeviceId::new(id),
                Arc::new(device(1, 1)),
                Arc::clone(&hook) as Arc<dyn ReleaseHook>,
            )
        })
        .collect();

    dispatcher
        .dispatch(Notification {
            subscription: 42,
            devices,
        })
        .await;

    assert_eq!(hook.0.load(Ordering::SeqCst), 2);
    assert_eq!(runner.invocation_count(), 0);
    assert_eq!(dispatcher.stats(), DispatchStats::default());
    Ok(())
}
