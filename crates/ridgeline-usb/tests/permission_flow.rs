//! End-to-end permission and hot-plug flows against the mock broker.

use ridgeline_core::constants::{
    RESULT_DEVICE_NOT_FOUND, RESULT_GRANTED, RESULT_PERMISSION_DENIED,
};
use ridgeline_core::{DeviceIdentity, Error, PermissionState};
use ridgeline_usb::{AnyUsbBroker, MockUsbBroker, MockUsbBrokerHandle, UsbEvent, UsbSessionManager};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn scanner() -> DeviceIdentity {
    DeviceIdentity::from_raw(0x1b55, 7)
}

fn setup() -> (
    UsbSessionManager,
    MockUsbBrokerHandle,
    mpsc::Receiver<UsbEvent>,
) {
    let (broker, handle) = MockUsbBroker::new();
    let (tx, rx) = mpsc::channel(32);
    let mut manager = UsbSessionManager::new(AnyUsbBroker::Mock(broker), tx);
    assert!(manager.register_listeners());
    (manager, handle, rx)
}

async fn next_event(rx: &mut mpsc::Receiver<UsbEvent>) -> UsbEvent {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn assert_no_event(rx: &mut mpsc::Receiver<UsbEvent>) {
    let outcome = timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected event: {:?}", outcome);
}

#[tokio::test]
async fn absent_device_signals_not_found_without_prompt() {
    let (mut manager, handle, mut rx) = setup();

    let result = manager.request_access(scanner()).await;
    assert!(matches!(result, Err(Error::DeviceNotFound { .. })));

    assert_eq!(
        next_event(&mut rx).await,
        UsbEvent::PermissionResolved {
            code: RESULT_DEVICE_NOT_FOUND
        }
    );
    assert_eq!(handle.prompt_count().await, 0);
}

#[tokio::test]
async fn preauthorized_device_resolves_synchronously() {
    let (mut manager, handle, mut rx) = setup();
    handle.attach_device(scanner(), Some("Fingerprint Reader")).await;
    // Drain the attach broadcast.
    assert!(matches!(
        next_event(&mut rx).await,
        UsbEvent::DeviceArrived(_)
    ));
    handle.preauthorize(scanner()).await;

    let state = manager.request_access(scanner()).await.unwrap();
    assert_eq!(state, PermissionState::Granted);

    assert_eq!(
        next_event(&mut rx).await,
        UsbEvent::PermissionResolved {
            code: RESULT_GRANTED
        }
    );
    assert_eq!(handle.prompt_count().await, 0);
}

#[tokio::test]
async fn prompt_then_grant_resolves_once() {
    let (mut manager, handle, mut rx) = setup();
    handle.attach_device(scanner(), None).await;
    assert!(matches!(
        next_event(&mut rx).await,
        UsbEvent::DeviceArrived(_)
    ));

    let state = manager.request_access(scanner()).await.unwrap();
    assert_eq!(state, PermissionState::Pending);
    assert_eq!(manager.permission_state().await, PermissionState::Pending);

    handle.decide(true).await;
    assert_eq!(
        next_event(&mut rx).await,
        UsbEvent::PermissionResolved {
            code: RESULT_GRANTED
        }
    );
    assert_eq!(manager.permission_state().await, PermissionState::Granted);
}

#[tokio::test]
async fn duplicate_grant_broadcasts_resolve_exactly_once() {
    let (mut manager, handle, mut rx) = setup();
    handle.attach_device(scanner(), None).await;
    assert!(matches!(
        next_event(&mut rx).await,
        UsbEvent::DeviceArrived(_)
    ));

    manager.request_access(scanner()).await.unwrap();

    // A stale OS broadcast can repeat the decision.
    handle.decide(true).await;
    handle.decide(true).await;
    handle.decide(true).await;

    assert_eq!(
        next_event(&mut rx).await,
        UsbEvent::PermissionResolved {
            code: RESULT_GRANTED
        }
    );
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn denial_carries_result_code() {
    let (mut manager, handle, mut rx) = setup();
    handle.attach_device(scanner(), None).await;
    assert!(matches!(
        next_event(&mut rx).await,
        UsbEvent::DeviceArrived(_)
    ));

    manager.request_access(scanner()).await.unwrap();
    handle.decide(false).await;

    assert_eq!(
        next_event(&mut rx).await,
        UsbEvent::PermissionResolved {
            code: RESULT_PERMISSION_DENIED
        }
    );
    assert_eq!(
        manager.permission_state().await,
        PermissionState::Denied(RESULT_PERMISSION_DENIED)
    );
}

#[tokio::test]
async fn attach_and_detach_filter_by_vendor() {
    let (_manager, handle, mut rx) = setup();

    // Foreign vendor broadcasts are dropped.
    handle
        .attach_device(DeviceIdentity::from_raw(0x046d, 0xc52b), None)
        .await;
    assert_no_event(&mut rx).await;

    handle.attach_device(scanner(), None).await;
    match next_event(&mut rx).await {
        UsbEvent::DeviceArrived(info) => assert_eq!(info.identity, scanner()),
        other => panic!("expected arrival, got {:?}", other),
    }

    handle.detach_device(scanner()).await;
    match next_event(&mut rx).await {
        UsbEvent::DeviceRemoved(info) => assert_eq!(info.identity, scanner()),
        other => panic!("expected removal, got {:?}", other),
    }

    handle
        .detach_device(DeviceIdentity::from_raw(0x046d, 0xc52b))
        .await;
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn detach_does_not_cancel_pending_request() {
    let (mut manager, handle, mut rx) = setup();
    handle.attach_device(scanner(), None).await;
    assert!(matches!(
        next_event(&mut rx).await,
        UsbEvent::DeviceArrived(_)
    ));

    manager.request_access(scanner()).await.unwrap();

    // Hot-swap while the prompt is outstanding.
    handle.detach_device(scanner()).await;
    assert!(matches!(
        next_event(&mut rx).await,
        UsbEvent::DeviceRemoved(_)
    ));
    assert_eq!(manager.permission_state().await, PermissionState::Pending);

    // The request is still live and a late decision resolves it.
    handle.decide(true).await;
    assert_eq!(
        next_event(&mut rx).await,
        UsbEvent::PermissionResolved {
            code: RESULT_GRANTED
        }
    );
}

#[tokio::test]
async fn unregistered_manager_forwards_nothing() {
    let (broker, handle) = MockUsbBroker::new();
    let (tx, mut rx) = mpsc::channel(32);
    let _manager = UsbSessionManager::new(AnyUsbBroker::Mock(broker), tx);

    // No registration: broadcasts go nowhere.
    handle.attach_device(scanner(), None).await;
    let outcome = timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(outcome.is_err());
}
