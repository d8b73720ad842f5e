//! Lifecycle tests for the sensor session controller.

use ridgeline_core::{DeviceIdentity, Error};
use ridgeline_sensor::{
    AnySensorDevice, CaptureEvent, MockSensor, MockSensorHandle, SensorCall, SensorSession,
    SessionState,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn scanner() -> DeviceIdentity {
    DeviceIdentity::from_raw(0x1b55, 7)
}

fn session_with_mock() -> (
    SensorSession,
    MockSensorHandle,
    mpsc::Receiver<CaptureEvent>,
) {
    let (sensor, handle) = MockSensor::new();
    let (tx, rx) = mpsc::channel(32);
    let session = SensorSession::new(AnySensorDevice::Mock(sensor), tx)
        .with_settle_delay(Duration::from_millis(1));
    (session, handle, rx)
}

#[tokio::test]
async fn start_runs_open_settle_subscribe_capture() {
    let (mut session, handle, _rx) = session_with_mock();

    session.start(scanner()).await.unwrap();

    assert_eq!(session.state(), SessionState::Capturing);
    assert_eq!(session.identity(), Some(scanner()));
    assert!(handle.is_open());
    assert!(handle.is_capturing());
    assert_eq!(
        handle.calls(),
        vec![
            SensorCall::Open(scanner()),
            SensorCall::Subscribe,
            SensorCall::StartCapture,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn capture_start_waits_for_settle_delay() {
    let (sensor, handle) = MockSensor::new();
    let (tx, _rx) = mpsc::channel(32);
    let mut session = SensorSession::new(AnySensorDevice::Mock(sensor), tx);

    let before = tokio::time::Instant::now();
    session.start(scanner()).await.unwrap();
    let elapsed = before.elapsed();

    // The default 200ms settle pause is awaited in full before capture
    // registration; the paused clock only advances across sleeps.
    assert!(elapsed >= Duration::from_millis(200));
    assert_eq!(
        handle.calls(),
        vec![
            SensorCall::Open(scanner()),
            SensorCall::Subscribe,
            SensorCall::StartCapture,
        ]
    );
}

#[tokio::test]
async fn restart_closes_prior_session_first() {
    let (mut session, handle, _rx) = session_with_mock();

    session.start(scanner()).await.unwrap();
    let second = DeviceIdentity::from_raw(0x1b55, 8);
    session.start(second).await.unwrap();

    assert_eq!(
        handle.calls(),
        vec![
            SensorCall::Open(scanner()),
            SensorCall::Subscribe,
            SensorCall::StartCapture,
            SensorCall::StopCapture,
            SensorCall::Close,
            SensorCall::Open(second),
            SensorCall::Subscribe,
            SensorCall::StartCapture,
        ]
    );
    assert_eq!(session.identity(), Some(second));

    // Every open is preceded by a close of the previous handle.
    let calls = handle.calls();
    let mut open = false;
    for call in calls {
        match call {
            SensorCall::Open(_) => {
                assert!(!open, "second handle opened while the first was live");
                open = true;
            }
            SensorCall::Close => open = false,
            _ => {}
        }
    }
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (mut session, handle, _rx) = session_with_mock();

    session.start(scanner()).await.unwrap();
    session.stop().await;
    session.stop().await;

    let closes = handle
        .calls()
        .iter()
        .filter(|c| matches!(c, SensorCall::Close))
        .count();
    let stops = handle
        .calls()
        .iter()
        .filter(|c| matches!(c, SensorCall::StopCapture))
        .count();
    assert_eq!(closes, 1);
    assert_eq!(stops, 1);
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn stop_before_start_touches_nothing() {
    let (mut session, handle, _rx) = session_with_mock();

    session.stop().await;

    assert!(handle.calls().is_empty());
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn open_failure_leaves_session_closed() {
    let (mut session, handle, _rx) = session_with_mock();
    handle.fail_next_open("device busy");

    let result = session.start(scanner()).await;
    assert!(matches!(result, Err(Error::SensorOpenFailure(_))));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!handle.is_open());
    assert_eq!(handle.calls(), vec![SensorCall::Open(scanner())]);
}

#[tokio::test]
async fn capture_start_failure_closes_the_handle() {
    let (mut session, handle, _rx) = session_with_mock();
    handle.fail_next_start("capture rejected");

    let result = session.start(scanner()).await;
    assert!(matches!(result, Err(Error::SensorOpenFailure(_))));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!handle.is_open());
    assert_eq!(
        handle.calls(),
        vec![
            SensorCall::Open(scanner()),
            SensorCall::Subscribe,
            SensorCall::StartCapture,
            SensorCall::Close,
        ]
    );
}

#[tokio::test]
async fn capture_events_flow_to_output() {
    let (mut session, handle, mut rx) = session_with_mock();
    session.start(scanner()).await.unwrap();

    handle.emit_capture_error(-9).await;
    let template = handle.emit_template(vec![0xAB, 0xCD]).await;

    assert_eq!(
        rx.recv().await.unwrap(),
        CaptureEvent::CaptureError { code: -9 }
    );
    match rx.recv().await.unwrap() {
        CaptureEvent::TemplateReady(received) => {
            assert_eq!(received.hex(), template.hex());
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[tokio::test]
async fn stop_halts_event_forwarding() {
    let (mut session, handle, mut rx) = session_with_mock();
    session.start(scanner()).await.unwrap();
    session.stop().await;

    handle.emit_capture_error(-9).await;
    let outcome = timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(outcome.is_err(), "event leaked past stop: {:?}", outcome);
}
