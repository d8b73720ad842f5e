//! Mock fingerprint sensor for testing and development.
//!
//! Simulates the vendor runtime without hardware: the handle injects
//! capture events, scripts failures, and records every vendor call so
//! lifecycle tests can assert exact ordering.

use crate::events::{CaptureEvent, FrameData, TemplateData};
use crate::traits::FingerprintSensor;
use ridgeline_core::{DeviceIdentity, Error, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Default frame dimensions of the simulated sensor.
const MOCK_FRAME_WIDTH: u32 = 256;
const MOCK_FRAME_HEIGHT: u32 = 288;

/// One recorded call into the vendor runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCall {
    /// `open` with the requested identity.
    Open(DeviceIdentity),

    /// `close`.
    Close,

    /// `subscribe` (capture sink registration).
    Subscribe,

    /// `start_capture`.
    StartCapture,

    /// `stop_capture`.
    StopCapture,
}

/// Shared state between the sensor and its handle.
#[derive(Debug, Default)]
struct MockRuntime {
    calls: Vec<SensorCall>,
    open: bool,
    capturing: bool,
    fail_open: Option<String>,
    fail_start: Option<String>,
    sender: Option<mpsc::Sender<CaptureEvent>>,
}

/// Mock fingerprint sensor.
///
/// # Examples
///
/// ```
/// use ridgeline_core::DeviceIdentity;
/// use ridgeline_sensor::{FingerprintSensor, MockSensor};
///
/// #[tokio::main]
/// async fn main() -> ridgeline_core::Result<()> {
///     let (mut sensor, handle) = MockSensor::new();
///
///     sensor.open(DeviceIdentity::from_raw(0x1b55, 7)).await?;
///     let mut events = sensor.subscribe();
///     sensor.start_capture().await?;
///
///     handle.emit_capture_error(-9).await;
///     let event = events.recv().await.unwrap();
///     assert!(event.is_transient());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    runtime: Arc<Mutex<MockRuntime>>,
}

impl MockSensor {
    /// Create a mock sensor and the handle that controls it.
    pub fn new() -> (Self, MockSensorHandle) {
        let runtime = Arc::new(Mutex::new(MockRuntime::default()));
        (
            Self {
                runtime: Arc::clone(&runtime),
            },
            MockSensorHandle { runtime },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockRuntime> {
        self.runtime.lock().expect("mock runtime poisoned")
    }
}

impl FingerprintSensor for MockSensor {
    async fn open(&mut self, identity: DeviceIdentity) -> Result<()> {
        let mut runtime = self.lock();
        runtime.calls.push(SensorCall::Open(identity));
        if let Some(message) = runtime.fail_open.take() {
            return Err(Error::sensor_open(message));
        }
        runtime.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut runtime = self.lock();
        runtime.calls.push(SensorCall::Close);
        runtime.open = false;
        runtime.capturing = false;
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::Receiver<CaptureEvent> {
        let (tx, rx) = mpsc::channel(32);
        let mut runtime = self.lock();
        runtime.calls.push(SensorCall::Subscribe);
        runtime.sender = Some(tx);
        rx
    }

    async fn start_capture(&mut self) -> Result<()> {
        let mut runtime = self.lock();
        runtime.calls.push(SensorCall::StartCapture);
        if let Some(message) = runtime.fail_start.take() {
            return Err(Error::sensor_open(message));
        }
        runtime.capturing = true;
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<()> {
        let mut runtime = self.lock();
        runtime.calls.push(SensorCall::StopCapture);
        runtime.capturing = false;
        Ok(())
    }

    fn frame_dimensions(&self) -> (u32, u32) {
        (MOCK_FRAME_WIDTH, MOCK_FRAME_HEIGHT)
    }
}

/// Handle for controlling a mock sensor.
///
/// # Examples
///
/// ```
/// use ridgeline_sensor::MockSensor;
///
/// let (_sensor, handle) = MockSensor::new();
/// handle.fail_next_open("device busy");
/// assert!(handle.calls().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    runtime: Arc<Mutex<MockRuntime>>,
}

impl MockSensorHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockRuntime> {
        self.runtime.lock().expect("mock runtime poisoned")
    }

    /// Every vendor call so far, in order.
    pub fn calls(&self) -> Vec<SensorCall> {
        self.lock().calls.clone()
    }

    /// Whether the handle is currently open.
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Whether capture is currently running.
    pub fn is_capturing(&self) -> bool {
        self.lock().capturing
    }

    /// Make the next `open` fail with the given message.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.lock().fail_open = Some(message.into());
    }

    /// Make the next `start_capture` fail with the given message.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.lock().fail_start = Some(message.into());
    }

    /// Inject a raw capture event into the active subscription.
    pub async fn emit(&self, event: CaptureEvent) {
        let sender = self.lock().sender.clone();
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }

    /// Inject a captured frame sized to the mock's dimensions.
    pub async fn emit_frame(&self) -> FrameData {
        let frame = FrameData::new(
            vec![0u8; (MOCK_FRAME_WIDTH * MOCK_FRAME_HEIGHT) as usize],
            MOCK_FRAME_WIDTH,
            MOCK_FRAME_HEIGHT,
        )
        .expect("mock frame dimensions are valid");
        self.emit(CaptureEvent::ImageReady(frame.clone())).await;
        frame
    }

    /// Inject an extracted template.
    pub async fn emit_template(&self, bytes: Vec<u8>) -> TemplateData {
        let template = TemplateData::new(bytes).expect("mock template is non-empty");
        self.emit(CaptureEvent::TemplateReady(template.clone()))
            .await;
        template
    }

    /// Inject the no-finger capture error.
    pub async fn emit_capture_error(&self, code: i32) {
        self.emit(CaptureEvent::CaptureError { code }).await;
    }

    /// Inject an extraction failure.
    pub async fn emit_extract_error(&self, code: i32) {
        self.emit(CaptureEvent::ExtractError { code }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::from_raw(0x1b55, 7)
    }

    #[tokio::test]
    async fn test_mock_records_call_order() {
        let (mut sensor, handle) = MockSensor::new();

        sensor.open(identity()).await.unwrap();
        let _events = sensor.subscribe();
        sensor.start_capture().await.unwrap();
        sensor.stop_capture().await.unwrap();
        sensor.close().await.unwrap();

        assert_eq!(
            handle.calls(),
            vec![
                SensorCall::Open(identity()),
                SensorCall::Subscribe,
                SensorCall::StartCapture,
                SensorCall::StopCapture,
                SensorCall::Close,
            ]
        );
        assert!(!handle.is_open());
        assert!(!handle.is_capturing());
    }

    #[tokio::test]
    async fn test_mock_scripted_open_failure() {
        let (mut sensor, handle) = MockSensor::new();
        handle.fail_next_open("device busy");

        assert!(sensor.open(identity()).await.is_err());
        assert!(!handle.is_open());

        // The failure is one-shot.
        assert!(sensor.open(identity()).await.is_ok());
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn test_mock_event_injection() {
        let (mut sensor, handle) = MockSensor::new();
        let mut events = sensor.subscribe();

        let template = handle.emit_template(vec![1, 2, 3]).await;
        match events.recv().await.unwrap() {
            CaptureEvent::TemplateReady(received) => assert_eq!(received.bytes, template.bytes),
            other => panic!("expected template, got {:?}", other),
        }

        handle.emit_extract_error(13).await;
        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::ExtractError { code: 13 }
        );
    }

    #[tokio::test]
    async fn test_mock_frame_matches_dimensions() {
        let (sensor, handle) = MockSensor::new();
        let (width, height) = sensor.frame_dimensions();

        let frame = handle.emit_frame().await;
        assert_eq!(frame.width, width);
        assert_eq!(frame.height, height);
        assert_eq!(frame.pixel_count(), (width * height) as usize);
    }
}
