//! Fingerprint sensor session control for Ridgeline.
//!
//! The vendor runtime sits behind the [`FingerprintSensor`] trait:
//! open/close the hardware handle, start/stop continuous capture, and a
//! capture-event subscription. The [`SensorSession`] controller owns the
//! single hardware handle and its lifecycle: a start unconditionally
//! closes any prior session, waits the hardware settle delay (awaited,
//! never slept on a thread), then begins capture and pumps events to the
//! service channel. A stop, explicit or forced by device removal, is
//! idempotent and swallows close-time failures.
//!
//! ```
//! use ridgeline_core::DeviceIdentity;
//! use ridgeline_sensor::{AnySensorDevice, MockSensor, SensorSession, SessionState};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> ridgeline_core::Result<()> {
//!     let (sensor, handle) = MockSensor::new();
//!     let (tx, mut rx) = mpsc::channel(16);
//!
//!     let mut session = SensorSession::new(AnySensorDevice::Mock(sensor), tx);
//!     session.start(DeviceIdentity::from_raw(0x1b55, 7)).await?;
//!     assert_eq!(session.state(), SessionState::Capturing);
//!
//!     handle.emit_template(vec![0xAB; 32]).await;
//!     let event = rx.recv().await.unwrap();
//!     println!("event: {:?}", event);
//!
//!     session.stop().await;
//!     assert_eq!(session.state(), SessionState::Closed);
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod events;
pub mod mock;
pub mod session;
pub mod traits;

pub use devices::AnySensorDevice;
pub use events::{CaptureEvent, FrameData, TemplateData};
pub use mock::{MockSensor, MockSensorHandle, SensorCall};
pub use session::{SensorSession, SessionState};
pub use traits::FingerprintSensor;
