//! Fingerprint sensor trait definition.
//!
//! The trait is the seam between the session controller and the vendor
//! sensor runtime. Everything behind it is proprietary: the wire protocol,
//! the capture pipeline, and the template format. Implementations use
//! native `async fn` methods (Edition 2024 RPITIT); dynamic dispatch goes
//! through [`AnySensorDevice`](crate::devices::AnySensorDevice).

#![allow(async_fn_in_trait)]

use crate::events::CaptureEvent;
use ridgeline_core::{DeviceIdentity, Result};
use tokio::sync::mpsc;

/// Vendor sensor runtime abstraction.
///
/// Call order for a session: `open`, then (after the hardware settle
/// delay) `subscribe` and `start_capture`. Teardown is `stop_capture`
/// then `close`. The controller enforces this order; implementations may
/// assume it.
///
/// # Examples
///
/// ```no_run
/// use ridgeline_core::{DeviceIdentity, Result};
/// use ridgeline_sensor::FingerprintSensor;
///
/// async fn probe<S: FingerprintSensor>(sensor: &mut S) -> Result<(u32, u32)> {
///     sensor.open(DeviceIdentity::from_raw(0x1b55, 7)).await?;
///     let dimensions = sensor.frame_dimensions();
///     sensor.close().await?;
///     Ok(dimensions)
/// }
/// ```
pub trait FingerprintSensor: Send + Sync {
    /// Open the hardware handle for the given device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened (absent, busy, or
    /// a driver fault).
    async fn open(&mut self, identity: DeviceIdentity) -> Result<()>;

    /// Close the hardware handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime reports a close failure. Callers
    /// on teardown paths log and discard it.
    async fn close(&mut self) -> Result<()>;

    /// Register the capture-event sink.
    ///
    /// A new subscription replaces any previous one. Events flow only
    /// while capture is running.
    fn subscribe(&mut self) -> mpsc::Receiver<CaptureEvent>;

    /// Begin continuous capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejects the capture start.
    async fn start_capture(&mut self) -> Result<()>;

    /// Stop continuous capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime reports a stop failure.
    async fn stop_capture(&mut self) -> Result<()>;

    /// Frame dimensions reported by the sensor, as `(width, height)`.
    fn frame_dimensions(&self) -> (u32, u32);
}
