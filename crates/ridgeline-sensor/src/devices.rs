//! Enum wrapper for sensor device dispatch.
//!
//! Native `async fn` trait methods (Edition 2024 RPITIT) are not
//! object-safe, so sensors are dispatched through this enum instead of
//! `Box<dyn FingerprintSensor>`. Real vendor runtime bindings plug in as
//! additional variants behind their own feature flags.

use crate::events::CaptureEvent;
use crate::mock::MockSensor;
use crate::traits::FingerprintSensor;
use ridgeline_core::{DeviceIdentity, Result};
use tokio::sync::mpsc;

/// Enum wrapper for fingerprint sensor dispatch.
///
/// # Examples
///
/// ```
/// use ridgeline_core::DeviceIdentity;
/// use ridgeline_sensor::{AnySensorDevice, FingerprintSensor, MockSensor};
///
/// #[tokio::main]
/// async fn main() -> ridgeline_core::Result<()> {
///     let (sensor, _handle) = MockSensor::new();
///     let mut any_sensor = AnySensorDevice::Mock(sensor);
///
///     any_sensor.open(DeviceIdentity::from_raw(0x1b55, 7)).await?;
///     assert_eq!(any_sensor.frame_dimensions(), (256, 288));
///     any_sensor.close().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySensorDevice {
    /// Mock sensor for development and testing.
    Mock(MockSensor),
}

impl FingerprintSensor for AnySensorDevice {
    async fn open(&mut self, identity: DeviceIdentity) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.open(identity).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.close().await,
        }
    }

    fn subscribe(&mut self) -> mpsc::Receiver<CaptureEvent> {
        match self {
            Self::Mock(sensor) => sensor.subscribe(),
        }
    }

    async fn start_capture(&mut self) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.start_capture().await,
        }
    }

    async fn stop_capture(&mut self) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.stop_capture().await,
        }
    }

    fn frame_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Mock(sensor) => sensor.frame_dimensions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_sensor_mock_dispatch() {
        let (sensor, handle) = MockSensor::new();
        let mut any_sensor = AnySensorDevice::Mock(sensor);

        any_sensor
            .open(DeviceIdentity::from_raw(0x1b55, 7))
            .await
            .unwrap();
        assert!(handle.is_open());
        any_sensor.close().await.unwrap();
        assert!(!handle.is_open());
    }
}
