//! Enum wrapper for USB broker dispatch.
//!
//! Native `async fn` trait methods (Edition 2024 RPITIT) are not
//! object-safe, so brokers are dispatched through this enum instead of
//! `Box<dyn UsbBroker>`. Dispatch is resolved at compile time; adding a
//! platform backend means adding a variant behind its feature flag.

use crate::mock::MockUsbBroker;
use crate::traits::{BrokerEvent, UsbBroker};
use ridgeline_core::{DeviceIdentity, Result, UsbDeviceInfo};
use tokio::sync::mpsc;

/// Enum wrapper for USB broker dispatch.
///
/// # Examples
///
/// ```
/// use ridgeline_usb::{AnyUsbBroker, MockUsbBroker, UsbBroker};
///
/// #[tokio::main]
/// async fn main() -> ridgeline_core::Result<()> {
///     let (broker, _handle) = MockUsbBroker::new();
///     let any_broker = AnyUsbBroker::Mock(broker);
///
///     let devices = any_broker.list_devices().await?;
///     assert!(devices.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyUsbBroker {
    /// Mock broker for development and testing.
    Mock(MockUsbBroker),

    /// libusb-backed broker for hosts with real devices.
    #[cfg(feature = "hardware-rusb")]
    Native(crate::native::RusbBroker),
}

impl UsbBroker for AnyUsbBroker {
    async fn list_devices(&self) -> Result<Vec<UsbDeviceInfo>> {
        match self {
            Self::Mock(broker) => broker.list_devices().await,
            #[cfg(feature = "hardware-rusb")]
            Self::Native(broker) => broker.list_devices().await,
        }
    }

    async fn has_permission(&self, identity: DeviceIdentity) -> Result<bool> {
        match self {
            Self::Mock(broker) => broker.has_permission(identity).await,
            #[cfg(feature = "hardware-rusb")]
            Self::Native(broker) => broker.has_permission(identity).await,
        }
    }

    async fn request_permission(&mut self, identity: DeviceIdentity) -> Result<()> {
        match self {
            Self::Mock(broker) => broker.request_permission(identity).await,
            #[cfg(feature = "hardware-rusb")]
            Self::Native(broker) => broker.request_permission(identity).await,
        }
    }

    fn subscribe(&mut self) -> mpsc::Receiver<BrokerEvent> {
        match self {
            Self::Mock(broker) => broker.subscribe(),
            #[cfg(feature = "hardware-rusb")]
            Self::Native(broker) => broker.subscribe(),
        }
    }
}
