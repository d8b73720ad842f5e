//! USB broker trait definition.
//!
//! The broker is the seam between the session manager and whatever the
//! host OS offers for USB access: device enumeration, a permission query,
//! an asynchronous permission prompt, and a broadcast stream for decisions
//! and hot-plug events. Implementations use native `async fn` methods
//! (Edition 2024 RPITIT), so dynamic dispatch goes through the
//! [`AnyUsbBroker`](crate::devices::AnyUsbBroker) enum wrapper instead of
//! trait objects.

#![allow(async_fn_in_trait)]

use ridgeline_core::{DeviceIdentity, Result, UsbDeviceInfo};
use tokio::sync::mpsc;

/// Raw event emitted by the OS USB layer.
///
/// These arrive on the broker's subscription stream in OS-determined
/// order. The broker performs no filtering; vendor filtering and
/// permission bookkeeping happen in the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BrokerEvent {
    /// The user (or system policy) answered a permission prompt.
    ///
    /// The decision does not identify which request it answers; brokers
    /// deliver at most one outstanding prompt, but a stale duplicate
    /// broadcast is possible and must be tolerated downstream.
    PermissionDecision {
        /// Whether access was granted.
        granted: bool,
    },

    /// A device was plugged in.
    DeviceAttached(UsbDeviceInfo),

    /// A device was unplugged.
    DeviceDetached(UsbDeviceInfo),
}

/// OS USB service abstraction.
///
/// # Examples
///
/// ```no_run
/// use ridgeline_core::{DeviceIdentity, Result};
/// use ridgeline_usb::traits::UsbBroker;
///
/// async fn discover<B: UsbBroker>(broker: &B, vendor: u16) -> Result<Option<DeviceIdentity>> {
///     let devices = broker.list_devices().await?;
///     Ok(devices
///         .into_iter()
///         .map(|d| d.identity)
///         .find(|id| id.vendor.as_u16() == vendor))
/// }
/// ```
pub trait UsbBroker: Send + Sync {
    /// Enumerate the currently attached devices.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS USB layer cannot be queried.
    async fn list_devices(&self) -> Result<Vec<UsbDeviceInfo>>;

    /// Check whether access to the device is already granted.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS USB layer cannot be queried.
    async fn has_permission(&self, identity: DeviceIdentity) -> Result<bool>;

    /// Issue the asynchronous permission prompt for the device.
    ///
    /// Returns as soon as the prompt is posted; the decision arrives later
    /// as a [`BrokerEvent::PermissionDecision`] on the subscription
    /// stream. Nothing times the prompt out: if the user dismisses the
    /// dialog without deciding, no decision is ever delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be posted.
    async fn request_permission(&mut self, identity: DeviceIdentity) -> Result<()>;

    /// Open a subscription to the broker's event stream.
    ///
    /// A new subscription replaces any previous one; the old receiver
    /// stops yielding events. The stream carries permission decisions and
    /// hot-plug notifications for all vendors.
    fn subscribe(&mut self) -> mpsc::Receiver<BrokerEvent>;
}
