//! Mock USB broker for testing and development.
//!
//! This module simulates the OS USB layer: a programmable set of attached
//! devices, a permission table, and an event stream the test drives by
//! hand. No hardware or OS support is required.

use crate::traits::{BrokerEvent, UsbBroker};
use ridgeline_core::{DeviceIdentity, Result, UsbDeviceInfo};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Shared state between the broker and its handle.
#[derive(Debug, Default)]
struct MockBus {
    /// Currently attached devices.
    devices: Vec<UsbDeviceInfo>,

    /// Identities with permission already granted.
    authorized: HashSet<DeviceIdentity>,

    /// Every prompt the broker was asked to post, in order.
    prompts: Vec<DeviceIdentity>,

    /// Active subscription, replaced on each `subscribe` call.
    sender: Option<mpsc::Sender<BrokerEvent>>,
}

/// Mock USB broker.
///
/// Created together with a [`MockUsbBrokerHandle`] that plugs devices in
/// and out, grants permission, and answers prompts.
///
/// # Examples
///
/// ```
/// use ridgeline_core::DeviceIdentity;
/// use ridgeline_usb::{MockUsbBroker, UsbBroker};
///
/// #[tokio::main]
/// async fn main() -> ridgeline_core::Result<()> {
///     let (broker, handle) = MockUsbBroker::new();
///
///     let identity = DeviceIdentity::from_raw(0x1b55, 7);
///     handle.attach_device(identity, Some("Fingerprint Reader")).await;
///
///     let devices = broker.list_devices().await?;
///     assert_eq!(devices.len(), 1);
///     assert!(!broker.has_permission(identity).await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockUsbBroker {
    bus: Arc<Mutex<MockBus>>,
}

impl MockUsbBroker {
    /// Create a mock broker and the handle that controls it.
    pub fn new() -> (Self, MockUsbBrokerHandle) {
        let bus = Arc::new(Mutex::new(MockBus::default()));
        (
            Self {
                bus: Arc::clone(&bus),
            },
            MockUsbBrokerHandle { bus },
        )
    }
}

impl UsbBroker for MockUsbBroker {
    async fn list_devices(&self) -> Result<Vec<UsbDeviceInfo>> {
        Ok(self.bus.lock().expect("mock bus poisoned").devices.clone())
    }

    async fn has_permission(&self, identity: DeviceIdentity) -> Result<bool> {
        Ok(self
            .bus
            .lock()
            .expect("mock bus poisoned")
            .authorized
            .contains(&identity))
    }

    async fn request_permission(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.bus
            .lock()
            .expect("mock bus poisoned")
            .prompts
            .push(identity);
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::Receiver<BrokerEvent> {
        let (tx, rx) = mpsc::channel(32);
        self.bus.lock().expect("mock bus poisoned").sender = Some(tx);
        rx
    }
}

/// Handle for controlling a mock USB broker.
///
/// # Examples
///
/// ```
/// use ridgeline_core::DeviceIdentity;
/// use ridgeline_usb::MockUsbBroker;
///
/// #[tokio::main]
/// async fn main() {
///     let (_broker, handle) = MockUsbBroker::new();
///
///     let identity = DeviceIdentity::from_raw(0x1b55, 7);
///     handle.attach_device(identity, None).await;
///     handle.preauthorize(identity).await;
///     assert_eq!(handle.device_count().await, 1);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockUsbBrokerHandle {
    bus: Arc<Mutex<MockBus>>,
}

impl MockUsbBrokerHandle {
    /// Plug a device in and broadcast the attach event.
    pub async fn attach_device(&self, identity: DeviceIdentity, product_name: Option<&str>) {
        let mut info = UsbDeviceInfo::new(identity);
        if let Some(name) = product_name {
            info = info.with_product_name(name);
        }

        let sender = {
            let mut bus = self.bus.lock().expect("mock bus poisoned");
            bus.devices.push(info.clone());
            bus.sender.clone()
        };
        if let Some(tx) = sender {
            let _ = tx.send(BrokerEvent::DeviceAttached(info)).await;
        }
    }

    /// Unplug a device and broadcast the detach event.
    ///
    /// Unknown identities broadcast a bare detach record, matching an OS
    /// that reports removals the app never enumerated.
    pub async fn detach_device(&self, identity: DeviceIdentity) {
        let (info, sender) = {
            let mut bus = self.bus.lock().expect("mock bus poisoned");
            let position = bus.devices.iter().position(|d| d.identity == identity);
            let info = match position {
                Some(index) => bus.devices.remove(index),
                None => UsbDeviceInfo::new(identity),
            };
            (info, bus.sender.clone())
        };
        if let Some(tx) = sender {
            let _ = tx.send(BrokerEvent::DeviceDetached(info)).await;
        }
    }

    /// Mark an identity as already granted, without any broadcast.
    ///
    /// Models a device the user approved in a previous run.
    pub async fn preauthorize(&self, identity: DeviceIdentity) {
        self.bus
            .lock()
            .expect("mock bus poisoned")
            .authorized
            .insert(identity);
    }

    /// Answer the outstanding prompt and broadcast the decision.
    ///
    /// A grant also authorizes the last prompted identity, so later
    /// `has_permission` queries agree with the decision. Calling this
    /// more than once simulates the stale duplicate broadcasts the OS
    /// can deliver.
    pub async fn decide(&self, granted: bool) {
        let sender = {
            let mut bus = self.bus.lock().expect("mock bus poisoned");
            if granted {
                if let Some(identity) = bus.prompts.last().copied() {
                    bus.authorized.insert(identity);
                }
            }
            bus.sender.clone()
        };
        if let Some(tx) = sender {
            let _ = tx.send(BrokerEvent::PermissionDecision { granted }).await;
        }
    }

    /// Number of prompts the broker was asked to post.
    pub async fn prompt_count(&self) -> usize {
        self.bus.lock().expect("mock bus poisoned").prompts.len()
    }

    /// Identity of the most recent prompt, if any.
    pub async fn last_prompt(&self) -> Option<DeviceIdentity> {
        self.bus
            .lock()
            .expect("mock bus poisoned")
            .prompts
            .last()
            .copied()
    }

    /// Number of currently attached devices.
    pub async fn device_count(&self) -> usize {
        self.bus.lock().expect("mock bus poisoned").devices.len()
    }
}
