//! libusb-backed USB broker.
//!
//! Available behind the `hardware-rusb` feature. Enumeration and hot-plug
//! notifications come straight from libusb; the permission model is the
//! host's device-node access control, so "has permission" is answered by
//! probing whether the device opens, and a permission request resolves
//! immediately with the probe outcome. There is no interactive prompt on
//! these hosts.

use crate::traits::{BrokerEvent, UsbBroker};
use ridgeline_core::{DeviceIdentity, Error, Result, UsbDeviceInfo};
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Poll interval for the libusb event pump thread.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// USB broker backed by libusb.
///
/// # Examples
///
/// ```no_run
/// use ridgeline_usb::{RusbBroker, UsbBroker};
///
/// #[tokio::main]
/// async fn main() -> ridgeline_core::Result<()> {
///     let broker = RusbBroker::new()?;
///     for device in broker.list_devices().await? {
///         println!("{}", device.identity);
///     }
///     Ok(())
/// }
/// ```
pub struct RusbBroker {
    /// libusb context shared with the event pump thread.
    context: Context,

    /// Active subscription, shared with the hot-plug callback.
    sender: Arc<Mutex<Option<mpsc::Sender<BrokerEvent>>>>,

    /// Hot-plug registration; dropping it unregisters the callback.
    hotplug: Option<Registration<Context>>,

    /// libusb event pump thread.
    pump: Option<std::thread::JoinHandle<()>>,

    /// Shutdown flag for the pump thread.
    shutdown: Arc<AtomicBool>,
}

impl RusbBroker {
    /// Create a broker on a fresh libusb context.
    ///
    /// # Errors
    ///
    /// Returns an error if libusb cannot be initialized.
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| Error::usb(e.to_string()))?;
        Ok(Self {
            context,
            sender: Arc::new(Mutex::new(None)),
            hotplug: None,
            pump: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    fn find_device(&self, identity: DeviceIdentity) -> Result<Option<Device<Context>>> {
        let devices = self
            .context
            .devices()
            .map_err(|e| Error::usb(e.to_string()))?;

        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if descriptor.vendor_id() == identity.vendor.as_u16()
                && descriptor.product_id() == identity.product.as_u16()
            {
                return Ok(Some(device));
            }
        }
        Ok(None)
    }

    /// Register the hot-plug callback and start the event pump, once.
    fn ensure_event_sources(&mut self) {
        if self.hotplug.is_none() {
            if rusb::has_hotplug() {
                let callback = HotplugForwarder {
                    sender: Arc::clone(&self.sender),
                };
                match HotplugBuilder::new()
                    .enumerate(false)
                    .register(&self.context, Box::new(callback))
                {
                    Ok(registration) => {
                        self.hotplug = Some(registration);
                        debug!("hot-plug callback registered");
                    }
                    Err(e) => warn!("hot-plug registration failed: {e}"),
                }
            } else {
                warn!("libusb has no hot-plug support on this host");
            }
        }

        if self.pump.is_none() {
            let context = self.context.clone();
            let shutdown = Arc::clone(&self.shutdown);
            self.pump = Some(std::thread::spawn(move || {
                while !shutdown.load(Ordering::Relaxed) {
                    if let Err(e) = context.handle_events(Some(EVENT_POLL_INTERVAL)) {
                        warn!("libusb event pump stopped: {e}");
                        break;
                    }
                }
            }));
        }
    }

    async fn send_event(&self, event: BrokerEvent) {
        let sender = self
            .sender
            .lock()
            .expect("subscription slot poisoned")
            .clone();
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}

impl UsbBroker for RusbBroker {
    async fn list_devices(&self) -> Result<Vec<UsbDeviceInfo>> {
        let devices = self
            .context
            .devices()
            .map_err(|e| Error::usb(e.to_string()))?;

        let mut listed = Vec::new();
        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            let identity =
                DeviceIdentity::from_raw(descriptor.vendor_id(), descriptor.product_id());
            let mut info = UsbDeviceInfo::new(identity);
            // Product strings need an open handle; unreadable ones are
            // left empty rather than failing the enumeration.
            if let Ok(handle) = device.open() {
                if let Ok(name) = handle.read_product_string_ascii(&descriptor) {
                    info = info.with_product_name(name);
                }
            }
            listed.push(info);
        }
        Ok(listed)
    }

    async fn has_permission(&self, identity: DeviceIdentity) -> Result<bool> {
        let Some(device) = self.find_device(identity)? else {
            return Ok(false);
        };
        match device.open() {
            Ok(_) => Ok(true),
            Err(rusb::Error::Access) => Ok(false),
            Err(e) => Err(Error::usb(e.to_string())),
        }
    }

    async fn request_permission(&mut self, identity: DeviceIdentity) -> Result<()> {
        // No interactive prompt exists here; the probe outcome is
        // delivered as the decision broadcast, keeping the asynchronous
        // resolution contract.
        let granted = match self.find_device(identity)? {
            Some(device) => device.open().is_ok(),
            None => false,
        };
        debug!(device = %identity, granted, "access probe resolved");
        self.send_event(BrokerEvent::PermissionDecision { granted })
            .await;
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::Receiver<BrokerEvent> {
        let (tx, rx) = mpsc::channel(32);
        *self
            .sender
            .lock()
            .expect("subscription slot poisoned") = Some(tx);
        self.ensure_event_sources();
        rx
    }
}

impl std::fmt::Debug for RusbBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusbBroker")
            .field("hotplug", &self.hotplug.is_some())
            .field("pump", &self.pump.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for RusbBroker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Drop the registration first so the pump thread stops receiving
        // callbacks before it is joined.
        self.hotplug = None;
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

/// Hot-plug callback forwarding libusb notifications onto the
/// subscription stream.
struct HotplugForwarder {
    sender: Arc<Mutex<Option<mpsc::Sender<BrokerEvent>>>>,
}

impl HotplugForwarder {
    fn forward(&self, event: BrokerEvent) {
        let sender = self
            .sender
            .lock()
            .expect("subscription slot poisoned")
            .clone();
        if let Some(tx) = sender {
            // Runs on the libusb event thread, outside the runtime.
            let _ = tx.blocking_send(event);
        }
    }
}

impl<T: UsbContext> Hotplug<T> for HotplugForwarder {
    fn device_arrived(&mut self, device: Device<T>) {
        if let Ok(descriptor) = device.device_descriptor() {
            let identity =
                DeviceIdentity::from_raw(descriptor.vendor_id(), descriptor.product_id());
            self.forward(BrokerEvent::DeviceAttached(UsbDeviceInfo::new(identity)));
        }
    }

    fn device_left(&mut self, device: Device<T>) {
        if let Ok(descriptor) = device.device_descriptor() {
            let identity =
                DeviceIdentity::from_raw(descriptor.vendor_id(), descriptor.product_id());
            self.forward(BrokerEvent::DeviceDetached(UsbDeviceInfo::new(identity)));
        }
    }
}
