//! Scanner service event loop.
//!
//! One consumer task owns every UI-visible mutation. The USB manager and
//! the sensor session each deliver on their own channel from their own
//! tasks; two small adapters map both streams into [`ScannerEvent`] and
//! funnel them through the single unified channel this service drains.

use crate::config::ServiceConfig;
use crate::display::DisplayPanel;
use ridgeline_core::constants::{MSG_NOT_DETECTED, MSG_READY, MSG_WAITING_FINGER, RESULT_GRANTED};
use ridgeline_core::{DeviceIdentity, Error, Result};
use ridgeline_sensor::{AnySensorDevice, CaptureEvent, SensorSession};
use ridgeline_usb::{AnyUsbBroker, UsbEvent, UsbSessionManager};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Unified event consumed by the service loop.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ScannerEvent {
    /// USB lifecycle event.
    Usb(UsbEvent),

    /// Sensor capture event.
    Capture(CaptureEvent),
}

/// Coordinates USB access, the sensor session, and the display panel.
///
/// # Lifecycle
///
/// 1. Create from a broker, a sensor, and configuration
/// 2. `connect()` to discover the scanner and request access
/// 3. Drive `run()` (or `tick()` per event); granted access starts the
///    sensor, capture events land on the panel
/// 4. `shutdown()` on teardown
///
/// # Examples
///
/// ```no_run
/// use ridgeline_sensor::{AnySensorDevice, MockSensor};
/// use ridgeline_service::{ScannerService, ServiceConfig};
/// use ridgeline_usb::{AnyUsbBroker, MockUsbBroker};
///
/// #[tokio::main]
/// async fn main() -> ridgeline_core::Result<()> {
///     let (broker, _usb_handle) = MockUsbBroker::new();
///     let (sensor, _sensor_handle) = MockSensor::new();
///
///     let mut service = ScannerService::new(
///         AnyUsbBroker::Mock(broker),
///         AnySensorDevice::Mock(sensor),
///         &ServiceConfig::default(),
///     );
///
///     service.connect().await?;
///     service.run().await;
///     Ok(())
/// }
/// ```
pub struct ScannerService {
    /// USB permission and hot-plug coordination.
    usb: UsbSessionManager,

    /// Sensor handle lifecycle.
    session: SensorSession,

    /// User-visible state; touched only from the consumer loop.
    panel: DisplayPanel,

    /// Unified event stream.
    events: mpsc::Receiver<ScannerEvent>,

    /// Identity selected by the last `connect()`.
    current: Option<DeviceIdentity>,

    /// Pinned product id from configuration, if any.
    pinned_product: Option<ridgeline_core::ProductId>,

    /// Stream adapter tasks.
    adapters: Vec<JoinHandle<()>>,
}

impl ScannerService {
    /// Build the service and register the USB listeners.
    pub fn new(broker: AnyUsbBroker, sensor: AnySensorDevice, config: &ServiceConfig) -> Self {
        let capacity = config.service.event_capacity;
        let (unified_tx, unified_rx) = mpsc::channel(capacity);

        let (usb_tx, usb_rx) = mpsc::channel(capacity);
        let mut usb = UsbSessionManager::with_vendor(broker, config.scanner.vendor(), usb_tx);
        usb.register_listeners();

        let (capture_tx, capture_rx) = mpsc::channel(capacity);
        let session = SensorSession::new(sensor, capture_tx)
            .with_settle_delay(Duration::from_millis(config.scanner.settle_delay_ms));

        let adapters = vec![
            tokio::spawn(Self::adapt(usb_rx, unified_tx.clone(), ScannerEvent::Usb)),
            tokio::spawn(Self::adapt(capture_rx, unified_tx, ScannerEvent::Capture)),
        ];

        Self {
            usb,
            session,
            panel: DisplayPanel::new(),
            events: unified_rx,
            current: None,
            pinned_product: config.scanner.product(),
            adapters,
        }
    }

    /// The display panel.
    pub fn panel(&self) -> &DisplayPanel {
        &self.panel
    }

    /// Identity selected by the last `connect()`, if any.
    pub fn current_device(&self) -> Option<DeviceIdentity> {
        self.current
    }

    /// Lifecycle state of the sensor session.
    pub fn session_state(&self) -> ridgeline_sensor::SessionState {
        self.session.state()
    }

    /// Discover the scanner and request access to it.
    ///
    /// Enumerates by the configured vendor id; the product id comes from
    /// configuration when pinned, otherwise from the attached device.
    /// With no scanner attached the panel reports it and nothing else
    /// happens — in particular, no permission prompt is issued.
    ///
    /// The access resolution arrives on the event stream; a grant starts
    /// the sensor from the consumer loop.
    ///
    /// # Errors
    ///
    /// Returns an error if enumeration fails. A missing device is not an
    /// error here: it is reported on the panel, the way every other
    /// outcome of the request is.
    pub async fn connect(&mut self) -> Result<()> {
        let Some(info) = self.usb.find_by_vendor().await? else {
            self.panel.set_status(MSG_NOT_DETECTED);
            self.panel.raise_notice("Please connect the scanner");
            return Ok(());
        };

        let identity = match self.pinned_product {
            Some(product) => DeviceIdentity::new(info.identity.vendor, product),
            None => info.identity,
        };
        self.current = Some(identity);
        self.panel.set_status("Requesting USB permission...");
        info!(device = %identity, "requesting scanner access");

        match self.usb.request_access(identity).await {
            // Resolutions, including the device-vanished race, arrive on
            // the event stream and are handled by the consumer loop.
            Ok(_) | Err(Error::DeviceNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Receive and handle one event.
    ///
    /// Returns `false` once the event stream is closed.
    pub async fn tick(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Drive the event loop until the stream closes.
    pub async fn run(&mut self) {
        while self.tick().await {}
        debug!("event stream closed; service loop exiting");
    }

    /// Stop the sensor and release the USB subscription.
    pub async fn shutdown(&mut self) {
        self.session.stop().await;
        self.usb.unregister_listeners();
        for adapter in self.adapters.drain(..) {
            adapter.abort();
        }
    }

    async fn handle_event(&mut self, event: ScannerEvent) {
        match event {
            ScannerEvent::Usb(UsbEvent::PermissionResolved { code }) => {
                if code == RESULT_GRANTED {
                    self.start_sensor().await;
                } else {
                    self.panel.set_status(format!("Permission denied ({code})"));
                }
            }
            ScannerEvent::Usb(UsbEvent::DeviceArrived(info)) => {
                debug!(device = %info.identity, "scanner attached");
                self.panel.set_status("Device connected.");
                self.panel.raise_notice("Scanner attached");
            }
            ScannerEvent::Usb(UsbEvent::DeviceRemoved(info)) => {
                info!(device = %info.identity, "scanner removed; forcing session closed");
                self.session.stop().await;
                self.current = None;
                self.panel.set_status("Device removed.");
                self.panel.clear_capture();
            }
            ScannerEvent::Capture(CaptureEvent::ImageReady(frame)) => {
                self.panel.show_frame(frame);
                self.panel.set_status("Image captured successfully.");
            }
            ScannerEvent::Capture(CaptureEvent::TemplateReady(template)) => {
                self.panel.show_template(template);
                self.panel.set_status("Template extracted.");
                self.panel.raise_notice("Data extracted");
            }
            ScannerEvent::Capture(CaptureEvent::CaptureError { .. }) => {
                // Emitted continuously while no finger is present; a
                // notice here would spam the user, so only the status
                // line moves.
                self.panel.set_status(MSG_WAITING_FINGER);
            }
            ScannerEvent::Capture(CaptureEvent::ExtractError { code }) => {
                self.panel
                    .set_status(format!("Extraction failed (code {code})"));
            }
            // `UsbEvent`/`CaptureEvent` are `#[non_exhaustive]`, so a
            // wildcard is required even though every current variant is
            // handled above.
            ScannerEvent::Usb(_) | ScannerEvent::Capture(_) => {}
        }
    }

    async fn start_sensor(&mut self) {
        let Some(identity) = self.current else {
            warn!("access granted but no device is selected");
            return;
        };
        match self.session.start(identity).await {
            Ok(()) => self.panel.set_status(MSG_READY),
            Err(e) => {
                warn!("sensor start failed: {e}");
                self.panel.set_status(format!("Init error: {e}"));
            }
        }
    }

    /// Adapter task body: maps one delivery stream into the unified
    /// channel.
    async fn adapt<T: Send + 'static>(
        mut source: mpsc::Receiver<T>,
        sink: mpsc::Sender<ScannerEvent>,
        map: fn(T) -> ScannerEvent,
    ) {
        while let Some(event) = source.recv().await {
            if sink.send(map(event)).await.is_err() {
                break;
            }
        }
    }
}

impl Drop for ScannerService {
    fn drop(&mut self) {
        for adapter in self.adapters.drain(..) {
            adapter.abort();
        }
    }
}
