//! USB session manager.
//!
//! The manager mediates OS-level USB permission requests and device
//! lifecycle notifications for a single target vendor. It owns two pieces
//! of state nothing else may touch: the broker subscription (held for the
//! registered lifetime) and the in-flight permission request.
//!
//! ```text
//! ┌────────────┐ subscribe ┌─────────────────┐
//! │ UsbBroker  │──────────►│ forwarding task │──────► UsbEvent channel
//! └────────────┘           │ (vendor filter, │        (single consumer)
//!       ▲                  │  pending guard) │
//!       │ request_access   └─────────────────┘
//! ┌─────┴──────────┐
//! │ UsbSessionMgr  │
//! └────────────────┘
//! ```
//!
//! Permission decisions race: the OS may deliver a stale duplicate grant
//! broadcast. The pending request sits behind a mutex and is consumed by
//! the first decision; later decisions for the same request find the slot
//! empty and are dropped, so `Granted` is observed exactly once
//! downstream.

use crate::devices::AnyUsbBroker;
use crate::traits::{BrokerEvent, UsbBroker};
use ridgeline_core::constants::{RESULT_DEVICE_NOT_FOUND, RESULT_PERMISSION_DENIED};
use ridgeline_core::{DeviceIdentity, Error, PermissionState, Result, UsbDeviceInfo, VendorId};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Lifecycle event forwarded to the service layer.
///
/// Everything the manager observes funnels into this enum so that one
/// consumer task can apply all UI-visible effects.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsbEvent {
    /// A permission request resolved, carrying the broker result code
    /// (0 granted, -1 device not found, -2 denied).
    PermissionResolved {
        /// Numeric result code.
        code: i32,
    },

    /// A device of the target vendor was plugged in.
    DeviceArrived(UsbDeviceInfo),

    /// A device of the target vendor was unplugged.
    DeviceRemoved(UsbDeviceInfo),
}

/// Permission bookkeeping shared with the forwarding task.
///
/// The mutex around this slot is the only lock in the crate: it prevents
/// two simultaneous decision deliveries from both resolving the same
/// request.
#[derive(Debug)]
struct PermissionSlot {
    /// Last observed permission state.
    state: PermissionState,

    /// Identity of the request awaiting a decision, if any.
    in_flight: Option<DeviceIdentity>,
}

/// Coordinates USB permission requests and hot-plug notifications for one
/// target vendor.
///
/// # Lifecycle
///
/// 1. Create with a broker and the outgoing event channel
/// 2. `register_listeners()` to start forwarding broker events
/// 3. `request_access()` per device; resolutions arrive on the channel
/// 4. `unregister_listeners()` on teardown (also runs on drop)
///
/// # Examples
///
/// ```no_run
/// use ridgeline_core::DeviceIdentity;
/// use ridgeline_usb::{AnyUsbBroker, MockUsbBroker, UsbSessionManager};
/// use tokio::sync::mpsc;
///
/// # async fn example() -> ridgeline_core::Result<()> {
/// let (broker, _handle) = MockUsbBroker::new();
/// let (tx, mut rx) = mpsc::channel(16);
///
/// let mut manager = UsbSessionManager::new(AnyUsbBroker::Mock(broker), tx);
/// assert!(manager.register_listeners());
/// assert!(!manager.register_listeners()); // second call is a no-op
///
/// let result = manager
///     .request_access(DeviceIdentity::from_raw(0x1b55, 7))
///     .await;
/// assert!(result.is_err()); // nothing attached
/// # Ok(())
/// # }
/// ```
pub struct UsbSessionManager {
    /// OS USB service.
    broker: AnyUsbBroker,

    /// Vendor whose attach/detach broadcasts are forwarded.
    vendor: VendorId,

    /// Outgoing event channel to the service layer.
    output: mpsc::Sender<UsbEvent>,

    /// Permission state plus the in-flight request, shared with the
    /// forwarding task.
    slot: Arc<Mutex<PermissionSlot>>,

    /// Forwarding task for the registered subscription.
    listener: Option<JoinHandle<()>>,
}

impl UsbSessionManager {
    /// Create a manager targeting the default scanner vendor.
    pub fn new(broker: AnyUsbBroker, output: mpsc::Sender<UsbEvent>) -> Self {
        Self::with_vendor(
            broker,
            VendorId::new(ridgeline_core::constants::TARGET_VENDOR_ID),
            output,
        )
    }

    /// Create a manager targeting a specific vendor.
    pub fn with_vendor(
        broker: AnyUsbBroker,
        vendor: VendorId,
        output: mpsc::Sender<UsbEvent>,
    ) -> Self {
        Self {
            broker,
            vendor,
            output,
            slot: Arc::new(Mutex::new(PermissionSlot {
                state: PermissionState::Unrequested,
                in_flight: None,
            })),
            listener: None,
        }
    }

    /// The vendor this manager filters broadcasts for.
    pub fn vendor(&self) -> VendorId {
        self.vendor
    }

    /// Last observed permission state.
    pub async fn permission_state(&self) -> PermissionState {
        self.slot.lock().await.state
    }

    /// Subscribe to the broker and start forwarding its events.
    ///
    /// Returns `true` when the subscription was newly acquired, `false`
    /// when listeners were already registered (the call is then a no-op).
    /// Every successful registration must be paired with
    /// [`unregister_listeners`](Self::unregister_listeners) on teardown;
    /// dropping the manager also releases the subscription.
    pub fn register_listeners(&mut self) -> bool {
        if self.listener.is_some() {
            return false;
        }

        let events = self.broker.subscribe();
        let task = tokio::spawn(Self::forward_events(
            events,
            self.output.clone(),
            Arc::clone(&self.slot),
            self.vendor,
        ));
        self.listener = Some(task);
        debug!(vendor = %self.vendor, "USB listeners registered");
        true
    }

    /// Release the broker subscription.
    ///
    /// Safe to call when not registered (no-op). Runs on shutdown paths,
    /// so nothing here can fail the caller: the forwarding task is simply
    /// aborted and the outcome logged.
    pub fn unregister_listeners(&mut self) {
        match self.listener.take() {
            Some(task) => {
                task.abort();
                debug!(vendor = %self.vendor, "USB listeners unregistered");
            }
            None => trace!("unregister_listeners: not registered"),
        }
    }

    /// Find an attached device of the given vendor, if any.
    ///
    /// The product id of the scanner line varies per model, so callers
    /// discover it here before requesting access.
    ///
    /// # Errors
    ///
    /// Returns an error if enumeration fails.
    pub async fn find_by_vendor(&self) -> Result<Option<UsbDeviceInfo>> {
        let devices = self.broker.list_devices().await?;
        Ok(devices
            .into_iter()
            .find(|d| d.identity.vendor == self.vendor))
    }

    /// Request access to the device with the given identity.
    ///
    /// Looks up the currently attached device matching both ids:
    ///
    /// - absent: emits result code -1 downstream, performs no further
    ///   action (in particular, no prompt), and returns
    ///   [`Error::DeviceNotFound`];
    /// - present with permission already granted: emits result code 0
    ///   synchronously and returns [`PermissionState::Granted`];
    /// - present without permission: posts the asynchronous prompt and
    ///   returns [`PermissionState::Pending`]; the resolution arrives
    ///   later as a [`UsbEvent::PermissionResolved`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an absent identity, or a
    /// transport error if the broker cannot be queried.
    pub async fn request_access(&mut self, identity: DeviceIdentity) -> Result<PermissionState> {
        let attached = self
            .broker
            .list_devices()
            .await?
            .into_iter()
            .any(|d| d.identity == identity);

        if !attached {
            self.emit(UsbEvent::PermissionResolved {
                code: RESULT_DEVICE_NOT_FOUND,
            })
            .await;
            return Err(Error::device_not_found(identity));
        }

        if self.broker.has_permission(identity).await? {
            {
                let mut slot = self.slot.lock().await;
                slot.state = PermissionState::Granted;
                slot.in_flight = None;
            }
            self.emit(UsbEvent::PermissionResolved {
                code: PermissionState::Granted.code().unwrap_or_default(),
            })
            .await;
            return Ok(PermissionState::Granted);
        }

        {
            let mut slot = self.slot.lock().await;
            slot.state = PermissionState::Pending;
            slot.in_flight = Some(identity);
        }
        self.broker.request_permission(identity).await?;
        debug!(device = %identity, "permission prompt posted");
        Ok(PermissionState::Pending)
    }

    async fn emit(&self, event: UsbEvent) {
        if self.output.send(event).await.is_err() {
            warn!("USB event dropped: consumer channel closed");
        }
    }

    /// Forwarding task body: vendor-filters hot-plug broadcasts and
    /// resolves permission decisions under the pending guard.
    async fn forward_events(
        mut events: mpsc::Receiver<BrokerEvent>,
        output: mpsc::Sender<UsbEvent>,
        slot: Arc<Mutex<PermissionSlot>>,
        vendor: VendorId,
    ) {
        while let Some(event) = events.recv().await {
            let forwarded = match event {
                BrokerEvent::PermissionDecision { granted } => {
                    let mut guard = slot.lock().await;
                    match guard.in_flight.take() {
                        // The decided device is not re-checked against the
                        // requested identity; the broker delivers at most
                        // one outstanding prompt.
                        Some(_requested) => {
                            let state = if granted {
                                PermissionState::Granted
                            } else {
                                PermissionState::Denied(RESULT_PERMISSION_DENIED)
                            };
                            guard.state = state;
                            state
                                .code()
                                .map(|code| UsbEvent::PermissionResolved { code })
                        }
                        None => {
                            trace!(granted, "dropping permission decision with no request in flight");
                            None
                        }
                    }
                }
                BrokerEvent::DeviceAttached(info) if info.identity.vendor == vendor => {
                    Some(UsbEvent::DeviceArrived(info))
                }
                BrokerEvent::DeviceDetached(info) if info.identity.vendor == vendor => {
                    Some(UsbEvent::DeviceRemoved(info))
                }
                BrokerEvent::DeviceAttached(info) | BrokerEvent::DeviceDetached(info) => {
                    trace!(device = %info.identity, "ignoring broadcast for foreign vendor");
                    None
                }
            };

            if let Some(event) = forwarded {
                if output.send(event).await.is_err() {
                    // Consumer gone; keep draining so the broker side
                    // never observes backpressure from a dead listener.
                    warn!("USB event dropped: consumer channel closed");
                }
            }
        }
        debug!("broker event stream closed; forwarding task exiting");
    }
}

impl Drop for UsbSessionManager {
    fn drop(&mut self) {
        self.unregister_listeners();
    }
}
