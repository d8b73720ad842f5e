//! Shared constants for the Ridgeline scanner service.
//!
//! Result codes mirror the codes the permission broker reports to its
//! listener; display messages are the defaults the status panel falls back
//! to. Changing the numeric codes breaks compatibility with deployments
//! that script against the service's status output.

// ============================================================================
// Device Identification
// ============================================================================

/// Vendor id of the supported scanner product line.
///
/// The vendor id is fixed for the whole product line; the product id is
/// discovered at runtime by enumerating attached devices.
///
/// # Examples
///
/// ```
/// use ridgeline_core::constants::TARGET_VENDOR_ID;
/// use ridgeline_core::VendorId;
///
/// let vendor = VendorId::new(TARGET_VENDOR_ID);
/// assert_eq!(vendor.to_string(), "1b55");
/// ```
pub const TARGET_VENDOR_ID: u16 = 0x1b55;

// ============================================================================
// Permission Result Codes
// ============================================================================

/// Permission resolved in the caller's favor.
pub const RESULT_GRANTED: i32 = 0;

/// The requested identity is not currently enumerated.
///
/// Terminal for that request; the user must reconnect the device and
/// request again.
pub const RESULT_DEVICE_NOT_FOUND: i32 = -1;

/// The user or the system refused access.
///
/// Terminal for that request; a new request starts a fresh prompt.
pub const RESULT_PERMISSION_DENIED: i32 = -2;

// ============================================================================
// Sensor Timing
// ============================================================================

/// Default settle delay between opening the sensor and starting capture
/// (milliseconds).
///
/// The hardware needs a short pause after open before it accepts a capture
/// listener. The delay is awaited, never slept on a thread.
///
/// # Value: 200ms
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;

// ============================================================================
// Channel Sizing
// ============================================================================

/// Default capacity of the unified event channel.
///
/// Large enough that a burst of capture-error events (emitted continuously
/// while no finger is present) does not stall the delivery tasks.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

// ============================================================================
// Default Display Messages
// ============================================================================

/// Status line once the sensor is open and capturing.
pub const MSG_READY: &str = "Ready. Place your finger.";

/// Status line while capture retries without a finger present.
pub const MSG_WAITING_FINGER: &str = "Waiting for finger...";

/// Template slot placeholder before any extraction succeeded.
pub const MSG_WAITING_DATA: &str = "Waiting for data...";

/// Status line when no scanner of the target vendor is enumerated.
pub const MSG_NOT_DETECTED: &str = "Scanner not detected.";
