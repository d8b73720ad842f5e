use crate::{Result, constants::RESULT_GRANTED, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// USB vendor identifier.
///
/// Formats as four lowercase hex digits, the convention used by `lsusb`
/// and by the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(u16);

impl VendorId {
    /// Create a vendor id from its raw value.
    #[must_use]
    pub fn new(id: u16) -> Self {
        VendorId(id)
    }

    /// Get the raw vendor id as u16.
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl std::str::FromStr for VendorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_usb_id(s).map(VendorId)
    }
}

/// USB product identifier.
///
/// The product id of the scanner is not fixed across the product line; it
/// is discovered at runtime by enumerating attached devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u16);

impl ProductId {
    /// Create a product id from its raw value.
    #[must_use]
    pub fn new(id: u16) -> Self {
        ProductId(id)
    }

    /// Get the raw product id as u16.
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl std::str::FromStr for ProductId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_usb_id(s).map(ProductId)
    }
}

/// Parse a USB id from hex, with or without a `0x` prefix.
fn parse_usb_id(s: &str) -> Result<u16> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16)
        .map_err(|_| Error::config(format!("Invalid USB id: {s}")))
}

/// Identity of one attached USB device.
///
/// A session is only valid while both ids match a currently attached
/// device; a detach invalidates every identity that pointed at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor: VendorId,
    pub product: ProductId,
}

impl DeviceIdentity {
    /// Create a device identity from its two ids.
    #[must_use]
    pub fn new(vendor: VendorId, product: ProductId) -> Self {
        Self { vendor, product }
    }

    /// Create a device identity from raw u16 values.
    #[must_use]
    pub fn from_raw(vendor: u16, product: u16) -> Self {
        Self::new(VendorId::new(vendor), ProductId::new(product))
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.vendor, self.product)
    }
}

/// Enumeration record for one attached device, as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDeviceInfo {
    /// Vendor and product ids of the device.
    pub identity: DeviceIdentity,

    /// Product string from the device descriptor, when readable.
    pub product_name: Option<String>,
}

impl UsbDeviceInfo {
    /// Create an enumeration record with no product string.
    #[must_use]
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            product_name: None,
        }
    }

    /// Set the product string.
    #[must_use]
    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }
}

/// Outcome of a USB permission request as seen by the session manager.
///
/// Transitions happen only through broker callbacks; nothing times out a
/// pending request, so `Pending` can persist if the user dismisses the
/// system dialog without deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// No request has been issued for the current identity.
    Unrequested,

    /// A prompt is in flight; resolution arrives on the event stream.
    Pending,

    /// Access granted; sensor startup may proceed.
    Granted,

    /// Access refused, carrying the broker's result code.
    Denied(i32),
}

impl PermissionState {
    /// The numeric result code this state reports, if resolved.
    ///
    /// `Granted` maps to [`RESULT_GRANTED`]; `Denied` carries its own code.
    /// Unresolved states have no code.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Granted => Some(RESULT_GRANTED),
            Self::Denied(code) => Some(*code),
            Self::Unrequested | Self::Pending => None,
        }
    }

    /// Returns `true` once access has been granted.
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Returns `true` while a prompt is unresolved.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` once the request has resolved either way.
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Granted | Self::Denied(_))
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unrequested => write!(f, "Unrequested"),
            Self::Pending => write!(f, "Pending"),
            Self::Granted => write!(f, "Granted"),
            Self::Denied(code) => write!(f, "Denied({code})"),
        }
    }
}
