use thiserror::Error;

use crate::types::DeviceIdentity;

#[derive(Error, Debug)]
pub enum Error {
    // Permission and device lifecycle errors
    #[error("Device not found: {identity}")]
    DeviceNotFound { identity: DeviceIdentity },

    #[error("Permission denied (code {code})")]
    PermissionDenied { code: i32 },

    #[error("Listeners already registered")]
    AlreadyRegistered,

    // Sensor errors
    #[error("Sensor open failed: {0}")]
    SensorOpenFailure(String),

    #[error("Capture failed (code {code})")]
    CaptureFailed { code: i32 },

    #[error("Extraction failed (code {code})")]
    ExtractFailed { code: i32 },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Transport errors
    #[error("USB error: {0}")]
    Usb(String),

    #[error("Event channel closed")]
    ChannelClosed,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a device-not-found error for the given identity.
    pub fn device_not_found(identity: DeviceIdentity) -> Self {
        Self::DeviceNotFound { identity }
    }

    /// Create a permission-denied error carrying the broker's result code.
    pub fn permission_denied(code: i32) -> Self {
        Self::PermissionDenied { code }
    }

    /// Create a sensor-open error.
    pub fn sensor_open(message: impl Into<String>) -> Self {
        Self::SensorOpenFailure(message.into())
    }

    /// Create an invalid-frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }

    /// Create an invalid-template error.
    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate(message.into())
    }

    /// Create a USB transport error.
    pub fn usb(message: impl Into<String>) -> Self {
        Self::Usb(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The numeric result code this error maps to, if it has one.
    ///
    /// Codes follow the broker's wire values: see
    /// [`crate::constants::RESULT_DEVICE_NOT_FOUND`] and friends.
    pub fn result_code(&self) -> Option<i32> {
        match self {
            Self::DeviceNotFound { .. } => Some(crate::constants::RESULT_DEVICE_NOT_FOUND),
            Self::PermissionDenied { code } => Some(*code),
            Self::CaptureFailed { code } | Self::ExtractFailed { code } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{RESULT_DEVICE_NOT_FOUND, RESULT_PERMISSION_DENIED};
    use crate::types::{DeviceIdentity, ProductId, VendorId};

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new(VendorId::new(0x1b55), ProductId::new(7))
    }

    #[test]
    fn test_device_not_found_display() {
        let error = Error::device_not_found(identity());
        assert_eq!(error.to_string(), "Device not found: 1b55:0007");
        assert_eq!(error.result_code(), Some(RESULT_DEVICE_NOT_FOUND));
    }

    #[test]
    fn test_permission_denied_code() {
        let error = Error::permission_denied(RESULT_PERMISSION_DENIED);
        assert_eq!(error.to_string(), "Permission denied (code -2)");
        assert_eq!(error.result_code(), Some(RESULT_PERMISSION_DENIED));
    }

    #[test]
    fn test_result_code_absent_for_ambient_errors() {
        assert_eq!(Error::usb("stall").result_code(), None);
        assert_eq!(Error::config("bad vendor id").result_code(), None);
        assert_eq!(Error::ChannelClosed.result_code(), None);
    }

    #[test]
    fn test_extract_failed_carries_vendor_code() {
        let error = Error::ExtractFailed { code: 13 };
        assert_eq!(error.to_string(), "Extraction failed (code 13)");
        assert_eq!(error.result_code(), Some(13));
    }
}
