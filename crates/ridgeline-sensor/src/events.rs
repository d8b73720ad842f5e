//! Capture event payloads delivered by the sensor runtime.

use bytes::Bytes;
use ridgeline_core::{Error, Result};

/// One captured grayscale frame.
///
/// Frames are raw 8-bit grayscale: one byte per pixel, row-major.
/// Rendering to a displayable bitmap is a collaborator concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    /// Raw pixel bytes, `width * height` long.
    pub bytes: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// When the frame was captured.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl FrameData {
    /// Create a frame with the current timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero or the byte length
    /// does not match `width * height`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ridgeline_sensor::FrameData;
    ///
    /// let frame = FrameData::new(vec![0u8; 12], 4, 3).unwrap();
    /// assert_eq!(frame.width, 4);
    ///
    /// assert!(FrameData::new(vec![0u8; 11], 4, 3).is_err());
    /// ```
    pub fn new(bytes: impl Into<Bytes>, width: u32, height: u32) -> Result<Self> {
        let bytes = bytes.into();
        if width == 0 || height == 0 {
            return Err(Error::invalid_frame(format!(
                "Frame dimensions must be nonzero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize;
        if bytes.len() != expected {
            return Err(Error::invalid_frame(format!(
                "Frame of {width}x{height} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes,
            width,
            height,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Frame size in pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.bytes.len()
    }
}

/// An extracted biometric template.
///
/// The byte layout is vendor-specific and opaque to this crate; templates
/// from different scanner vendors are not interchangeable. Encoding for
/// display is a collaborator concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData {
    /// Opaque template bytes.
    pub bytes: Bytes,

    /// When the template was extracted.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl TemplateData {
    /// Create a template with the current timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty template.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::invalid_template("Template cannot be empty"));
        }
        Ok(Self {
            bytes,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Template length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-length template (never constructible via
    /// [`new`](Self::new), but kept for the `len`/`is_empty` pairing).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render the template as an uppercase hex string.
    ///
    /// # Examples
    ///
    /// ```
    /// use ridgeline_sensor::TemplateData;
    ///
    /// let template = TemplateData::new(vec![0x04, 0xAB, 0xCD]).unwrap();
    /// assert_eq!(template.hex(), "04ABCD");
    /// ```
    #[must_use]
    pub fn hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Event delivered asynchronously by the sensor runtime while capturing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CaptureEvent {
    /// A frame was captured.
    ImageReady(FrameData),

    /// A template was extracted from a captured frame.
    TemplateReady(TemplateData),

    /// A capture attempt failed.
    ///
    /// Emitted continuously while no finger is on the sensor; expected,
    /// recoverable, and never surfaced as a user-visible alert.
    CaptureError {
        /// Vendor error code.
        code: i32,
    },

    /// Extraction failed for a captured frame.
    ///
    /// The sensor keeps capturing; the next attempt may succeed.
    ExtractError {
        /// Vendor error code.
        code: i32,
    },
}

impl CaptureEvent {
    /// Returns `true` for the expected high-frequency no-finger event.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CaptureError { .. })
    }
}
