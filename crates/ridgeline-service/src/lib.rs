//! Scanner service for Ridgeline.
//!
//! Ties the USB session manager and the sensor session controller
//! together behind one event loop. Both delivery contexts (the OS USB
//! broadcasts and the vendor capture callbacks) are marshalled onto a
//! single consumer channel; the display panel is only ever touched from
//! that consumer, never from a delivery task.
//!
//! ```text
//! UsbSessionManager ──UsbEvent──┐
//!                               ├──► ScannerEvent channel ──► ScannerService ──► DisplayPanel
//! SensorSession ──CaptureEvent──┘         (single consumer)
//! ```

pub mod config;
pub mod display;
pub mod service;

pub use config::{ScannerSettings, ServiceConfig, ServiceSettings};
pub use display::DisplayPanel;
pub use service::{ScannerEvent, ScannerService};
