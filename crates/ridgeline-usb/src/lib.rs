//! USB permission and device lifecycle coordination for Ridgeline.
//!
//! This crate mediates between the scanner service and the operating
//! system's USB layer. The OS side sits behind the [`UsbBroker`] trait:
//! enumerate attached devices, query permission, issue the asynchronous
//! permission prompt, and deliver broadcast events (permission decisions,
//! attach, detach) on a subscription stream.
//!
//! The [`UsbSessionManager`] owns the subscription lifecycle and the
//! in-flight permission request. It is the only component allowed to hold
//! the broker subscription, and the only one that resolves permission
//! decisions: a mutual-exclusion guard around the pending request makes a
//! duplicate grant broadcast resolve exactly once downstream.
//!
//! # Substituting brokers
//!
//! Brokers are dispatched through the [`AnyUsbBroker`] enum rather than
//! trait objects, since native `async fn` trait methods are not
//! object-safe. [`MockUsbBroker`] drives development and tests without
//! hardware; the `hardware-rusb` feature adds a libusb-backed broker for
//! hosts with real devices.
//!
//! ```
//! use ridgeline_core::DeviceIdentity;
//! use ridgeline_usb::{AnyUsbBroker, MockUsbBroker, UsbSessionManager};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> ridgeline_core::Result<()> {
//!     let (broker, handle) = MockUsbBroker::new();
//!     handle.attach_device(DeviceIdentity::from_raw(0x1b55, 7), None).await;
//!     handle.preauthorize(DeviceIdentity::from_raw(0x1b55, 7)).await;
//!
//!     let (tx, mut rx) = mpsc::channel(16);
//!     let mut manager = UsbSessionManager::new(AnyUsbBroker::Mock(broker), tx);
//!     manager.register_listeners();
//!
//!     let state = manager
//!         .request_access(DeviceIdentity::from_raw(0x1b55, 7))
//!         .await?;
//!     assert!(state.is_granted());
//!
//!     let event = rx.recv().await.unwrap();
//!     println!("resolved: {:?}", event);
//!
//!     manager.unregister_listeners();
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod manager;
pub mod mock;
pub mod traits;

#[cfg(feature = "hardware-rusb")]
pub mod native;

pub use devices::AnyUsbBroker;
pub use manager::{UsbEvent, UsbSessionManager};
pub use mock::{MockUsbBroker, MockUsbBrokerHandle};
pub use traits::{BrokerEvent, UsbBroker};

#[cfg(feature = "hardware-rusb")]
pub use native::RusbBroker;
