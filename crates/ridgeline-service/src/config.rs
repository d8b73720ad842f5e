//! Service configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file
//! (or no file at all) yields a working configuration. Vendor and product
//! ids are plain integers — TOML hex literals (`vendor_id = 0x1b55`) are
//! the usual spelling.

use ridgeline_core::constants::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_SETTLE_DELAY_MS, TARGET_VENDOR_ID,
};
use ridgeline_core::{Error, ProductId, Result, VendorId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Scanner hardware settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Vendor id the service filters devices and broadcasts for.
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    /// Fixed product id, if the deployment pins one model.
    ///
    /// Left unset, the product id is discovered at runtime from the
    /// first attached device of the target vendor.
    #[serde(default)]
    pub product_id: Option<u16>,

    /// Pause between sensor open and capture start, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl ScannerSettings {
    /// The configured vendor id as a typed value.
    #[must_use]
    pub fn vendor(&self) -> VendorId {
        VendorId::new(self.vendor_id)
    }

    /// The pinned product id as a typed value, if configured.
    #[must_use]
    pub fn product(&self) -> Option<ProductId> {
        self.product_id.map(ProductId::new)
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: None,
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Service runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Capacity of the unified event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            log_level: default_log_level(),
        }
    }
}

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use ridgeline_service::ServiceConfig;
///
/// let config: ServiceConfig = toml::from_str(
///     r#"
///     [scanner]
///     vendor_id = 0x1b55
///     settle_delay_ms = 250
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.scanner.vendor_id, 0x1b55);
/// assert_eq!(config.scanner.settle_delay_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// Scanner hardware settings.
    #[serde(default)]
    pub scanner: ScannerSettings,

    /// Service runtime settings.
    #[serde(default)]
    pub service: ServiceSettings,
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Write the configuration to a TOML file, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if serialization or the write
    /// fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("cannot serialize configuration: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("cannot create {}: {e}", parent.display())))?;
        }
        fs::write(path, raw)
            .map_err(|e| Error::config(format!("cannot write {}: {e}", path.display())))
    }
}

fn default_vendor_id() -> u16 {
    TARGET_VENDOR_ID
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.scanner.vendor_id, TARGET_VENDOR_ID);
        assert_eq!(config.scanner.product_id, None);
        assert_eq!(config.scanner.settle_delay_ms, DEFAULT_SETTLE_DELAY_MS);
        assert_eq!(config.service.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [scanner]
            product_id = 7

            [service]
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.scanner.vendor_id, TARGET_VENDOR_ID);
        assert_eq!(config.scanner.product_id, Some(7));
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.service.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_typed_accessors() {
        let settings = ScannerSettings {
            vendor_id: 0x1b55,
            product_id: Some(7),
            settle_delay_ms: 200,
        };
        assert_eq!(settings.vendor().to_string(), "1b55");
        assert_eq!(settings.product().unwrap().as_u16(), 7);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut config = ServiceConfig::default();
        config.scanner.product_id = Some(7);
        config.service.log_level = "trace".to_string();

        let path = std::env::temp_dir().join(format!(
            "ridgeline-config-test-{}.toml",
            std::process::id()
        ));
        config.save(&path).unwrap();
        let loaded = ServiceConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = ServiceConfig::load(Path::new("/nonexistent/ridgeline.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
