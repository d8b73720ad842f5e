//! Ridgeline scanner service binary.
//!
//! Runs the USB fingerprint scanner service against real USB enumeration
//! (with the `hardware-rusb` feature) or fully simulated hardware
//! (`--mock`). The vendor capture runtime itself ships out of tree; the
//! simulated sensor stands in for it here.

use anyhow::{Context, Result};
use clap::Parser;
use ridgeline_core::DeviceIdentity;
use ridgeline_core::constants::TARGET_VENDOR_ID;
use ridgeline_sensor::{AnySensorDevice, MockSensor, MockSensorHandle};
use ridgeline_service::{ScannerService, ServiceConfig};
use ridgeline_usb::{AnyUsbBroker, MockUsbBroker, MockUsbBrokerHandle, UsbBroker};
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "ridgeline")]
#[command(
    author,
    version,
    about = "USB fingerprint scanner service",
    long_about = "
Coordinates USB access to a fingerprint scanner and streams capture
events to the display surface.

EXAMPLES:
    # Run with default config against simulated hardware
    ridgeline --mock

    # Run with a custom config
    ridgeline --config /etc/ridgeline/config.toml

    # List attached USB devices and exit
    ridgeline --list-devices

    # Run with debug logging
    ridgeline --log-level debug
"
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Run against simulated hardware
    #[arg(long)]
    mock: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

/// Setup tracing subscriber for the binary.
fn setup_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServiceConfig::load(path).context("failed to load configuration")?,
        None => ServiceConfig::default(),
    };

    setup_logging(
        args.log_level
            .as_deref()
            .unwrap_or(&config.service.log_level),
    )?;

    let (sensor, sensor_handle) = MockSensor::new();
    let mut demo: Option<(MockUsbBrokerHandle, MockSensorHandle)> = None;

    let broker;
    if args.mock {
        let (mock, usb_handle) = MockUsbBroker::new();
        broker = AnyUsbBroker::Mock(mock);
        demo = Some((usb_handle, sensor_handle));
    } else {
        #[cfg(feature = "hardware-rusb")]
        {
            broker = AnyUsbBroker::Native(
                ridgeline_usb::RusbBroker::new().context("libusb initialization failed")?,
            );
        }
        #[cfg(not(feature = "hardware-rusb"))]
        {
            anyhow::bail!("built without the hardware-rusb feature; run with --mock");
        }
    }

    if args.list_devices {
        for device in broker.list_devices().await? {
            match &device.product_name {
                Some(name) => println!("{}  {}", device.identity, name),
                None => println!("{}", device.identity),
            }
        }
        return Ok(());
    }

    let mut service = ScannerService::new(broker, AnySensorDevice::Mock(sensor), &config);

    if let Some((usb_handle, sensor_handle)) = demo {
        tokio::spawn(drive_simulation(usb_handle, sensor_handle));
        // Give the simulated scanner time to show up before connecting.
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    service.connect().await?;
    info!("scanner service running; ctrl-c to exit");

    tokio::select! {
        _ = service.run() => {}
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    service.shutdown().await;
    println!("status: {}", service.panel().status());
    Ok(())
}

/// Scripted hardware for `--mock`: plugs the scanner in pre-authorized,
/// then emits a capture sequence ending in an extracted template.
async fn drive_simulation(usb: MockUsbBrokerHandle, sensor: MockSensorHandle) {
    let identity = DeviceIdentity::from_raw(TARGET_VENDOR_ID, 7);

    tokio::time::sleep(Duration::from_millis(100)).await;
    usb.preauthorize(identity).await;
    usb.attach_device(identity, Some("Simulated fingerprint reader")).await;

    // A few no-finger retries, then a capture with its template.
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(400)).await;
        sensor.emit_capture_error(-9).await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;
    sensor.emit_frame().await;
    sensor.emit_template(vec![0x52, 0x49, 0x44, 0x47, 0x45]).await;

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        sensor.emit_capture_error(-9).await;
    }
}
