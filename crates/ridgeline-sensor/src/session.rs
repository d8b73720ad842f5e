//! Sensor session controller.
//!
//! Owns the one hardware handle of the process and translates its
//! lifecycle into the two states the device actually has: closed, or open
//! and capturing. There is no reachable "open but idle" state; a capture
//! error while capturing is a self-loop, not a transition.
//!
//! ```text
//! {Closed} --start(ok)--> {Capturing} --stop / device-removed--> {Closed}
//! ```

use crate::devices::AnySensorDevice;
use crate::events::CaptureEvent;
use crate::traits::FingerprintSensor;
use ridgeline_core::constants::DEFAULT_SETTLE_DELAY_MS;
use ridgeline_core::{DeviceIdentity, Error, Result};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Lifecycle state of the sensor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No hardware handle is open.
    Closed,

    /// The handle is open and continuous capture is running.
    Capturing,
}

impl SessionState {
    /// Check if a transition to the target state is valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use ridgeline_sensor::SessionState;
    ///
    /// assert!(SessionState::Closed.can_transition_to(SessionState::Capturing));
    /// assert!(SessionState::Capturing.can_transition_to(SessionState::Closed));
    /// assert!(!SessionState::Closed.can_transition_to(SessionState::Closed));
    /// ```
    #[must_use]
    pub fn can_transition_to(self, target: SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Closed, SessionState::Capturing)
                | (SessionState::Capturing, SessionState::Closed)
        )
    }

    /// Returns `true` while capture is running.
    #[inline]
    #[must_use]
    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Capturing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Capturing => write!(f, "Capturing"),
        }
    }
}

/// Controller for the vendor sensor handle.
///
/// At most one session is active per controller, and the service holds at
/// most one controller, so at most one handle is open per process. A new
/// `start` first closes any existing session.
///
/// # Examples
///
/// ```no_run
/// use ridgeline_core::DeviceIdentity;
/// use ridgeline_sensor::{AnySensorDevice, MockSensor, SensorSession};
/// use tokio::sync::mpsc;
///
/// # async fn example() -> ridgeline_core::Result<()> {
/// let (sensor, _handle) = MockSensor::new();
/// let (tx, _rx) = mpsc::channel(16);
///
/// let mut session = SensorSession::new(AnySensorDevice::Mock(sensor), tx);
/// session.start(DeviceIdentity::from_raw(0x1b55, 7)).await?;
/// session.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct SensorSession {
    /// The vendor sensor, exclusively owned.
    device: AnySensorDevice,

    /// Outgoing capture events to the service layer.
    output: mpsc::Sender<CaptureEvent>,

    /// Pause between open and capture start.
    settle_delay: Duration,

    /// Current lifecycle state.
    state: SessionState,

    /// Identity the open handle was opened for.
    identity: Option<DeviceIdentity>,

    /// Event pump forwarding sensor events to `output`.
    pump: Option<JoinHandle<()>>,
}

impl SensorSession {
    /// Create a controller with the default settle delay.
    pub fn new(device: AnySensorDevice, output: mpsc::Sender<CaptureEvent>) -> Self {
        Self {
            device,
            output,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            state: SessionState::Closed,
            identity: None,
            pump: None,
        }
    }

    /// Override the settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity of the open session, if capturing.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity
    }

    /// Frame dimensions reported by the sensor.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        self.device.frame_dimensions()
    }

    /// Open the sensor for the given device and begin continuous capture.
    ///
    /// Any prior session is fully stopped first, so two handles are never
    /// open concurrently. After open, the hardware settle delay is
    /// awaited before the capture sink is registered and capture starts;
    /// capture never begins before the delay elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SensorOpenFailure`] if open or capture start
    /// fails; the hardware is left closed and the session stays `Closed`.
    pub async fn start(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.stop().await;

        if let Err(e) = self.device.open(identity).await {
            return Err(Error::sensor_open(e.to_string()));
        }

        // The hardware needs this pause after open before it accepts a
        // capture listener. Awaited so the control task keeps running.
        tokio::time::sleep(self.settle_delay).await;

        let events = self.device.subscribe();
        if let Err(e) = self.device.start_capture().await {
            if let Err(close_err) = self.device.close().await {
                warn!("close after failed capture start also failed: {close_err}");
            }
            return Err(Error::sensor_open(e.to_string()));
        }

        self.pump = Some(tokio::spawn(Self::pump_events(
            events,
            self.output.clone(),
        )));
        self.state = SessionState::Capturing;
        self.identity = Some(identity);
        info!(device = %identity, "sensor session capturing");
        Ok(())
    }

    /// Stop capture and close the handle.
    ///
    /// Idempotent: stopping a closed session does nothing. Runs on
    /// shutdown and device-removal paths, so close-time failures are
    /// logged and swallowed, never propagated.
    pub async fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        if self.state.is_capturing() {
            if let Err(e) = self.device.stop_capture().await {
                warn!("stop capture failed: {e}");
            }
            if let Err(e) = self.device.close().await {
                warn!("sensor close failed: {e}");
            }
            debug!(device = ?self.identity, "sensor session closed");
        }

        self.state = SessionState::Closed;
        self.identity = None;
    }

    /// Pump task body: forwards sensor events to the service channel.
    async fn pump_events(
        mut events: mpsc::Receiver<CaptureEvent>,
        output: mpsc::Sender<CaptureEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if event.is_transient() {
                // No finger on the sensor; the runtime retries at high
                // frequency, so this stays off the normal log levels.
                trace!("capture retry");
            }
            if output.send(event).await.is_err() {
                break;
            }
        }
    }
}

impl Drop for SensorSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert!(SessionState::Closed.can_transition_to(SessionState::Capturing));
        assert!(SessionState::Capturing.can_transition_to(SessionState::Closed));
        assert!(!SessionState::Capturing.can_transition_to(SessionState::Capturing));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Closed));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Closed.to_string(), "Closed");
        assert_eq!(SessionState::Capturing.to_string(), "Capturing");
    }

    #[tokio::test]
    async fn test_new_session_starts_closed() {
        let (sensor, _handle) = crate::mock::MockSensor::new();
        let (tx, _rx) = mpsc::channel(16);
        let session = SensorSession::new(AnySensorDevice::Mock(sensor), tx);

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.identity(), None);
    }
}
