//! Mock contact sensor implementation for testing and development.
//!
//! Edges are injected through a [`MockContactHandle`] and delivered to the
//! sensor unfiltered, including duplicates and bursts, so callers can
//! exercise their own debounce logic.

use crate::{
    HardwareError, Result,
    traits::ContactSensor,
    types::{ContactLevel, DeviceInfo},
};
use tokio::sync::mpsc;

/// Mock door contact sensor.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::MockContactSensor;
/// use latchkey_hardware::traits::ContactSensor;
/// use latchkey_hardware::types::ContactLevel;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut sensor, handle) = MockContactSensor::new(ContactLevel::Pressed);
///
///     handle.release().await?;
///     handle.press().await?;
///
///     assert_eq!(sensor.wait_for_edge().await?, ContactLevel::Released);
///     assert_eq!(sensor.wait_for_edge().await?, ContactLevel::Pressed);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockContactSensor {
    /// Channel receiver for edge events
    event_rx: mpsc::Receiver<ContactLevel>,

    /// Level after the last delivered edge
    level: ContactLevel,
}

impl MockContactSensor {
    /// Create a mock sensor resting at `level`.
    ///
    /// Returns the sensor and a handle used to inject edges.
    pub fn new(level: ContactLevel) -> (Self, MockContactHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);
        (Self { event_rx, level }, MockContactHandle { event_tx })
    }
}

impl ContactSensor for MockContactSensor {
    async fn read_level(&mut self) -> Result<ContactLevel> {
        Ok(self.level)
    }

    async fn wait_for_edge(&mut self) -> Result<ContactLevel> {
        let level = self
            .event_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("contact event channel closed"))?;

        self.level = level;
        Ok(level)
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("Mock contact sensor", "mock"))
    }
}

/// Handle for driving a mock contact sensor.
#[derive(Debug, Clone)]
pub struct MockContactHandle {
    event_tx: mpsc::Sender<ContactLevel>,
}

impl MockContactHandle {
    /// Simulate the door closing onto the switch.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub async fn press(&self) -> Result<()> {
        self.edge(ContactLevel::Pressed).await
    }

    /// Simulate the door opening away from the switch.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub async fn release(&self) -> Result<()> {
        self.edge(ContactLevel::Released).await
    }

    /// Inject a raw edge settling on `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub async fn edge(&self, level: ContactLevel) -> Result<()> {
        self.event_tx
            .send(level)
            .await
            .map_err(|_| HardwareError::disconnected("contact event channel closed"))
    }
}
