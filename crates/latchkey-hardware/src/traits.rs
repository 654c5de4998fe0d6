//! Hardware capability trait definitions.
//!
//! This module defines the two capabilities the door daemon needs from its
//! hardware: a strike output it can energize and release, and a contact
//! sensor it can sample and wait on. Each capability has a real backend
//! (sysfs GPIO), a no-op or inert fallback, and a mock for tests; the
//! backend is chosen once at construction time.
//!
//! The sensor trait returns `impl Future + Send` (Rust 1.90 + Edition 2024
//! RPITIT) so monitors generic over the sensor can run on spawned tasks.
//! Implementations still write plain `async fn`. The strike trait is
//! synchronous: writing an output line never waits on the device.

use std::future::Future;

use crate::error::Result;
use crate::types::{ContactLevel, DeviceInfo};

/// Door strike output abstraction.
///
/// The strike permits entry while energized. Implementations are driven low
/// at construction so the door starts locked.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::traits::StrikeOutput;
/// use latchkey_hardware::mock::MockStrike;
///
/// let (mut strike, handle) = MockStrike::new();
///
/// strike.energize().unwrap();
/// assert!(strike.is_energized());
///
/// strike.deenergize().unwrap();
/// assert_eq!(handle.pulse_count(), 1);
/// ```
pub trait StrikeOutput: Send + Sync {
    /// Drive the output high (door unlocked).
    ///
    /// # Errors
    ///
    /// Returns an error if the output line cannot be written.
    fn energize(&mut self) -> Result<()>;

    /// Drive the output low (door locked).
    ///
    /// # Errors
    ///
    /// Returns an error if the output line cannot be written.
    fn deenergize(&mut self) -> Result<()>;

    /// Last level successfully written to the output.
    fn is_energized(&self) -> bool;

    /// Describe the backend.
    fn info(&self) -> DeviceInfo;
}

/// Door contact sensor abstraction.
///
/// Reports the level of a binary switch mounted on the door frame. Edge
/// reporting is raw: bounce filtering is the caller's responsibility.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::traits::ContactSensor;
/// use latchkey_hardware::types::ContactLevel;
/// use latchkey_hardware::mock::MockContactSensor;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut sensor, handle) = MockContactSensor::new(ContactLevel::Pressed);
///
///     assert_eq!(sensor.read_level().await?, ContactLevel::Pressed);
///
///     handle.release().await?;
///     assert_eq!(sensor.wait_for_edge().await?, ContactLevel::Released);
///     Ok(())
/// }
/// ```
pub trait ContactSensor: Send + Sync {
    /// Sample the current level of the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read.
    fn read_level(&mut self) -> impl Future<Output = Result<ContactLevel>> + Send;

    /// Wait for the next edge and return the level it settled on.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or the device is gone.
    fn wait_for_edge(&mut self) -> impl Future<Output = Result<ContactLevel>> + Send;

    /// Describe the backend.
    fn get_info(&self) -> impl Future<Output = Result<DeviceInfo>> + Send;
}
