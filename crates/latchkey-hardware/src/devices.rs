//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) are not
//! object-safe, so `Box<dyn ContactSensor>` is not available. These enums
//! provide concrete type dispatch instead: the backend is picked once when
//! the daemon is configured, and every call is a plain `match`.
//!
//! # Examples
//!
//! ```
//! use latchkey_hardware::devices::AnyStrikeOutput;
//! use latchkey_hardware::noop::NoopStrike;
//! use latchkey_hardware::traits::StrikeOutput;
//!
//! let mut strike = AnyStrikeOutput::Noop(NoopStrike::new());
//! strike.energize().unwrap();
//! assert!(strike.is_energized());
//! ```

use crate::mock::{MockContactSensor, MockStrike};
use crate::noop::NoopStrike;
use crate::sysfs::{SysfsContactSensor, SysfsStrike};
use crate::traits::{ContactSensor, StrikeOutput};
use crate::{ContactLevel, DeviceInfo, Result};

/// Enum wrapper for strike output dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyStrikeOutput {
    /// Relay on a sysfs GPIO line.
    Sysfs(SysfsStrike),
    /// Inert stub.
    Noop(NoopStrike),
    /// Mock strike for development and testing.
    Mock(MockStrike),
}

impl StrikeOutput for AnyStrikeOutput {
    fn energize(&mut self) -> Result<()> {
        match self {
            Self::Sysfs(device) => device.energize(),
            Self::Noop(device) => device.energize(),
            Self::Mock(device) => device.energize(),
        }
    }

    fn deenergize(&mut self) -> Result<()> {
        match self {
            Self::Sysfs(device) => device.deenergize(),
            Self::Noop(device) => device.deenergize(),
            Self::Mock(device) => device.deenergize(),
        }
    }

    fn is_energized(&self) -> bool {
        match self {
            Self::Sysfs(device) => device.is_energized(),
            Self::Noop(device) => device.is_energized(),
            Self::Mock(device) => device.is_energized(),
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Sysfs(device) => device.info(),
            Self::Noop(device) => device.info(),
            Self::Mock(device) => device.info(),
        }
    }
}

/// Enum wrapper for contact sensor dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyContactSensor {
    /// Switch on a sysfs GPIO line.
    Sysfs(SysfsContactSensor),
    /// Mock sensor for development and testing.
    Mock(MockContactSensor),
}

impl ContactSensor for AnyContactSensor {
    async fn read_level(&mut self) -> Result<ContactLevel> {
        match self {
            Self::Sysfs(device) => device.read_level().await,
            Self::Mock(device) => device.read_level().await,
        }
    }

    async fn wait_for_edge(&mut self) -> Result<ContactLevel> {
        match self {
            Self::Sysfs(device) => device.wait_for_edge().await,
            Self::Mock(device) => device.wait_for_edge().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Sysfs(device) => device.get_info().await,
            Self::Mock(device) => device.get_info().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_strike_mock() {
        let (strike, handle) = MockStrike::new();
        let mut any_strike = AnyStrikeOutput::Mock(strike);

        any_strike.energize().unwrap();
        assert!(handle.is_energized());
        assert_eq!(any_strike.info().name, "Mock strike");
    }

    #[test]
    fn test_any_strike_noop() {
        let any_strike = AnyStrikeOutput::Noop(NoopStrike::new());
        assert_eq!(any_strike.info().model, "noop");
    }

    #[tokio::test]
    async fn test_any_contact_mock() {
        let (sensor, handle) = MockContactSensor::new(ContactLevel::Pressed);
        let mut any_sensor = AnyContactSensor::Mock(sensor);

        let info = any_sensor.get_info().await.unwrap();
        assert_eq!(info.name, "Mock contact sensor");

        handle.release().await.unwrap();
        assert_eq!(
            any_sensor.wait_for_edge().await.unwrap(),
            ContactLevel::Released
        );
    }
}
