//! Linux sysfs GPIO backends.
//!
//! Lines are exported through `<root>/export` on first use and driven via
//! `<root>/gpioN/{direction,value}`. The root is configurable so the same
//! code runs against a scratch directory in tests.
//!
//! The contact sensor is wired with a pull-up: a closed door pulls the line
//! low (pressed), an open door lets it float high (released).

use std::path::{Path, PathBuf};
use std::time::Duration;

use latchkey_core::constants::CONTACT_POLL_INTERVAL_MS;
use tracing::{debug, trace};

use crate::{
    HardwareError, Result,
    traits::{ContactSensor, StrikeOutput},
    types::{ContactLevel, DeviceInfo},
};

/// Direction of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// One exported sysfs GPIO line.
#[derive(Debug, Clone)]
pub struct SysfsLine {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsLine {
    /// Export `pin` under `root` if needed and set its direction.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the line cannot be
    /// exported or configured.
    pub fn open(root: impl AsRef<Path>, pin: u32, direction: Direction) -> Result<Self> {
        let root = root.as_ref();
        let line_dir = root.join(format!("gpio{pin}"));

        if !line_dir.exists() {
            debug!(pin, root = %root.display(), "Exporting GPIO line");
            std::fs::write(root.join("export"), pin.to_string()).map_err(|e| {
                HardwareError::initialization_failed(format!("export gpio{pin}: {e}"))
            })?;
        }

        std::fs::write(line_dir.join("direction"), direction.as_str()).map_err(|e| {
            HardwareError::initialization_failed(format!("configure gpio{pin}: {e}"))
        })?;

        Ok(Self {
            pin,
            value_path: line_dir.join("value"),
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Drive the line high or low.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::OutputFailed` if the value cannot be written.
    pub fn write(&self, high: bool) -> Result<()> {
        std::fs::write(&self.value_path, if high { "1" } else { "0" })
            .map_err(|e| HardwareError::output_failed(self.pin, e.to_string()))
    }

    /// Read the line level.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the value file cannot be read, or
    /// `HardwareError::InvalidData` if it holds anything but `0` or `1`.
    pub async fn read(&self) -> Result<bool> {
        let raw = tokio::fs::read_to_string(&self.value_path).await?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(HardwareError::invalid_data(format!(
                "gpio{} value {other:?}",
                self.pin
            ))),
        }
    }
}

/// Strike relay on a sysfs GPIO output line.
#[derive(Debug)]
pub struct SysfsStrike {
    line: SysfsLine,
    energized: bool,
}

impl SysfsStrike {
    /// Open the strike line and drive it low.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be exported, configured or
    /// written.
    pub fn open(root: impl AsRef<Path>, pin: u32) -> Result<Self> {
        let line = SysfsLine::open(root, pin, Direction::Out)?;
        line.write(false)?;
        Ok(Self {
            line,
            energized: false,
        })
    }
}

impl StrikeOutput for SysfsStrike {
    fn energize(&mut self) -> Result<()> {
        self.line.write(true)?;
        self.energized = true;
        Ok(())
    }

    fn deenergize(&mut self) -> Result<()> {
        self.line.write(false)?;
        self.energized = false;
        Ok(())
    }

    fn is_energized(&self) -> bool {
        self.energized
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Door strike", format!("sysfs-gpio{}", self.line.pin()))
    }
}

/// Contact sensor on a sysfs GPIO input line.
///
/// Sysfs offers no portable blocking edge wait, so the line is sampled every
/// [`CONTACT_POLL_INTERVAL_MS`] and a change of level is reported as an edge.
#[derive(Debug)]
pub struct SysfsContactSensor {
    line: SysfsLine,
    last_level: Option<ContactLevel>,
    poll_interval: Duration,
}

impl SysfsContactSensor {
    /// Open the sensor line as an input.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be exported or configured.
    pub fn open(root: impl AsRef<Path>, pin: u32) -> Result<Self> {
        Ok(Self {
            line: SysfsLine::open(root, pin, Direction::In)?,
            last_level: None,
            poll_interval: Duration::from_millis(CONTACT_POLL_INTERVAL_MS),
        })
    }

    /// Override the sampling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn sample(&self) -> Result<ContactLevel> {
        Ok(if self.line.read().await? {
            ContactLevel::Released
        } else {
            ContactLevel::Pressed
        })
    }
}

impl ContactSensor for SysfsContactSensor {
    async fn read_level(&mut self) -> Result<ContactLevel> {
        let level = self.sample().await?;
        self.last_level = Some(level);
        Ok(level)
    }

    async fn wait_for_edge(&mut self) -> Result<ContactLevel> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let level = self.sample().await?;

            match self.last_level {
                Some(previous) if previous == level => continue,
                _ => {
                    trace!(pin = self.line.pin(), ?level, "Contact edge");
                    self.last_level = Some(level);
                    return Ok(level);
                }
            }
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(
            "Door contact sensor",
            format!("sysfs-gpio{}", self.line.pin()),
        ))
    }
}
