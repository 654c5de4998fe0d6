//! Hardware abstraction layer for the latchkey door daemon.
//!
//! This crate provides capability interfaces for the two pieces of door
//! hardware the daemon drives, together with interchangeable backends:
//!
//! | Capability | Real backend | Fallback | Test double |
//! |------------|--------------|----------|-------------|
//! | [`StrikeOutput`] | [`SysfsStrike`](sysfs::SysfsStrike) | [`NoopStrike`](noop::NoopStrike) | [`MockStrike`](mock::MockStrike) |
//! | [`ContactSensor`] | [`SysfsContactSensor`](sysfs::SysfsContactSensor) | none (monitor stays inert) | [`MockContactSensor`](mock::MockContactSensor) |
//!
//! The backend is selected once by configuration and wrapped in the
//! [`devices`] enums, never swapped at runtime.
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with
//! [`HardwareError`]. Callers in the daemon treat strike write failures as
//! fire-and-forget (there is no acknowledgement channel from the relay) and
//! degrade to the fallback when a device cannot be opened.
//!
//! # Example
//!
//! ```
//! use latchkey_hardware::devices::AnyStrikeOutput;
//! use latchkey_hardware::mock::MockStrike;
//! use latchkey_hardware::StrikeOutput;
//!
//! let (strike, handle) = MockStrike::new();
//! let mut strike = AnyStrikeOutput::Mock(strike);
//!
//! strike.energize().unwrap();
//! strike.deenergize().unwrap();
//! assert_eq!(handle.pulse_count(), 1);
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod noop;
pub mod sysfs;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyContactSensor, AnyStrikeOutput};
pub use error::{HardwareError, Result};
pub use traits::{ContactSensor, StrikeOutput};
pub use types::{ContactLevel, DeviceInfo};
