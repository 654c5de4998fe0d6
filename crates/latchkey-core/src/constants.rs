//! Daemon-wide constants.
//!
//! This module centralizes the fixed values shared by the latchkey crates:
//! credential width, timing defaults for the strike and contact sensor, the
//! remote authorization contract, and the names of the on-disk artifacts
//! (credential cache, shared door-state segment).
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(FOB_LENGTH, 10);
//!
//! let hold = Duration::from_millis(DEFAULT_UNLOCK_HOLD_MS);
//! assert_eq!(hold.as_secs(), 5);
//! ```

// ============================================================================
// Credentials
// ============================================================================

/// Width of a normalized credential identifier.
///
/// Scanner output is left-padded with zeros to this width before it is
/// compared against the authorized set.
///
/// # Examples
///
/// ```
/// use latchkey_core::constants::FOB_LENGTH;
///
/// let fob = format!("{:0>width$}", "1234567", width = FOB_LENGTH);
/// assert_eq!(fob, "0001234567");
/// ```
pub const FOB_LENGTH: usize = 10;

// ============================================================================
// Remote Authorization
// ============================================================================

/// Path of the authorization endpoint, relative to the configured base URL.
pub const AUTH_PATH: &str = "/rfid/auth";

/// Hard timeout for one authorization request, in milliseconds.
///
/// The request is cancelled at this boundary and the resolver falls back to
/// the credential cache.
pub const AUTH_TIMEOUT_MS: u64 = 2000;

/// Zone reported when none is configured.
pub const DEFAULT_ZONE: &str = "default";

// ============================================================================
// Door Hardware
// ============================================================================

/// How long the strike stays energized for one unlock, in milliseconds.
pub const DEFAULT_UNLOCK_HOLD_MS: u64 = 5000;

/// Contact sensor settle window, in milliseconds.
///
/// Edges arriving within this window after the previous accepted edge are
/// treated as bounce and ignored.
pub const DEFAULT_CONTACT_DEBOUNCE_MS: u64 = 100;

/// Interval at which polled sensors sample their input line, in milliseconds.
pub const CONTACT_POLL_INTERVAL_MS: u64 = 10;

/// GPIO line driving the door strike relay.
pub const DEFAULT_STRIKE_PIN: u32 = 22;

/// Root of the Linux sysfs GPIO interface.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

// ============================================================================
// Persistent and Shared Artifacts
// ============================================================================

/// Subdirectory of the user cache directory holding latchkey files.
pub const CACHE_DIR_NAME: &str = "latchkey";

/// File name of the persisted authorized-set cache.
pub const CACHE_FILE_NAME: &str = "authorized-fob-cache.json";

/// Well-known name of the shared door-state segment.
pub const DOOR_STATE_SHM_NAME: &str = "doorstateshm";

/// Directory backing named shared-memory segments on Linux.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Exact size of the shared door-state record in bytes.
///
/// ```text
/// offset  size  field
///      0     8  process_start_time   (f64)
///      8     4  door_is_open         (i32)
///     12     4  padding
///     16     8  door_open_time       (f64)
///     24     8  door_close_time      (f64)
///     32     4  authorized_scans     (i32)
///     36     4  unauthorized_scans   (i32)
/// ```
pub const DOOR_STATE_RECORD_SIZE: usize = 40;

/// Sentinel stored in timestamp fields that have never been set.
pub const UNSET_TIMESTAMP: f64 = -1.0;

/// Default scanner subprocess command.
pub const DEFAULT_SCANNER_COMMAND: &str = "wiegand_rpi";
