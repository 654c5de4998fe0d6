//! Fixed-layout door state record.
//!
//! The record is the unit exchanged through the shared door-state segment.
//! The daemon is the only writer; external readers (the metrics exporter,
//! `latchkey inspect`) decode the same bytes with [`DoorStateRecord::decode`].
//!
//! # Layout
//!
//! Host byte order, natural alignment, [`DOOR_STATE_RECORD_SIZE`] bytes:
//!
//! ```text
//! ┌──────────────┬──────────┬─────┬────────────┬─────────────┬────────┬──────────┐
//! │ start (f64)  │ open i32 │ pad │ open (f64) │ close (f64) │ auth   │ unauth   │
//! │ 0..8         │ 8..12    │     │ 16..24     │ 24..32      │ 32..36 │ 36..40   │
//! └──────────────┴──────────┴─────┴────────────┴─────────────┴────────┴──────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use latchkey_core::{DoorPosition, DoorStateRecord};
//!
//! let mut record = DoorStateRecord::new(1_700_000_000.0);
//! record.record_authorized();
//! assert!(record.transition_to(DoorPosition::Open, 1_700_000_005.0));
//!
//! let bytes = record.encode();
//! let decoded = DoorStateRecord::decode(&bytes).unwrap();
//! assert_eq!(decoded, record);
//! ```

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::constants::{DOOR_STATE_RECORD_SIZE, UNSET_TIMESTAMP};
use crate::{DoorPosition, Error, Result};

/// Current wall-clock time as fractional seconds since the Unix epoch.
#[must_use]
pub fn wall_clock_seconds() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}

/// Live daemon status shared with out-of-process readers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoorStateRecord {
    /// Wall-clock seconds at daemon start.
    pub process_start_time: f64,

    /// Tri-state door flag.
    pub position: DoorPosition,

    /// Wall-clock seconds of the last observed opening, or -1.
    pub door_open_time: f64,

    /// Wall-clock seconds of the last observed closing, or -1.
    pub door_close_time: f64,

    /// Number of unlocks performed (fob or remote).
    pub authorized_scans: i32,

    /// Number of scans denied.
    pub unauthorized_scans: i32,
}

impl DoorStateRecord {
    /// Create a record with every field at its default.
    pub fn new(process_start_time: f64) -> Self {
        Self {
            process_start_time,
            position: DoorPosition::Unknown,
            door_open_time: UNSET_TIMESTAMP,
            door_close_time: UNSET_TIMESTAMP,
            authorized_scans: 0,
            unauthorized_scans: 0,
        }
    }

    /// Apply an observed door position.
    ///
    /// The matching timestamp is stamped only when the position actually
    /// changes. Returns `true` if the record was modified.
    pub fn transition_to(&mut self, position: DoorPosition, now: f64) -> bool {
        if self.position == position {
            return false;
        }

        match position {
            DoorPosition::Open => self.door_open_time = now,
            DoorPosition::Closed => self.door_close_time = now,
            DoorPosition::Unknown => {}
        }
        self.position = position;
        true
    }

    /// Set the resting position sampled at startup without stamping a
    /// transition time.
    pub fn set_initial_position(&mut self, position: DoorPosition) {
        self.position = position;
    }

    pub fn record_authorized(&mut self) {
        self.authorized_scans = self.authorized_scans.saturating_add(1);
    }

    pub fn record_unauthorized(&mut self) {
        self.unauthorized_scans = self.unauthorized_scans.saturating_add(1);
    }

    /// Seconds the daemon has been running at `now`.
    #[must_use]
    pub fn uptime_seconds(&self, now: f64) -> f64 {
        now - self.process_start_time
    }

    /// Seconds since the door was last opened, or -1 if it never was.
    #[must_use]
    pub fn seconds_since_opened(&self, now: f64) -> f64 {
        Self::elapsed_since(self.door_open_time, now)
    }

    /// Seconds since the door was last closed, or -1 if it never was.
    #[must_use]
    pub fn seconds_since_closed(&self, now: f64) -> f64 {
        Self::elapsed_since(self.door_close_time, now)
    }

    fn elapsed_since(timestamp: f64, now: f64) -> f64 {
        if timestamp == UNSET_TIMESTAMP {
            UNSET_TIMESTAMP
        } else {
            now - timestamp
        }
    }

    /// Encode into the fixed shared layout.
    #[must_use]
    pub fn encode(&self) -> [u8; DOOR_STATE_RECORD_SIZE] {
        let mut out = [0u8; DOOR_STATE_RECORD_SIZE];
        let mut buf = &mut out[..];

        buf.put_f64_ne(self.process_start_time);
        buf.put_i32_ne(self.position.code());
        buf.put_bytes(0, 4);
        buf.put_f64_ne(self.door_open_time);
        buf.put_f64_ne(self.door_close_time);
        buf.put_i32_ne(self.authorized_scans);
        buf.put_i32_ne(self.unauthorized_scans);

        out
    }

    /// Decode a record from the fixed shared layout.
    ///
    /// # Errors
    /// Returns `Error::RecordSize` if `bytes` is not exactly
    /// [`DOOR_STATE_RECORD_SIZE`] long, and `Error::InvalidDoorPosition` if
    /// the door flag is not one of -1, 0, 1.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DOOR_STATE_RECORD_SIZE {
            return Err(Error::RecordSize {
                expected: DOOR_STATE_RECORD_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = bytes;
        let process_start_time = buf.get_f64_ne();
        let position = DoorPosition::from_code(buf.get_i32_ne())?;
        buf.advance(4);
        let door_open_time = buf.get_f64_ne();
        let door_close_time = buf.get_f64_ne();
        let authorized_scans = buf.get_i32_ne();
        let unauthorized_scans = buf.get_i32_ne();

        Ok(Self {
            process_start_time,
            position,
            door_open_time,
            door_close_time,
            authorized_scans,
            unauthorized_scans,
        })
    }
}
