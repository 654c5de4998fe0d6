//! Named shared segment exposing live door state to other processes.
//!
//! The segment is a file of exactly [`DOOR_STATE_RECORD_SIZE`] bytes under a
//! shared-memory directory (`/dev/shm` by default), so any reader can open it
//! by name and decode the fixed layout of [`DoorStateRecord`].
//!
//! Every mutation runs under one mutex and ends with a single positional
//! write of the whole record at offset 0, so writers never interleave and a
//! reader never sees a record that is half old and half new from this
//! process's point of view. The segment is removed when the owning
//! [`SharedDoorState`] is dropped.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use latchkey_core::constants::DOOR_STATE_RECORD_SIZE;
use latchkey_core::{DoorPosition, DoorStateRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DaemonError, DaemonResult};

/// Writer side of the door-state segment.
#[derive(Debug)]
pub struct SharedDoorState {
    path: PathBuf,
    file: File,
    record: Mutex<DoorStateRecord>,
}

impl SharedDoorState {
    /// Create (or truncate) the segment `name` under `dir` and publish a
    /// fresh record stamped with `process_start_time`.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Segment` if the file cannot be created or
    /// written.
    pub fn create(
        dir: impl AsRef<Path>,
        name: &str,
        process_start_time: f64,
    ) -> DaemonResult<Self> {
        let path = dir.as_ref().join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| DaemonError::segment(&path, e))?;

        let record = DoorStateRecord::new(process_start_time);
        file.write_all_at(&record.encode(), 0)
            .map_err(|e| DaemonError::segment(&path, e))?;

        info!(path = %path.display(), "Door state segment created");
        Ok(Self {
            path,
            file,
            record: Mutex::new(record),
        })
    }

    /// Open an existing segment for reading, as an external reader would.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Segment` if the segment does not exist.
    pub fn open_read_only(dir: impl AsRef<Path>, name: &str) -> DaemonResult<DoorStateReader> {
        let path = dir.as_ref().join(name);
        let file = File::open(&path).map_err(|e| DaemonError::segment(&path, e))?;
        Ok(DoorStateReader { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self) -> MutexGuard<'_, DoorStateRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `mutate` under the lock and republish the record if it
    /// reports a change.
    fn update(&self, mutate: impl FnOnce(&mut DoorStateRecord) -> bool) -> bool {
        let mut record = self.record();
        if !mutate(&mut record) {
            return false;
        }

        if let Err(e) = self.file.write_all_at(&record.encode(), 0) {
            warn!(path = %self.path.display(), error = %e, "Failed to publish door state");
        }
        true
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> DoorStateRecord {
        *self.record()
    }

    pub fn record_authorized(&self) {
        self.update(|record| {
            record.record_authorized();
            true
        });
    }

    pub fn record_unauthorized(&self) {
        self.update(|record| {
            record.record_unauthorized();
            true
        });
    }

    /// Publish an observed door position stamped at `now`.
    ///
    /// Returns `false`, leaving the segment untouched, when the position is
    /// unchanged.
    pub fn transition_to(&self, position: DoorPosition, now: f64) -> bool {
        let changed = self.update(|record| record.transition_to(position, now));
        if changed {
            debug!(%position, now, "Door position published");
        }
        changed
    }

    /// Publish the resting position sampled at startup.
    pub fn set_initial_position(&self, position: DoorPosition) {
        self.update(|record| {
            record.set_initial_position(position);
            true
        });
    }
}

impl Drop for SharedDoorState {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Door state segment removed"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove door state segment"),
        }
    }
}

/// Read-only view of a door-state segment.
#[derive(Debug)]
pub struct DoorStateReader {
    path: PathBuf,
    file: File,
}

impl DoorStateReader {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the record currently in the segment.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Segment` if the segment is shorter than a
    /// record, or `DaemonError::Record` if it does not decode.
    pub fn read(&self) -> DaemonResult<DoorStateRecord> {
        let mut bytes = [0u8; DOOR_STATE_RECORD_SIZE];
        self.file
            .read_exact_at(&mut bytes, 0)
            .map_err(|e| DaemonError::segment(&self.path, e))?;
        Ok(DoorStateRecord::decode(&bytes)?)
    }
}

/// Decoded record plus the readings derived from it at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoorStateReport {
    #[serde(flatten)]
    pub record: DoorStateRecord,
    pub uptime_seconds: f64,
    pub seconds_since_opened: f64,
    pub seconds_since_closed: f64,
}

impl DoorStateReport {
    pub fn at(record: DoorStateRecord, now: f64) -> Self {
        Self {
            record,
            uptime_seconds: record.uptime_seconds(now),
            seconds_since_opened: record.seconds_since_opened(now),
            seconds_since_closed: record.seconds_since_closed(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn segment(dir: &TempDir) -> SharedDoorState {
        SharedDoorState::create(dir.path(), "doorstateshm", 1_700_000_000.0).unwrap()
    }

    #[test]
    fn test_create_publishes_defaults() {
        let dir = TempDir::new().unwrap();
        let state = segment(&dir);

        let bytes = std::fs::read(state.path()).unwrap();
        assert_eq!(bytes.len(), DOOR_STATE_RECORD_SIZE);

        let record = SharedDoorState::open_read_only(dir.path(), "doorstateshm")
            .unwrap()
            .read()
            .unwrap();
        assert_eq!(record, DoorStateRecord::new(1_700_000_000.0));
        assert_eq!(record.position, DoorPosition::Unknown);
    }

    #[test]
    fn test_reader_sees_every_mutation() {
        let dir = TempDir::new().unwrap();
        let state = segment(&dir);
        let reader = SharedDoorState::open_read_only(dir.path(), "doorstateshm").unwrap();

        state.set_initial_position(DoorPosition::Closed);
        state.record_authorized();
        state.record_unauthorized();
        state.record_unauthorized();
        assert!(state.transition_to(DoorPosition::Open, 1_700_000_010.0));

        let record = reader.read().unwrap();
        assert_eq!(record, state.snapshot());
        assert_eq!(record.authorized_scans, 1);
        assert_eq!(record.unauthorized_scans, 2);
        assert_eq!(record.position, DoorPosition::Open);
        assert_eq!(record.door_open_time, 1_700_000_010.0);
        assert_eq!(record.door_close_time, -1.0);
    }

    #[test]
    fn test_repeated_position_is_not_restamped() {
        let dir = TempDir::new().unwrap();
        let state = segment(&dir);

        assert!(state.transition_to(DoorPosition::Open, 10.0));
        assert!(!state.transition_to(DoorPosition::Open, 11.0));

        assert_eq!(state.snapshot().door_open_time, 10.0);
    }

    #[test]
    fn test_initial_position_stamps_nothing() {
        let dir = TempDir::new().unwrap();
        let state = segment(&dir);

        state.set_initial_position(DoorPosition::Closed);

        let record = state.snapshot();
        assert_eq!(record.position, DoorPosition::Closed);
        assert_eq!(record.door_close_time, -1.0);
    }

    #[test]
    fn test_drop_removes_segment() {
        let dir = TempDir::new().unwrap();
        let path = {
            let state = segment(&dir);
            state.path().to_path_buf()
        };

        assert!(!path.exists());
        assert!(SharedDoorState::open_read_only(dir.path(), "doorstateshm").is_err());
    }

    #[test]
    fn test_reader_rejects_short_segment() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("short"), [0u8; 12]).unwrap();

        let reader = SharedDoorState::open_read_only(dir.path(), "short").unwrap();
        assert!(matches!(reader.read(), Err(DaemonError::Segment { .. })));
    }

    #[test]
    fn test_report_derives_readings() {
        let dir = TempDir::new().unwrap();
        let state = segment(&dir);
        state.transition_to(DoorPosition::Open, 1_700_000_030.0);

        let report = DoorStateReport::at(state.snapshot(), 1_700_000_100.0);
        assert_eq!(report.uptime_seconds, 100.0);
        assert_eq!(report.seconds_since_opened, 70.0);
        assert_eq!(report.seconds_since_closed, -1.0);

        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["position"], "open");
        assert_eq!(json["authorized_scans"], 0);
        assert_eq!(json["seconds_since_opened"], 70.0);
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let result = SharedDoorState::create("/nonexistent/shm", "doorstateshm", 0.0);
        assert!(matches!(result, Err(DaemonError::Segment { .. })));
    }
}
