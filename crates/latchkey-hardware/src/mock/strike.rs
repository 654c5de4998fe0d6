//! Mock strike output for testing and development.
//!
//! The mock records every level change with a `tokio::time::Instant`, so
//! tests running on a paused clock can assert exact hold durations and
//! check that pulses never overlap.

use crate::{
    HardwareError, Result,
    traits::StrikeOutput,
    types::DeviceInfo,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// One recorded level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeEvent {
    Energized(Instant),
    Deenergized(Instant),
}

#[derive(Debug, Default)]
struct StrikeLog {
    energized: bool,
    failing: bool,
    events: Vec<StrikeEvent>,
}

/// Mock door strike.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::MockStrike;
/// use latchkey_hardware::traits::StrikeOutput;
///
/// let (mut strike, handle) = MockStrike::new();
/// assert!(!handle.is_energized());
///
/// strike.energize().unwrap();
/// assert!(handle.is_energized());
/// ```
#[derive(Debug)]
pub struct MockStrike {
    log: Arc<Mutex<StrikeLog>>,
}

impl MockStrike {
    /// Create a new de-energized mock strike and its inspection handle.
    pub fn new() -> (Self, MockStrikeHandle) {
        let log = Arc::new(Mutex::new(StrikeLog::default()));
        (
            Self { log: Arc::clone(&log) },
            MockStrikeHandle { log },
        )
    }

    fn log(&self) -> MutexGuard<'_, StrikeLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&mut self, energized: bool) -> Result<()> {
        let mut log = self.log();
        if log.failing {
            return Err(HardwareError::output_failed(0, "mock output failure"));
        }

        let now = Instant::now();
        log.events.push(if energized {
            StrikeEvent::Energized(now)
        } else {
            StrikeEvent::Deenergized(now)
        });
        log.energized = energized;
        Ok(())
    }
}

impl StrikeOutput for MockStrike {
    fn energize(&mut self) -> Result<()> {
        self.set(true)
    }

    fn deenergize(&mut self) -> Result<()> {
        self.set(false)
    }

    fn is_energized(&self) -> bool {
        self.log().energized
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Mock strike", "mock")
    }
}

/// Handle for inspecting a mock strike from test code.
#[derive(Debug, Clone)]
pub struct MockStrikeHandle {
    log: Arc<Mutex<StrikeLog>>,
}

impl MockStrikeHandle {
    fn log(&self) -> MutexGuard<'_, StrikeLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current output level.
    pub fn is_energized(&self) -> bool {
        self.log().energized
    }

    /// All recorded level changes, oldest first.
    pub fn events(&self) -> Vec<StrikeEvent> {
        self.log().events.clone()
    }

    /// Number of times the strike was energized.
    pub fn pulse_count(&self) -> usize {
        self.log()
            .events
            .iter()
            .filter(|e| matches!(e, StrikeEvent::Energized(_)))
            .count()
    }

    /// Make every subsequent write fail, as a dead output line would.
    pub fn set_failing(&self, failing: bool) {
        self.log().failing = failing;
    }
}
