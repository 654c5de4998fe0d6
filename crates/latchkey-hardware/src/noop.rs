//! Inert strike used when no output hardware is available.

use crate::{Result, traits::StrikeOutput, types::DeviceInfo};

/// Strike stub that only remembers the level it was asked for.
///
/// Selected when the strike line is disabled or fails to open, so the rest
/// of the daemon (authorization, counters, relock bookkeeping) keeps working.
#[derive(Debug, Default)]
pub struct NoopStrike {
    energized: bool,
}

impl NoopStrike {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StrikeOutput for NoopStrike {
    fn energize(&mut self) -> Result<()> {
        self.energized = true;
        Ok(())
    }

    fn deenergize(&mut self) -> Result<()> {
        self.energized = false;
        Ok(())
    }

    fn is_energized(&self) -> bool {
        self.energized
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Door strike", "noop")
    }
}
