//! Door strike control.
//!
//! [`DoorActuator::unlock`] energizes the strike, counts the unlock in the
//! shared door state, holds for a fixed duration and de-energizes again.
//! Unlocks from every source (fob, remote trigger) pass through one FIFO
//! gate, so a second request waits and its hold starts only after the
//! previous hold has ended. The output level itself sits behind a separate
//! short-lived lock, which lets the contact monitor force a relock while a
//! hold is in progress.
//!
//! Each energized hold gets a new generation number. A delayed relock
//! carries the generation it was scheduled for and does nothing once a later
//! hold has taken over the strike.
//!
//! Output failures are logged and otherwise ignored: the strike has no
//! acknowledgement channel to retry against.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use latchkey_core::UnlockReason;
use latchkey_hardware::{DeviceInfo, StrikeOutput};
use tracing::{debug, info, warn};

use crate::shared_state::SharedDoorState;

/// Serialized owner of the strike output.
pub struct DoorActuator<S> {
    output: Mutex<S>,
    gate: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    state: Arc<SharedDoorState>,
    hold: Duration,
}

/// De-energizes the strike when an unlock ends, including when the unlock
/// future is dropped mid-hold.
struct HoldGuard<'a, S: StrikeOutput> {
    actuator: &'a DoorActuator<S>,
}

impl<S: StrikeOutput> Drop for HoldGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.actuator.output().deenergize() {
            warn!(error = %e, "Failed to de-energize strike");
        }
    }
}

impl<S: StrikeOutput> DoorActuator<S> {
    pub fn new(strike: S, state: Arc<SharedDoorState>, hold: Duration) -> Self {
        info!(strike = %strike.info(), hold_ms = hold.as_millis() as u64, "Door actuator ready");
        Self {
            output: Mutex::new(strike),
            gate: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            state,
            hold,
        }
    }

    fn output(&self) -> MutexGuard<'_, S> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Energize the strike for one hold period.
    ///
    /// Waits for any unlock already in progress to finish first.
    pub async fn unlock(&self, reason: UnlockReason) {
        let _gate = self.gate.lock().await;
        info!(%reason, "Unlocking door");

        {
            let mut output = self.output();
            self.generation.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = output.energize() {
                warn!(%reason, error = %e, "Failed to energize strike");
            }
        }
        let guard = HoldGuard { actuator: self };
        self.state.record_authorized();

        tokio::time::sleep(self.hold).await;

        drop(guard);
        debug!(%reason, "Door relocked after hold");
    }

    /// De-energize the strike immediately, outside the unlock gate.
    ///
    /// Returns `true` if the strike was energized.
    pub fn relock(&self, context: &str) -> bool {
        let mut output = self.output();
        if !output.is_energized() {
            return false;
        }

        match output.deenergize() {
            Ok(()) => info!(context, "Strike force-relocked"),
            Err(e) => warn!(context, error = %e, "Failed to force-relock strike"),
        }
        true
    }

    /// Force-relock only if the hold started as `generation` is still the
    /// latest one.
    ///
    /// Returns `true` if the strike was de-energized.
    pub fn relock_generation(&self, generation: u64, context: &str) -> bool {
        let mut output = self.output();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(context, generation, "Relock skipped, a newer unlock owns the strike");
            return false;
        }
        if !output.is_energized() {
            return false;
        }

        match output.deenergize() {
            Ok(()) => info!(context, generation, "Strike force-relocked"),
            Err(e) => warn!(context, error = %e, "Failed to force-relock strike"),
        }
        true
    }

    /// Number of the most recent hold; bumped each time an unlock energizes
    /// the strike.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether the strike output is currently energized.
    pub fn is_energized(&self) -> bool {
        self.output().is_energized()
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    pub fn strike_info(&self) -> DeviceInfo {
        self.output().info()
    }

    pub fn state(&self) -> &Arc<SharedDoorState> {
        &self.state
    }
}
