//! Debounced door contact watcher.
//!
//! The monitor samples the sensor once at startup to learn the resting
//! position, then follows its edges. An edge arriving within the debounce
//! window of the previous accepted edge is bounce and is dropped, and an
//! edge that settles on the position already published is dropped too, so
//! open and close times only move on real transitions.
//!
//! When the door opens while the strike is still energized and an
//! auto-relock delay is configured, the strike is de-energized once the
//! delay expires. Closing the door first cancels the pending relock, and a
//! relock never cuts short a later unlock that energized the strike again.
//!
//! A sensor that fails, at startup or later, leaves the monitor inert: the
//! failure is logged, the last published position stays in place and the
//! rest of the daemon keeps running.

use std::sync::Arc;
use std::time::Duration;

use latchkey_core::{DoorPosition, wall_clock_seconds};
use latchkey_hardware::{ContactSensor, StrikeOutput};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::actuator::DoorActuator;
use crate::error::DaemonResult;

/// Follows a contact sensor and publishes door transitions.
pub struct ContactMonitor<C, S> {
    sensor: C,
    actuator: Arc<DoorActuator<S>>,
    debounce: Duration,
    relock_after: Option<Duration>,
}

impl<C, S> ContactMonitor<C, S>
where
    C: ContactSensor,
    S: StrikeOutput + 'static,
{
    pub fn new(sensor: C, actuator: Arc<DoorActuator<S>>, debounce: Duration) -> Self {
        Self {
            sensor,
            actuator,
            debounce,
            relock_after: None,
        }
    }

    /// Force-relock the strike this long after the door opens.
    pub fn with_relock_after(mut self, relock_after: Option<Duration>) -> Self {
        self.relock_after = relock_after;
        self
    }

    /// Watch the sensor for the life of the daemon.
    ///
    /// Never returns: once the sensor fails the monitor parks.
    pub async fn run(mut self) {
        if let Err(e) = self.follow().await {
            warn!(error = %e, "Contact sensor failed, door position no longer tracked");
        }
        std::future::pending::<()>().await;
    }

    async fn follow(&mut self) -> DaemonResult<()> {
        let state = Arc::clone(self.actuator.state());

        let mut position = self.sensor.read_level().await?.door_position();
        state.set_initial_position(position);
        info!(%position, "Contact monitor started");

        let mut last_edge: Option<Instant> = None;
        let mut pending_relock: Option<JoinHandle<()>> = None;

        loop {
            let level = self.sensor.wait_for_edge().await?;
            let now = Instant::now();

            if last_edge.is_some_and(|previous| now.duration_since(previous) < self.debounce) {
                trace!(?level, "Contact bounce ignored");
                continue;
            }
            last_edge = Some(now);

            let observed = level.door_position();
            if observed == position {
                trace!(%observed, "Contact edge without position change");
                continue;
            }
            position = observed;
            state.transition_to(observed, wall_clock_seconds());

            match observed {
                DoorPosition::Open => {
                    info!("Door opened");
                    if let Some(delay) = self.relock_after
                        && self.actuator.is_energized()
                    {
                        debug!(delay_ms = delay.as_millis() as u64, "Scheduling auto-relock");
                        if let Some(task) = pending_relock.replace(self.schedule_relock(delay)) {
                            task.abort();
                        }
                    }
                }
                DoorPosition::Closed => {
                    info!("Door closed");
                    if let Some(task) = pending_relock.take() {
                        task.abort();
                    }
                }
                DoorPosition::Unknown => {}
            }
        }
    }

    fn schedule_relock(&self, delay: Duration) -> JoinHandle<()> {
        let actuator = Arc::clone(&self.actuator);
        let generation = actuator.generation();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            actuator.relock_generation(generation, "door left open");
        })
    }
}
