//! Authorization workers.
//!
//! [`ScanWorker`] drains the scan mailbox: each fob is resolved and either
//! unlocks the door or is counted as unauthorized. [`RemoteUnlockWorker`]
//! drains the remote-trigger mailbox and unlocks without authorization.
//! Both go through the same [`DoorActuator`] gate.
//!
//! A panic while handling one scan is caught and logged, and the worker
//! goes back to waiting; one bad scan never stops the pipeline.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use latchkey_core::{FobId, UnlockReason};
use latchkey_hardware::StrikeOutput;
use latchkey_network::AuthorityClient;
use latchkey_storage::AuthorizationResolver;
use tracing::{error, info};

use crate::actuator::DoorActuator;
use crate::mailbox::Mailbox;

/// Consumer side of the scan mailbox.
pub struct ScanWorker<A, S> {
    scans: Arc<Mailbox<FobId>>,
    resolver: AuthorizationResolver<A>,
    actuator: Arc<DoorActuator<S>>,
}

impl<A, S> ScanWorker<A, S>
where
    A: AuthorityClient,
    S: StrikeOutput,
{
    pub fn new(
        scans: Arc<Mailbox<FobId>>,
        resolver: AuthorizationResolver<A>,
        actuator: Arc<DoorActuator<S>>,
    ) -> Self {
        Self {
            scans,
            resolver,
            actuator,
        }
    }

    /// Process scans forever.
    pub async fn run(mut self) {
        loop {
            let fob = self.scans.recv().await;

            let handled = AssertUnwindSafe(self.handle(&fob)).catch_unwind().await;
            if let Err(panic) = handled {
                error!(%fob, panic = panic_message(panic.as_ref()), "Scan handling panicked");
            }
        }
    }

    /// Resolve one fob and act on the decision.
    pub async fn handle(&mut self, fob: &FobId) {
        let decision = self.resolver.resolve(fob).await;

        if decision.authorized {
            info!(%fob, source = %decision.source, "Access granted");
            self.actuator.unlock(UnlockReason::Fob(fob.clone())).await;
        } else {
            info!(%fob, source = %decision.source, "Access denied");
            self.actuator.state().record_unauthorized();
        }
    }
}

/// Consumer side of the remote-trigger mailbox.
pub struct RemoteUnlockWorker<S> {
    triggers: Arc<Mailbox<()>>,
    actuator: Arc<DoorActuator<S>>,
}

impl<S: StrikeOutput> RemoteUnlockWorker<S> {
    pub fn new(triggers: Arc<Mailbox<()>>, actuator: Arc<DoorActuator<S>>) -> Self {
        Self { triggers, actuator }
    }

    /// Unlock once per received trigger, forever.
    pub async fn run(self) {
        loop {
            self.triggers.recv().await;
            info!("Remote unlock");
            self.actuator.unlock(UnlockReason::Remote).await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_state::SharedDoorState;
    use latchkey_hardware::mock::{MockStrike, MockStrikeHandle};
    use latchkey_network::{AuthorityError, AuthorizedSet};
    use latchkey_storage::CredentialCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    const HOLD: Duration = Duration::from_secs(5);

    /// Authority that grants a fixed set, and panics on one poisoned fob.
    struct FixedAuthority {
        granted: AuthorizedSet,
        poison: Option<FobId>,
        calls: Arc<AtomicUsize>,
    }

    impl AuthorityClient for FixedAuthority {
        async fn fetch_authorized(&self, fob: &FobId) -> Result<AuthorizedSet, AuthorityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.poison.as_ref() == Some(fob) {
                panic!("authority blew up");
            }
            Ok(self.granted.clone())
        }
    }

    fn fob(raw: &str) -> FobId {
        FobId::from_scan(raw).unwrap()
    }

    struct Rig {
        _dir: TempDir,
        scans: Arc<Mailbox<FobId>>,
        actuator: Arc<DoorActuator<MockStrike>>,
        strike: MockStrikeHandle,
        calls: Arc<AtomicUsize>,
    }

    fn rig(granted: &[&str], poison: Option<&str>) -> (Rig, ScanWorker<FixedAuthority, MockStrike>) {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(SharedDoorState::create(dir.path(), "door", 0.0).unwrap());
        let (strike, strike_handle) = MockStrike::new();
        let actuator = Arc::new(DoorActuator::new(strike, state, HOLD));
        let calls = Arc::new(AtomicUsize::new(0));
        let authority = FixedAuthority {
            granted: granted.iter().map(|r| fob(r)).collect(),
            poison: poison.map(fob),
            calls: Arc::clone(&calls),
        };
        let resolver =
            AuthorizationResolver::new(authority, CredentialCache::load(dir.path().join("cache.json")));
        let scans = Arc::new(Mailbox::new());
        let worker = ScanWorker::new(Arc::clone(&scans), resolver, Arc::clone(&actuator));

        (
            Rig {
                _dir: dir,
                scans,
                actuator,
                strike: strike_handle,
                calls,
            },
            worker,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorized_scan_pulses_strike() {
        let (rig, mut worker) = rig(&["1234567"], None);

        worker.handle(&fob("1234567")).await;

        assert_eq!(rig.strike.pulse_count(), 1);
        let record = rig.actuator.state().snapshot();
        assert_eq!(record.authorized_scans, 1);
        assert_eq!(record.unauthorized_scans, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_scan_is_counted() {
        let (rig, mut worker) = rig(&["1234567"], None);

        worker.handle(&fob("9999999")).await;

        assert_eq!(rig.strike.pulse_count(), 0);
        assert_eq!(rig.actuator.state().snapshot().unauthorized_scans, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_during_unlock_collapses_to_latest() {
        let (rig, worker) = rig(&["1"], None);
        tokio::spawn(worker.run());

        rig.scans.post(fob("1"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Worker is holding the strike; these three collapse into the last
        rig.scans.post(fob("7"));
        rig.scans.post(fob("8"));
        rig.scans.post(fob("9"));
        tokio::time::sleep(HOLD * 2).await;

        assert_eq!(rig.calls.load(Ordering::SeqCst), 2);
        let record = rig.actuator.state().snapshot();
        assert_eq!(record.authorized_scans, 1);
        assert_eq!(record.unauthorized_scans, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_survives_panicking_scan() {
        let (rig, worker) = rig(&["2"], Some("1"));
        tokio::spawn(worker.run());

        rig.scans.post(fob("1"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        rig.scans.post(fob("2"));
        tokio::time::sleep(HOLD * 2).await;

        assert_eq!(rig.calls.load(Ordering::SeqCst), 2);
        assert_eq!(rig.strike.pulse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_worker_unlocks_without_authorization() {
        let (rig, _worker) = rig(&[], None);
        let triggers = Arc::new(Mailbox::new());
        tokio::spawn(RemoteUnlockWorker::new(Arc::clone(&triggers), Arc::clone(&rig.actuator)).run());

        triggers.post(());
        tokio::time::sleep(HOLD * 2).await;

        assert_eq!(rig.strike.pulse_count(), 1);
        assert_eq!(rig.calls.load(Ordering::SeqCst), 0);
        assert_eq!(rig.actuator.state().snapshot().authorized_scans, 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
