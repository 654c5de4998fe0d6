//! Daemon context and task supervision.
//!
//! # Architecture
//!
//! ```text
//!  scanner stdout ──► ingest ──► Mailbox<FobId> ──► ScanWorker ──► Resolver
//!                                                        │
//!  SIGUSR1 ──► RemoteUnlockTrigger ──► Mailbox<()> ──► RemoteUnlockWorker
//!                                                        │
//!                                                        ▼
//!                                                  DoorActuator ──► strike
//!                                                        │
//!  contact sensor ──► ContactMonitor ───────────────────►│
//!                                                        ▼
//!                                                 SharedDoorState ──► segment
//! ```
//!
//! [`Daemon`] owns every component, built once at startup. [`Daemon::start`]
//! moves each long-lived loop into its own task and returns a
//! [`DaemonHandle`] used to wait for the first task to end and to shut the
//! rest down.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use latchkey_core::{FobId, wall_clock_seconds};
use latchkey_hardware::noop::NoopStrike;
use latchkey_hardware::sysfs::{SysfsContactSensor, SysfsStrike};
use latchkey_hardware::{AnyContactSensor, AnyStrikeOutput, ContactSensor, StrikeOutput};
use latchkey_network::{AuthorityClient, HttpAuthority, HttpAuthorityConfig};
use latchkey_storage::{AuthorizationResolver, CredentialCache};
use tokio::io::AsyncRead;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::actuator::DoorActuator;
use crate::config::DaemonConfig;
use crate::contact::ContactMonitor;
use crate::error::{DaemonError, DaemonResult};
use crate::mailbox::Mailbox;
use crate::remote::RemoteUnlockTrigger;
use crate::scanner;
use crate::shared_state::SharedDoorState;
use crate::worker::{RemoteUnlockWorker, ScanWorker};

/// Every component of a running door, wired together.
pub struct Daemon<A, S, C> {
    actuator: Arc<DoorActuator<S>>,
    resolver: AuthorizationResolver<A>,
    contact: Option<ContactMonitor<C, S>>,
    scans: Arc<Mailbox<FobId>>,
    triggers: Arc<Mailbox<()>>,
    remote_signal: Option<RemoteUnlockTrigger>,
}

impl Daemon<HttpAuthority, AnyStrikeOutput, AnyContactSensor> {
    /// Build the production daemon from `config`.
    ///
    /// A strike line that cannot be opened falls back to the no-op strike
    /// and a contact line that cannot be opened leaves the monitor inert;
    /// both are logged and neither is fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared segment or the HTTP client cannot be
    /// created.
    pub fn from_config(config: &DaemonConfig) -> DaemonResult<Self> {
        let state = Arc::new(SharedDoorState::create(
            &config.shm_dir,
            &config.shm_name,
            wall_clock_seconds(),
        )?);

        let authority = HttpAuthority::new(HttpAuthorityConfig::new(
            config.endpoint.as_str(),
            config.token.as_str(),
            config.zone.as_str(),
        ))?;
        let cache = CredentialCache::load(&config.cache_file);

        let strike = open_strike(config);
        let mut daemon = Self::new(
            state,
            strike,
            AuthorizationResolver::new(authority, cache),
            config.hold,
        );

        if let Some(sensor) = open_contact_sensor(config) {
            daemon = daemon.with_contact_sensor(sensor, config.debounce, config.relock_after);
        }
        Ok(daemon)
    }
}

fn open_strike(config: &DaemonConfig) -> AnyStrikeOutput {
    let Some(pin) = config.strike_pin else {
        info!("Strike output disabled");
        return AnyStrikeOutput::Noop(NoopStrike::new());
    };

    match SysfsStrike::open(&config.gpio_root, pin) {
        Ok(strike) => AnyStrikeOutput::Sysfs(strike),
        Err(e) => {
            warn!(pin, error = %e, "Strike GPIO unavailable, continuing without strike output");
            AnyStrikeOutput::Noop(NoopStrike::new())
        }
    }
}

fn open_contact_sensor(config: &DaemonConfig) -> Option<AnyContactSensor> {
    let pin = config.contact_pin?;

    match SysfsContactSensor::open(&config.gpio_root, pin) {
        Ok(sensor) => Some(AnyContactSensor::Sysfs(sensor)),
        Err(e) => {
            warn!(pin, error = %e, "Contact sensor unavailable, door position stays unknown");
            None
        }
    }
}

impl<A, S, C> Daemon<A, S, C>
where
    A: AuthorityClient + 'static,
    S: StrikeOutput + 'static,
    C: ContactSensor + 'static,
{
    pub fn new(
        state: Arc<SharedDoorState>,
        strike: S,
        resolver: AuthorizationResolver<A>,
        hold: Duration,
    ) -> Self {
        Self {
            actuator: Arc::new(DoorActuator::new(strike, state, hold)),
            resolver,
            contact: None,
            scans: Arc::new(Mailbox::new()),
            triggers: Arc::new(Mailbox::new()),
            remote_signal: None,
        }
    }

    /// Follow a contact sensor; without one the door position stays unknown.
    pub fn with_contact_sensor(
        mut self,
        sensor: C,
        debounce: Duration,
        relock_after: Option<Duration>,
    ) -> Self {
        let monitor = ContactMonitor::new(sensor, Arc::clone(&self.actuator), debounce)
            .with_relock_after(relock_after);
        self.contact = Some(monitor);
        self
    }

    /// Take over `SIGUSR1` as the remote unlock trigger.
    ///
    /// The handler is registered immediately, so a signal that arrives
    /// before [`Daemon::start`] is queued rather than terminating the
    /// process. It is acted on once the daemon has started.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Signal` if the handler cannot be installed.
    pub fn listen_for_remote_unlock(&mut self) -> DaemonResult<()> {
        self.remote_signal = Some(RemoteUnlockTrigger::install(Arc::clone(&self.triggers))?);
        Ok(())
    }

    pub fn actuator(&self) -> &Arc<DoorActuator<S>> {
        &self.actuator
    }

    /// Spawn every loop, reading scans from `scanner_output`.
    pub fn start<R>(self, scanner_output: R) -> DaemonHandle<S>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut handle = DaemonHandle {
            tasks: JoinSet::new(),
            actuator: Arc::clone(&self.actuator),
            scans: Arc::clone(&self.scans),
            triggers: Arc::clone(&self.triggers),
        };

        let scans = Arc::clone(&self.scans);
        handle.spawn("scan ingestion", async move {
            scanner::ingest(scanner_output, &scans).await
        });

        let worker = ScanWorker::new(
            Arc::clone(&self.scans),
            self.resolver,
            Arc::clone(&self.actuator),
        );
        handle.spawn("scan worker", async move {
            worker.run().await;
            Ok(())
        });

        let remote = RemoteUnlockWorker::new(Arc::clone(&self.triggers), Arc::clone(&self.actuator));
        handle.spawn("remote unlock worker", async move {
            remote.run().await;
            Ok(())
        });

        if let Some(trigger) = self.remote_signal {
            handle.spawn("remote unlock signal", async move {
                trigger.run().await;
                Ok(())
            });
        }

        match self.contact {
            Some(monitor) => handle.spawn("contact monitor", async move {
                monitor.run().await;
                Ok(())
            }),
            None => info!("No contact sensor configured"),
        }

        info!(strike = %self.actuator.strike_info(), "Daemon started");
        handle
    }
}

/// How a supervised task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTermination {
    /// Task returned `Ok`.
    Success,
    /// Task returned an error.
    Error,
    /// Task was aborted (expected during shutdown).
    Cancelled,
    /// Task panicked.
    Panic,
}

impl TaskTermination {
    fn classify(result: &Result<TaskOutcome, JoinError>) -> Self {
        match result {
            Ok((_, Ok(()))) => Self::Success,
            Ok((_, Err(DaemonError::TaskPanicked(_)))) => Self::Panic,
            Ok((_, Err(_))) => Self::Error,
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Panic,
        }
    }
}

/// Name of a finished task and what it returned.
type TaskOutcome = (&'static str, DaemonResult<()>);

/// Counts of task outcomes collected during shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

/// Running daemon.
pub struct DaemonHandle<S> {
    tasks: JoinSet<TaskOutcome>,
    actuator: Arc<DoorActuator<S>>,
    scans: Arc<Mailbox<FobId>>,
    triggers: Arc<Mailbox<()>>,
}

impl<S: StrikeOutput + 'static> DaemonHandle<S> {
    fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = DaemonResult<()>> + Send + 'static,
    {
        self.tasks.spawn(async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(DaemonError::TaskPanicked(name.to_string())));
            (name, outcome)
        });
        debug!(task = name, "Task spawned");
    }

    /// Mailbox the scan worker drains.
    pub fn scans(&self) -> &Arc<Mailbox<FobId>> {
        &self.scans
    }

    /// Mailbox the remote unlock worker drains.
    pub fn remote_triggers(&self) -> &Arc<Mailbox<()>> {
        &self.triggers
    }

    pub fn actuator(&self) -> &Arc<DoorActuator<S>> {
        &self.actuator
    }

    /// Wait until any task ends and report why.
    ///
    /// Returns `Ok(())` if there are no tasks or the task finished cleanly.
    ///
    /// # Errors
    ///
    /// Returns the task's error, or `DaemonError::TaskPanicked` if it
    /// panicked.
    pub async fn wait(&mut self) -> DaemonResult<()> {
        let Some(result) = self.tasks.join_next().await else {
            return Ok(());
        };

        match result {
            Ok((task, outcome)) => {
                match &outcome {
                    Ok(()) => info!(task, "Task finished"),
                    Err(e) => error!(task, error = %e, "Task failed"),
                }
                outcome
            }
            Err(e) => {
                error!(error = %e, "Task ended abnormally");
                Err(DaemonError::TaskPanicked("unknown".into()))
            }
        }
    }

    /// Stop every task, then force the strike off.
    ///
    /// The shared segment is removed once the last component holding it is
    /// dropped, which happens when this handle goes away.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.tasks.abort_all();

        let mut report = ShutdownReport::default();
        while let Some(result) = self.tasks.join_next().await {
            match TaskTermination::classify(&result) {
                TaskTermination::Success => report.succeeded += 1,
                TaskTermination::Error => report.failed += 1,
                TaskTermination::Cancelled => report.cancelled += 1,
                TaskTermination::Panic => report.panicked += 1,
            }
        }

        self.actuator.relock("shutdown");
        info!(
            cancelled = report.cancelled,
            failed = report.failed,
            panicked = report.panicked,
            "Daemon stopped"
        );
        report
    }
}
