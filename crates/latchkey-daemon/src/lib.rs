//! latchkey door daemon.
//!
//! Reads credentials from a scanner subprocess, authorizes them against a
//! remote service with a cached fallback, pulses the door strike, follows
//! the door contact and publishes live door state in a shared segment.
//!
//! # Modules
//!
//! - [`mailbox`] - single-slot latest-wins hand-off
//! - [`scanner`] - scanner subprocess and line ingestion
//! - [`worker`] - scan and remote-unlock workers
//! - [`actuator`] - serialized strike control
//! - [`contact`] - debounced contact monitor with auto-relock
//! - [`shared_state`] - door-state segment writer and reader
//! - [`remote`] - `SIGUSR1` remote unlock trigger
//! - [`daemon`] - component wiring and task supervision
//! - [`config`] - command line and environment configuration

pub mod actuator;
pub mod config;
pub mod contact;
pub mod daemon;
pub mod error;
pub mod mailbox;
pub mod remote;
pub mod scanner;
pub mod shared_state;
pub mod worker;

pub use actuator::DoorActuator;
pub use config::{Cli, Command, DaemonConfig};
pub use daemon::{Daemon, DaemonHandle, ShutdownReport};
pub use error::{DaemonError, DaemonResult};
pub use mailbox::Mailbox;
pub use shared_state::{DoorStateReader, DoorStateReport, SharedDoorState};
