use std::path::Path;

use latchkey_hardware::HardwareError;
use latchkey_network::AuthorityError;
use thiserror::Error;

/// Errors raised while running the door daemon.
///
/// Authorization failures never appear here: the resolver turns them into a
/// cache fallback. What remains are startup failures and the end of scan
/// ingestion.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The scanner subprocess could not be started
    #[error("Failed to start scanner {command:?}: {source}")]
    ScannerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The scanner subprocess closed its output
    #[error("Scanner output ended")]
    ScannerExited,

    /// Reading scanner output failed
    #[error("Scanner read error: {0}")]
    ScannerRead(String),

    /// The shared door-state segment could not be created, written or read
    #[error("Door state segment {path}: {source}")]
    Segment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The segment content does not decode as a door-state record
    #[error("Door state record error: {0}")]
    Record(#[from] latchkey_core::Error),

    /// A hardware line could not be used
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The authorization client could not be built
    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    /// Installing an OS signal listener failed
    #[error("Signal handler error: {0}")]
    Signal(#[source] std::io::Error),

    /// A supervised task panicked
    #[error("Task {0} panicked")]
    TaskPanicked(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DaemonError {
    pub fn segment(path: &Path, source: std::io::Error) -> Self {
        Self::Segment {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
