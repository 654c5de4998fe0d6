//! Command line and environment configuration.
//!
//! Every `run` option can also be supplied through an environment variable,
//! so a unit file can keep its settings in an `EnvironmentFile`. Flags win
//! over the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use latchkey_core::constants::{
    CACHE_DIR_NAME, CACHE_FILE_NAME, DEFAULT_CONTACT_DEBOUNCE_MS, DEFAULT_GPIO_ROOT,
    DEFAULT_SCANNER_COMMAND, DEFAULT_SHM_DIR, DEFAULT_STRIKE_PIN, DEFAULT_UNLOCK_HOLD_MS,
    DEFAULT_ZONE, DOOR_STATE_SHM_NAME,
};

use crate::error::{DaemonError, DaemonResult};

/// latchkey - RFID door controller
#[derive(Parser, Debug)]
#[command(name = "latchkey")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the door daemon
    Run(RunArgs),

    /// Print the live door state published by a running daemon as JSON
    Inspect(SegmentArgs),
}

/// Location of the shared door-state segment.
#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    /// Name of the shared door-state segment
    #[arg(long, env = "DOOR_STATE_SHM", default_value = DOOR_STATE_SHM_NAME)]
    pub shm_name: String,

    /// Directory backing named shared segments
    #[arg(long, env = "DOOR_STATE_SHM_DIR", default_value = DEFAULT_SHM_DIR)]
    pub shm_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Base URL of the authorization service
    #[arg(long, env = "GLUE_ENDPOINT")]
    pub endpoint: String,

    /// Bearer token for the authorization service
    #[arg(long, env = "GLUE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Zone reported with each authorization request
    #[arg(long, env = "ZONE", default_value = DEFAULT_ZONE)]
    pub zone: String,

    /// Scanner command; one credential per output line
    #[arg(long, env = "RFID_SCANNER", default_value = DEFAULT_SCANNER_COMMAND)]
    pub scanner: String,

    /// Credential cache file [default: <user cache dir>/latchkey/authorized-fob-cache.json]
    #[arg(long, env = "RFID_CACHE_FILE")]
    pub cache_file: Option<PathBuf>,

    /// GPIO line driving the strike relay
    #[arg(long, env = "STRIKE_PIN", default_value_t = DEFAULT_STRIKE_PIN)]
    pub strike_pin: u32,

    /// Run without a strike output
    #[arg(long)]
    pub no_strike: bool,

    /// GPIO line of the door contact sensor; without it door position stays unknown
    #[arg(long, env = "CONTACT_PIN")]
    pub contact_pin: Option<u32>,

    /// How long an unlock keeps the strike energized, in milliseconds
    #[arg(long, env = "UNLOCK_HOLD_MS", default_value_t = DEFAULT_UNLOCK_HOLD_MS)]
    pub hold_ms: u64,

    /// Contact sensor debounce window, in milliseconds
    #[arg(long, env = "CONTACT_DEBOUNCE_MS", default_value_t = DEFAULT_CONTACT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// Force the strike off this long after the door opens, in milliseconds
    #[arg(long, env = "RELOCK_AFTER_MS")]
    pub relock_after_ms: Option<u64>,

    /// Root of the sysfs GPIO interface
    #[arg(long, env = "GPIO_ROOT", default_value = DEFAULT_GPIO_ROOT)]
    pub gpio_root: PathBuf,

    #[command(flatten)]
    pub segment: SegmentArgs,
}

/// Resolved daemon settings.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub endpoint: String,
    pub token: String,
    pub zone: String,
    pub scanner: String,
    pub cache_file: PathBuf,
    /// `None` runs with the no-op strike
    pub strike_pin: Option<u32>,
    /// `None` leaves the contact monitor inert
    pub contact_pin: Option<u32>,
    pub hold: Duration,
    pub debounce: Duration,
    pub relock_after: Option<Duration>,
    pub gpio_root: PathBuf,
    pub shm_dir: PathBuf,
    pub shm_name: String,
}

impl DaemonConfig {
    /// Validate `args` and fill in derived defaults.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Config` for an unusable endpoint or token, or
    /// when no cache directory can be determined.
    pub fn from_args(args: RunArgs) -> DaemonResult<Self> {
        if !(args.endpoint.starts_with("http://") || args.endpoint.starts_with("https://")) {
            return Err(DaemonError::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                args.endpoint
            )));
        }
        if args.token.trim().is_empty() {
            return Err(DaemonError::Config("token must not be empty".into()));
        }

        let cache_file = match args.cache_file {
            Some(path) => path,
            None => default_cache_file()?,
        };

        Ok(Self {
            endpoint: args.endpoint,
            token: args.token,
            zone: args.zone,
            scanner: args.scanner,
            cache_file,
            strike_pin: (!args.no_strike).then_some(args.strike_pin),
            contact_pin: args.contact_pin,
            hold: Duration::from_millis(args.hold_ms),
            debounce: Duration::from_millis(args.debounce_ms),
            relock_after: args.relock_after_ms.map(Duration::from_millis),
            gpio_root: args.gpio_root,
            shm_dir: args.segment.shm_dir,
            shm_name: args.segment.shm_name,
        })
    }
}

/// `<user cache dir>/latchkey/authorized-fob-cache.json`
///
/// # Errors
///
/// Returns `DaemonError::Config` if the platform has no cache directory.
pub fn default_cache_file() -> DaemonResult<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME))
        .ok_or_else(|| DaemonError::Config("no cache directory; pass --cache-file".into()))
}
