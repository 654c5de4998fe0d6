//! latchkey binary.
//!
//! `latchkey run` starts the door daemon; `latchkey inspect` decodes the
//! door-state segment of a running daemon and prints it as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use latchkey_core::wall_clock_seconds;
use latchkey_daemon::config::{RunArgs, SegmentArgs};
use latchkey_daemon::scanner::ScannerProcess;
use latchkey_daemon::{Cli, Command, Daemon, DaemonConfig, DoorStateReport, SharedDoorState};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Inspect(args) => inspect(&args),
    }
}

/// `RUST_LOG` wins; otherwise `-v` steps the default up from `info`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: RunArgs) -> Result<()> {
    let config = DaemonConfig::from_args(args)?;
    info!(
        version = latchkey_core::VERSION,
        zone = %config.zone,
        endpoint = %config.endpoint,
        cache = %config.cache_file.display(),
        "Starting latchkey"
    );

    let mut daemon = Daemon::from_config(&config).context("failed to initialize daemon")?;
    daemon
        .listen_for_remote_unlock()
        .context("failed to install remote unlock handler")?;
    let (scanner, scanner_output) =
        ScannerProcess::spawn(&config.scanner).context("failed to start scanner")?;

    let mut handle = daemon.start(scanner_output);

    let mut sigterm = signal(SignalKind::terminate()).context("failed to register SIGTERM")?;

    let outcome = tokio::select! {
        result = handle.wait() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            Ok(())
        }
    };

    handle.shutdown().await;
    drop(scanner);

    outcome.context("daemon stopped unexpectedly")
}

fn inspect(args: &SegmentArgs) -> Result<()> {
    let reader = SharedDoorState::open_read_only(&args.shm_dir, &args.shm_name)
        .context("is the daemon running?")?;
    let report = DoorStateReport::at(reader.read()?, wall_clock_seconds());

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
