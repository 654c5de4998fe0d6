//! Out-of-band remote unlock over `SIGUSR1`.
//!
//! The signal listener does nothing but post a trigger into a dedicated
//! single-slot mailbox; the unlock itself runs on
//! [`RemoteUnlockWorker`](crate::worker::RemoteUnlockWorker). Signals that
//! arrive while an unlock is pending coalesce into one.

use std::sync::Arc;

use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::info;

use crate::error::{DaemonError, DaemonResult};
use crate::mailbox::Mailbox;

/// Installed `SIGUSR1` listener.
pub struct RemoteUnlockTrigger {
    signal: Signal,
    triggers: Arc<Mailbox<()>>,
}

impl RemoteUnlockTrigger {
    /// Register the `SIGUSR1` handler.
    ///
    /// From this point the signal no longer terminates the process.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Signal` if the handler cannot be registered.
    pub fn install(triggers: Arc<Mailbox<()>>) -> DaemonResult<Self> {
        let signal = signal(SignalKind::user_defined1()).map_err(DaemonError::Signal)?;
        Ok(Self { signal, triggers })
    }

    /// Forward every received signal to the trigger mailbox.
    pub async fn run(mut self) {
        while self.signal.recv().await.is_some() {
            info!("Remote unlock signal received");
            self.triggers.post(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigusr1_posts_trigger() {
        let triggers = Arc::new(Mailbox::new());
        let trigger = RemoteUnlockTrigger::install(Arc::clone(&triggers)).unwrap();
        tokio::spawn(trigger.run());

        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(2), triggers.recv())
            .await
            .unwrap();
    }
}
