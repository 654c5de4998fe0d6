//! End-to-end daemon tests
//!
//! A full daemon is wired from mock hardware, a scripted authority and an
//! in-memory scanner pipe, then driven on a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use latchkey_core::{DoorPosition, FobId};
use latchkey_daemon::{Daemon, DaemonError, DaemonHandle, SharedDoorState};
use latchkey_hardware::mock::{
    MockContactHandle, MockContactSensor, MockStrike, MockStrikeHandle, StrikeEvent,
};
use latchkey_hardware::ContactLevel;
use latchkey_network::{AuthorityClient, AuthorityError, AuthorizedSet};
use latchkey_storage::{AuthorizationResolver, CredentialCache};
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, DuplexStream};

const HOLD: Duration = Duration::from_secs(5);

/// Authority that answers with whatever set the test currently holds, or
/// fails when the set is `None`.
#[derive(Clone, Default)]
struct SwitchableAuthority {
    current: Arc<Mutex<Option<AuthorizedSet>>>,
}

impl SwitchableAuthority {
    fn answer(&self, fobs: &[&str]) {
        *self.current.lock().unwrap() = Some(fobs.iter().map(|f| fob(f)).collect());
    }

    fn go_offline(&self) {
        *self.current.lock().unwrap() = None;
    }
}

impl AuthorityClient for SwitchableAuthority {
    async fn fetch_authorized(&self, _fob: &FobId) -> Result<AuthorizedSet, AuthorityError> {
        let current = self.current.lock().unwrap().clone();
        current.ok_or(AuthorityError::Timeout(2000))
    }
}

fn fob(raw: &str) -> FobId {
    FobId::from_scan(raw).unwrap()
}

struct Door {
    dir: TempDir,
    authority: SwitchableAuthority,
    strike: MockStrikeHandle,
    contact: MockContactHandle,
    scanner: DuplexStream,
    handle: DaemonHandle<MockStrike>,
}

impl Door {
    fn start() -> Self {
        Self::start_with_cache(None)
    }

    /// Start a daemon whose cache file already holds `seed`.
    fn start_with_cache(seed: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        if let Some(seed) = seed {
            std::fs::write(dir.path().join("authorized-fob-cache.json"), seed).unwrap();
        }
        let state = Arc::new(SharedDoorState::create(dir.path(), "doorstateshm", 1_000.0).unwrap());
        let authority = SwitchableAuthority::default();
        let cache = CredentialCache::load(dir.path().join("authorized-fob-cache.json"));
        let (strike, strike_handle) = MockStrike::new();
        let (sensor, contact) = MockContactSensor::new(ContactLevel::Pressed);
        let (scanner, scanner_output) = tokio::io::duplex(1024);

        let handle = Daemon::new(
            state,
            strike,
            AuthorizationResolver::new(authority.clone(), cache),
            HOLD,
        )
        .with_contact_sensor(sensor, Duration::from_millis(100), None)
        .start(scanner_output);

        Self {
            dir,
            authority,
            strike: strike_handle,
            contact,
            scanner,
            handle,
        }
    }

    async fn scan(&mut self, line: &str) {
        self.scanner
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    fn cache_file(&self) -> std::path::PathBuf {
        self.dir.path().join("authorized-fob-cache.json")
    }

    fn published(&self) -> latchkey_core::DoorStateRecord {
        SharedDoorState::open_read_only(self.dir.path(), "doorstateshm")
            .unwrap()
            .read()
            .unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_scan_with_empty_cache_unlocks_and_persists() {
    let mut door = Door::start();
    door.authority.answer(&["0001234567"]);
    assert!(!door.cache_file().exists());

    door.scan("1234567").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(door.strike.is_energized());

    tokio::time::sleep(HOLD).await;
    assert!(!door.strike.is_energized());
    assert_eq!(door.strike.pulse_count(), 1);

    let saved: Vec<String> =
        serde_json::from_slice(&std::fs::read(door.cache_file()).unwrap()).unwrap();
    assert_eq!(saved, vec!["0001234567".to_string()]);
    assert_eq!(door.published().authorized_scans, 1);
}

#[tokio::test(start_paused = true)]
async fn test_offline_scan_of_unknown_fob_is_denied() {
    let mut door = Door::start_with_cache(Some(r#"["0001234567"]"#));
    door.authority.go_offline();
    let before = std::fs::read(door.cache_file()).unwrap();

    door.scan("0009999999").await;
    tokio::time::sleep(HOLD * 2).await;
    assert_eq!(door.strike.pulse_count(), 0);
    assert_eq!(door.published().unauthorized_scans, 1);

    door.scan("0001234567").await;
    tokio::time::sleep(HOLD * 2).await;
    assert_eq!(door.strike.pulse_count(), 1);

    assert_eq!(std::fs::read(door.cache_file()).unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn test_remote_unlock_queues_behind_fob_unlock() {
    let mut door = Door::start();
    door.authority.answer(&["1"]);

    door.scan("1").await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(door.strike.is_energized());

    door.handle.remote_triggers().post(());
    tokio::time::sleep(HOLD * 3).await;

    let events = door.strike.events();
    let [
        StrikeEvent::Energized(on1),
        StrikeEvent::Deenergized(off1),
        StrikeEvent::Energized(on2),
        StrikeEvent::Deenergized(off2),
    ] = events.as_slice()
    else {
        panic!("unexpected strike events: {events:?}");
    };
    assert!(on2 >= off1);
    assert_eq!(*off1 - *on1, HOLD);
    assert_eq!(*off2 - *on2, HOLD);
    assert_eq!(door.published().authorized_scans, 2);
}

#[tokio::test(start_paused = true)]
async fn test_contact_transitions_are_published() {
    let door = Door::start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(door.published().position, DoorPosition::Closed);

    door.contact.release().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let opened = door.published();
    assert_eq!(opened.position, DoorPosition::Open);
    assert!(opened.door_open_time > 0.0);

    door.contact.press().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(door.published().position, DoorPosition::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_scanner_eof_stops_daemon_and_cleans_up() {
    let Door {
        dir,
        strike,
        scanner,
        mut handle,
        contact: _contact,
        ..
    } = Door::start();
    let segment = dir.path().join("doorstateshm");
    assert!(segment.exists());

    drop(scanner);
    let result = tokio::time::timeout(Duration::from_secs(1), handle.wait())
        .await
        .unwrap();
    assert!(matches!(result, Err(DaemonError::ScannerExited)));

    let report = handle.shutdown().await;
    assert_eq!(report.panicked, 0);
    assert!(report.cancelled >= 2);
    assert!(!strike.is_energized());
    assert!(!segment.exists());
}

#[tokio::test(start_paused = true)]
async fn test_contact_sensor_failure_keeps_door_working() {
    let Door {
        dir: _dir,
        authority,
        strike,
        contact,
        mut scanner,
        mut handle,
    } = Door::start();
    authority.answer(&["0001234567"]);
    tokio::time::sleep(Duration::from_millis(10)).await;

    drop(contact);
    let stopped = tokio::time::timeout(Duration::from_secs(1), handle.wait()).await;
    assert!(stopped.is_err(), "daemon stopped on sensor failure: {stopped:?}");

    scanner.write_all(b"1234567\n").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(strike.is_energized());

    tokio::time::sleep(HOLD).await;
    assert_eq!(strike.pulse_count(), 1);
    let stopped = tokio::time::timeout(Duration::from_secs(1), handle.wait()).await;
    assert!(stopped.is_err(), "daemon stopped after sensor failure: {stopped:?}");
}

#[tokio::test]
async fn test_remote_signal_before_start_is_not_lost() {
    let dir = TempDir::new().unwrap();
    let state = Arc::new(SharedDoorState::create(dir.path(), "doorstateshm", 1_000.0).unwrap());
    let cache = CredentialCache::load(dir.path().join("authorized-fob-cache.json"));
    let (strike, strike_handle) = MockStrike::new();
    let (_scanner, scanner_output) = tokio::io::duplex(64);

    let mut daemon: Daemon<_, _, MockContactSensor> = Daemon::new(
        state,
        strike,
        AuthorizationResolver::new(SwitchableAuthority::default(), cache),
        Duration::from_millis(50),
    );
    daemon.listen_for_remote_unlock().unwrap();

    let status = std::process::Command::new("kill")
        .args(["-USR1", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let handle = daemon.start(scanner_output);
    tokio::time::timeout(Duration::from_secs(2), async {
        while strike_handle.pulse_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("remote unlock never ran");

    handle.shutdown().await;
}
