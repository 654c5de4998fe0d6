//! Persisted copy of the last-known authorized set.
//!
//! The file is a JSON array of credential identifiers. It is read once at
//! startup and rewritten in full whenever a fresh authorized set differs from
//! the one held in memory. A missing or unreadable file is an empty cache,
//! never a startup failure.
//!
//! Loading happens once before the runtime is busy and reads synchronously;
//! saves run on the scan path and go through `tokio::fs`.

use std::path::{Path, PathBuf};

use latchkey_core::FobId;
use latchkey_network::AuthorizedSet;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// In-memory authorized set backed by a JSON file.
///
/// # Examples
///
/// ```no_run
/// use latchkey_storage::CredentialCache;
///
/// let cache = CredentialCache::load("/var/cache/latchkey/authorized-fob-cache.json");
/// println!("{} cached fobs", cache.len());
/// ```
#[derive(Debug, Clone)]
pub struct CredentialCache {
    path: PathBuf,
    fobs: AuthorizedSet,
}

impl CredentialCache {
    /// Load the cache from `path`.
    ///
    /// Returns an empty cache if the file is missing or its content is not a
    /// JSON array of strings.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let fobs = read_set(&path);
        Self { path, fobs }
    }

    /// Cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Currently held authorized set.
    pub fn fobs(&self) -> &AuthorizedSet {
        &self.fobs
    }

    pub fn contains(&self, fob: &FobId) -> bool {
        self.fobs.contains(fob)
    }

    pub fn len(&self) -> usize {
        self.fobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fobs.is_empty()
    }

    /// Overwrite the file with `fobs`.
    ///
    /// The parent directory is created when absent. Entries are written in
    /// sorted order so repeated saves of one set produce identical files.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory or file cannot be written.
    pub async fn save(&self, fobs: &AuthorizedSet) -> StorageResult<()> {
        let mut entries: Vec<&str> = fobs.iter().map(FobId::as_str).collect();
        entries.sort_unstable();
        let body = serde_json::to_vec(&entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }
        fs::write(&self.path, body)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;

        debug!(path = %self.path.display(), count = fobs.len(), "Saved credential cache");
        Ok(())
    }

    /// Replace the held set wholesale, persisting it first if it differs.
    ///
    /// Returns `Ok(true)` when the set changed. The in-memory copy is
    /// replaced even if the write fails, so the caller still decides against
    /// the freshest set.
    ///
    /// # Errors
    ///
    /// Returns the write error from [`CredentialCache::save`].
    pub async fn replace_if_changed(&mut self, fobs: AuthorizedSet) -> StorageResult<bool> {
        if fobs == self.fobs {
            return Ok(false);
        }

        info!(previous = self.fobs.len(), current = fobs.len(), "Authorized set changed");
        let saved = self.save(&fobs).await;
        self.fobs = fobs;
        saved.map(|()| true)
    }
}

fn read_set(path: &Path) -> AuthorizedSet {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No credential cache yet, starting empty");
            return AuthorizedSet::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read credential cache, starting empty");
            return AuthorizedSet::new();
        }
    };

    match serde_json::from_slice::<AuthorizedSet>(&raw) {
        Ok(fobs) => {
            info!(path = %path.display(), count = fobs.len(), "Loaded credential cache");
            fobs
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt credential cache, starting empty");
            AuthorizedSet::new()
        }
    }
}
