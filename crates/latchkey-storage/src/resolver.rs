//! Remote-then-cache authorization.
//!
//! Every scan is reported to the authorization service, which answers with
//! the complete authorized set. That set replaces the cache and the fob is
//! checked against it. When the service cannot be reached or answers with
//! anything unusable, the fob is checked against the cached set instead and
//! the cache file is left untouched.

use std::fmt;

use latchkey_core::FobId;
use latchkey_network::{AuthorityClient, AuthorizedSet};
use tracing::{debug, warn};

use crate::cache::CredentialCache;

/// Where the set behind a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationSource {
    /// Fresh answer from the authorization service
    Remote,
    /// Cached set, used because the service call failed
    Cache,
}

impl fmt::Display for AuthorizationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Outcome of resolving one fob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    pub authorized: bool,
    pub source: AuthorizationSource,
}

/// Decides whether a fob may open the door.
///
/// Owns the [`CredentialCache`]; no other component reads or writes it.
///
/// # Examples
///
/// ```no_run
/// use latchkey_core::FobId;
/// use latchkey_network::{HttpAuthority, HttpAuthorityConfig};
/// use latchkey_storage::{AuthorizationResolver, CredentialCache};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let authority = HttpAuthority::new(HttpAuthorityConfig::new(
///     "https://glue.example.org",
///     "token",
///     "lab",
/// ))?;
/// let cache = CredentialCache::load("/tmp/authorized-fob-cache.json");
/// let mut resolver = AuthorizationResolver::new(authority, cache);
///
/// let decision = resolver.resolve(&FobId::from_scan("1234567")?).await;
/// println!("authorized={} via {}", decision.authorized, decision.source);
/// # Ok(())
/// # }
/// ```
pub struct AuthorizationResolver<A> {
    authority: A,
    cache: CredentialCache,
}

impl<A: AuthorityClient> AuthorizationResolver<A> {
    pub fn new(authority: A, cache: CredentialCache) -> Self {
        Self { authority, cache }
    }

    /// Authorized set the last decision was made against.
    pub fn authorized_set(&self) -> &AuthorizedSet {
        self.cache.fobs()
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Resolve `fob` against the freshest available authorized set.
    ///
    /// Never fails: service errors fall back to the cache and cache write
    /// errors are logged.
    pub async fn resolve(&mut self, fob: &FobId) -> Authorization {
        let source = match self.authority.fetch_authorized(fob).await {
            Ok(fresh) => {
                if let Err(e) = self.cache.replace_if_changed(fresh).await {
                    warn!(error = %e, "Failed to persist authorized set");
                }
                AuthorizationSource::Remote
            }
            Err(e) => {
                warn!(%fob, error = %e, cached = self.cache.len(), "Authorization service unavailable, using cache");
                AuthorizationSource::Cache
            }
        };

        let authorized = self.cache.contains(fob);
        debug!(%fob, authorized, %source, "Resolved fob");

        Authorization { authorized, source }
    }
}
