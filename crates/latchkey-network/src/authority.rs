//! HTTP client for the remote authorization service.
//!
//! # Endpoint Contract
//!
//! ```text
//! GET <base>/rfid/auth?fob=<id>&zone=<zone>
//! Authorization: Bearer <token>
//!
//! 200 OK
//! {"authorized_fobs": ["0001234567", ...]}
//! ```
//!
//! The response carries the complete authorized set, not just a verdict for
//! the presented fob. Anything else (transport error, timeout, non-2xx
//! status, missing or ill-typed `authorized_fobs`) is an [`AuthorityError`].
//!
//! # Timeout Handling
//!
//! Each request is bounded by [`HttpAuthorityConfig::timeout`] (default
//! 2000ms). The bound is enforced twice: reqwest's per-request timeout, and
//! an outer `tokio::time::timeout` that drops the in-flight future, which
//! closes the underlying connection instead of leaving it pinned.
//!
//! # Design Principles
//!
//! - **No automatic retry**: the caller falls back to its cache instead
//! - **No interpretation**: membership is decided by the caller

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use latchkey_core::FobId;
use latchkey_core::constants::{AUTH_PATH, AUTH_TIMEOUT_MS, DEFAULT_ZONE};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Set of credential identifiers currently permitted access.
pub type AuthorizedSet = HashSet<FobId>;

/// Errors that can occur while querying the authorization service
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The request did not complete within the timeout
    #[error("Authorization request timed out after {0}ms")]
    Timeout(u64),

    /// The service answered with a non-success status
    #[error("Authorization service returned HTTP {0}")]
    Status(u16),

    /// Connection, TLS or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The body is not a JSON object of the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The body does not carry the authorized set
    #[error("Response has no authorized_fobs field")]
    MissingAuthorizedSet,

    /// The HTTP client could not be built
    #[error("Client configuration error: {0}")]
    Config(String),
}

/// Source of truth for the authorized set.
///
/// `HttpAuthority` is the production implementation; tests substitute
/// scripted authorities. The returned future is `Send` so resolvers generic
/// over the authority can run on spawned tasks.
pub trait AuthorityClient: Send + Sync {
    /// Report `fob` to the service and fetch the full authorized set.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthorityError`] for any failure; callers are expected
    /// to fall back rather than retry.
    fn fetch_authorized(
        &self,
        fob: &FobId,
    ) -> impl Future<Output = Result<AuthorizedSet, AuthorityError>> + Send;
}

/// Configuration for the HTTP authority
///
/// # Example
///
/// ```
/// use latchkey_network::HttpAuthorityConfig;
/// use std::time::Duration;
///
/// let config = HttpAuthorityConfig::new("http://127.0.0.1:8000", "token", "lab")
///     .with_timeout(Duration::from_millis(500));
/// assert_eq!(config.timeout.as_millis(), 500);
/// ```
#[derive(Debug, Clone)]
pub struct HttpAuthorityConfig {
    /// Base URL, without the `/rfid/auth` path
    pub base_url: String,

    /// Bearer token
    pub token: String,

    /// Zone reported with each request
    pub zone: String,

    /// Hard bound on one request
    pub timeout: Duration,
}

impl HttpAuthorityConfig {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            zone: zone.into(),
            timeout: Duration::from_millis(AUTH_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the authorization endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), AUTH_PATH)
    }
}

impl Default for HttpAuthorityConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8000", "", DEFAULT_ZONE)
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    authorized_fobs: Option<AuthorizedSet>,
}

/// reqwest-backed authorization client
pub struct HttpAuthority {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    zone: String,
    timeout: Duration,
}

impl HttpAuthority {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::Config` if the underlying HTTP client cannot
    /// be initialized.
    pub fn new(config: HttpAuthorityConfig) -> Result<Self, AuthorityError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthorityError::Config(e.to_string()))?;

        let endpoint = config.endpoint();
        debug!(%endpoint, zone = %config.zone, "Creating HTTP authority client");

        Ok(Self {
            client,
            endpoint,
            token: config.token,
            zone: config.zone,
            timeout: config.timeout,
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    fn map_reqwest(&self, error: reqwest::Error) -> AuthorityError {
        if error.is_timeout() {
            AuthorityError::Timeout(self.timeout_ms())
        } else if let Some(status) = error.status() {
            AuthorityError::Status(status.as_u16())
        } else {
            AuthorityError::Transport(error.to_string())
        }
    }

    async fn request(&self, fob: &FobId) -> Result<AuthorizedSet, AuthorityError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("fob", fob.as_str()), ("zone", self.zone.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthorityError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_reqwest(e))?;
        parse_authorized_set(&body)
    }
}

impl AuthorityClient for HttpAuthority {
    async fn fetch_authorized(&self, fob: &FobId) -> Result<AuthorizedSet, AuthorityError> {
        trace!(%fob, endpoint = %self.endpoint, "Querying authorization service");

        match tokio::time::timeout(self.timeout, self.request(fob)).await {
            Ok(Ok(authorized)) => {
                debug!(count = authorized.len(), "Received authorized set");
                Ok(authorized)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!("Authorization request cancelled after {}ms", self.timeout_ms());
                Err(AuthorityError::Timeout(self.timeout_ms()))
            }
        }
    }
}

/// Decode a response body into the authorized set.
fn parse_authorized_set(body: &[u8]) -> Result<AuthorizedSet, AuthorityError> {
    let response: AuthResponse = serde_json::from_slice(body)
        .map_err(|e| AuthorityError::MalformedResponse(e.to_string()))?;

    response
        .authorized_fobs
        .ok_or(AuthorityError::MissingAuthorizedSet)
}
