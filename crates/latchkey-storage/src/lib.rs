//! Credential storage and authorization for the latchkey daemon.
//!
//! # Architecture
//!
//! - [`CredentialCache`] - last-known authorized set, persisted as a JSON
//!   array of fob identifiers
//! - [`AuthorizationResolver`] - asks the authorization service first and
//!   falls back to the cache on any failure
//!
//! The resolver favors availability: a transient outage never locks out a
//! fob that was authorized at the last successful fetch, and a request never
//! blocks longer than the authority's timeout.
//!
//! # Example
//!
//! ```no_run
//! use latchkey_core::FobId;
//! use latchkey_network::{HttpAuthority, HttpAuthorityConfig};
//! use latchkey_storage::{AuthorizationResolver, CredentialCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authority = HttpAuthority::new(HttpAuthorityConfig::new(
//!     "https://glue.example.org",
//!     "token",
//!     "lab",
//! ))?;
//! let mut resolver = AuthorizationResolver::new(
//!     authority,
//!     CredentialCache::load("authorized-fob-cache.json"),
//! );
//!
//! if resolver.resolve(&FobId::from_scan("1234567")?).await.authorized {
//!     println!("open sesame");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod resolver;

pub use cache::CredentialCache;
pub use error::{StorageError, StorageResult};
pub use resolver::{Authorization, AuthorizationResolver, AuthorizationSource};
