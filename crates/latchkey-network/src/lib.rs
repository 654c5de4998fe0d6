//! Network communication layer for latchkey
//!
//! This crate talks to the remote authorization service. It knows the
//! endpoint contract (path, query parameters, bearer token, response shape)
//! and nothing about caching or fallback, which live in `latchkey-storage`.
//!
//! # Components
//!
//! - **AuthorityClient**: capability trait for "fetch the authorized set"
//! - **HttpAuthority**: reqwest-backed implementation of the HTTP contract
//!
//! # Example
//!
//! ```no_run
//! use latchkey_core::FobId;
//! use latchkey_network::{AuthorityClient, HttpAuthority, HttpAuthorityConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpAuthorityConfig::new("https://glue.example.org", "secret-token", "front-door");
//! let authority = HttpAuthority::new(config)?;
//!
//! let fob = FobId::from_scan("1234567")?;
//! let authorized = authority.fetch_authorized(&fob).await?;
//! println!("{} fobs authorized", authorized.len());
//! # Ok(())
//! # }
//! ```

mod authority;

pub use authority::{
    AuthorityClient, AuthorityError, AuthorizedSet, HttpAuthority, HttpAuthorityConfig,
};
