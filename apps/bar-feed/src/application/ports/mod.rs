//! Port Interfaces
//!
//! Interfaces (ports) for the external collaborators of the token
//! lifecycle, following the Hexagonal Architecture pattern. The
//! streaming core and bootstrap consume these as opaque operations;
//! infrastructure adapters implement them.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`CodeReceiver`]: delivers the one-time OAuth authorization code
//!   captured from the browser redirect
//! - [`TokenCache`]: persists the credential blob across restarts
//! - [`SessionLog`]: append-only per-instrument line sink

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::credential::{CachedCredential, Credential};

/// Errors from the authorization-code collaborator.
#[derive(Debug, Error)]
pub enum CodeReceiverError {
    /// The redirect listener could not bind or accept.
    #[error("redirect listener I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured redirect URI is not a usable loopback address.
    #[error("invalid redirect URI: {0}")]
    InvalidRedirectUri(String),
}

/// Errors from the credential cache collaborator.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("token cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache blob exists but does not deserialize.
    #[error("token cache is corrupt: {0}")]
    Corrupt(String),
}

/// Delivers the one-time authorization code from the OAuth redirect.
///
/// Blocks (asynchronously) until the user completes the browser flow
/// and the brokerage redirects back with a `code` query parameter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeReceiver: Send + Sync {
    /// Wait for a single authorization code.
    async fn wait_for_code(&self) -> Result<String, CodeReceiverError>;
}

/// Persists the OAuth credential across process restarts.
///
/// Written only at bootstrap time, never concurrently with streaming.
#[cfg_attr(test, mockall::automock)]
pub trait TokenCache: Send + Sync {
    /// Read the cached credential, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Corrupt`] when a blob exists but cannot
    /// be deserialized; the process treats that as a fatal startup
    /// condition rather than silently re-authorizing.
    fn load(&self) -> Result<Option<CachedCredential>, CacheError>;

    /// Overwrite the cache with a freshly acquired credential.
    ///
    /// Implementations null the volatile fields before writing.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the blob cannot be written.
    fn store(&self, credential: &Credential) -> Result<(), CacheError>;
}

/// Append-only per-instrument line sink.
///
/// Every raw line received and every session state transition is
/// appended here. Sink failures must never disturb the stream, so the
/// operation is infallible from the caller's point of view.
#[cfg_attr(test, mockall::automock)]
pub trait SessionLog: Send + Sync {
    /// Append one line to the sink.
    fn append(&self, line: &str);
}
