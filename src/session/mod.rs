//! Session storage trait
//!
//! The impersonation record lives in the host application's session store,
//! keyed by client session id. This trait abstracts that store so the core
//! works against cookie-backed, Redis-backed, or custom implementations.

mod in_memory;

pub use in_memory::InMemorySessionStore;

use crate::error::Result;
use async_trait::async_trait;

/// Client session id, as assigned by the host application's session layer.
///
/// The HTTP handlers and the guard middleware read this from request
/// extensions; insert it from your session middleware once the session
/// cookie has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Byte-oriented key-value storage scoped to a client session.
///
/// Values are opaque bytes; the core serializes its own record. Concurrency
/// control is owned by the store: `set_if_absent` must be atomic so that two
/// concurrent requests cannot both claim the same key (the double-submit
/// race on starting impersonation).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is not set.
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value unconditionally.
    async fn set(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, session_id: &str, key: &str) -> Result<()>;

    /// Write a value only if the key is currently unset.
    ///
    /// Returns `true` if the write happened, `false` if the key was already
    /// present. Implementations must make the check-and-write atomic.
    async fn set_if_absent(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<bool>;
}
