//! Masquerade - session-scoped identity impersonation for Axum services
//!
//! Lets an authorized user (typically an administrator) temporarily assume
//! another user's identity, then return to their own. The original actor is
//! recorded in the host application's session store while the session's
//! *effective identity* is switched to the target; leaving restores it.
//!
//! # Features
//!
//! - Two-state session machine: normal and impersonating, no stacking
//! - Pluggable identity provider and session store (bring your own backend)
//! - Injectable authorization policy, defaulting to per-user capability flags
//! - Take/leave HTTP routes with configurable redirects
//! - `ProtectFromImpersonation` middleware for routes that require the
//!   caller's true identity
//! - Race-safe start via the store's atomic `set_if_absent`
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use masquerade::{ImpersonateConfig, ImpersonateManager, InMemorySessionStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     masquerade::init_tracing();
//!
//!     let manager = Arc::new(ImpersonateManager::new(
//!         MyIdentityProvider::new(),
//!         InMemorySessionStore::new(),
//!         ImpersonateConfig::from_env(),
//!     ));
//!
//!     let app = axum::Router::new()
//!         .merge(masquerade::routes::<MyIdentityProvider, InMemorySessionStore>())
//!         .layer(axum::Extension(manager));
//!     // ... serve
//! }
//! ```

mod config;
mod error;
mod guard;
pub mod identity;
mod manager;
mod routes;
pub mod session;

// Re-exports for public API
pub use config::{ImpersonateConfig, ImpersonateConfigBuilder};
pub use error::{ErrorResponse, MasqueradeError, Result};
pub use guard::{ImpersonateLayer, ProtectFromImpersonation};
pub use identity::{CapabilityPolicy, Identity, IdentityProvider, ImpersonatePolicy};
pub use manager::{ImpersonateManager, ImpersonationRecord};
pub use routes::routes;
pub use session::{InMemorySessionStore, SessionId, SessionStore};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "masquerade=debug")
/// - `MASQUERADE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("MASQUERADE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
