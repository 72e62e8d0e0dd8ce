//! Relying-party authentication gate for Axum.
//!
//! The gate sits in front of an application's routes and hands all
//! OpenID Connect protocol work to a consumer-provided [`OidcManager`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oidc_gate::middleware::{AuthenticationGate, GateConfig};
//! use oidc_gate::store::MemorySessionStore;
//!
//! // 1. Implement OidcManager (and optionally SessionStore) for your app
//! // 2. Configure from environment
//! let config = GateConfig::from_env()?;
//!
//! // 3. Build the gate; invalid configuration stops startup here
//! let gate = AuthenticationGate::new(config, my_provider, MemorySessionStore::new())?;
//!
//! // 4. Protect the application router
//! let app = gate.protect(axum::Router::new().route("/app/data", get(data)));
//! ```

mod classify;
mod config;
mod cookies;
mod error;
mod gate;
mod traits;

pub use classify::{Classification, RequestClassifier};
pub use config::GateConfig;
pub use gate::AuthenticationGate;
pub use traits::{BoxError, OidcManager, SessionStore};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
