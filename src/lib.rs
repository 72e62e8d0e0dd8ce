#![doc = include_str!("../README.md")]

pub mod error;
pub mod middleware;
#[cfg(feature = "memory-store")]
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use error::{Error, ErrorKind};
pub use middleware::{AuthenticationGate, GateConfig, OidcManager, SessionStore};
#[cfg(feature = "memory-store")]
pub use store::MemorySessionStore;
pub use types::{AuthenticationInfo, Session, SessionId, Subject};
