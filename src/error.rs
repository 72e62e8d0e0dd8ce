use derive_more::Display;

/// Errors raised by the gate and by its collaborators.
///
/// [`OidcManager`](crate::middleware::OidcManager) implementations report
/// failures with the `Client`, `Server` and `State` variants; the gate adds
/// `Config` for startup validation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or unexpected request, e.g. a callback missing its parameters.
    #[error("Client error: {0}")]
    Client(String),
    /// Collaborator or identity provider failure, e.g. a failed code exchange.
    #[error("Server error: {0}")]
    Server(String),
    /// Invariant violated, e.g. a successful callback without authentication info.
    #[error("State error: {0}")]
    State(String),
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`].
///
/// Attached to failure responses as a response extension so outer layers
/// can render their own error page. Displays as a stable lowercase name, used
/// as the `error` query value on error redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    #[display("client_error")]
    Client,
    #[display("server_error")]
    Server,
    #[display("state_error")]
    State,
    #[display("config_error")]
    Config,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client(_) => ErrorKind::Client,
            Self::Server(_) => ErrorKind::Server,
            Self::State(_) => ErrorKind::State,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}
