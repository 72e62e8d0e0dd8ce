use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

/// Subject identifier of an authenticated end user (OIDC `sub` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Subject(pub String);

/// Opaque session identifier issued by a [`SessionStore`](crate::middleware::SessionStore).
///
/// The store chooses the format (ULID, UUID, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Validated result of a completed login.
///
/// Produced only by [`OidcManager::handle_callback`](crate::middleware::OidcManager::handle_callback).
/// Immutable once attached to a session; re-authentication replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AuthenticationInfo {
    pub subject: Subject,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    /// Provider claims, opaque to the gate.
    #[serde(default)]
    pub claims: JsonValue,
}

impl AuthenticationInfo {
    /// Create info issued now, with no expiry and no claims.
    #[must_use]
    pub fn new(subject: impl Into<Subject>) -> Self {
        Self {
            subject: subject.into(),
            issued_at: OffsetDateTime::now_utc(),
            expires_at: None,
            claims: JsonValue::Null,
        }
    }

    #[must_use]
    pub fn with_issued_at(mut self, issued_at: OffsetDateTime) -> Self {
        self.issued_at = issued_at;
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn with_claims(mut self, claims: JsonValue) -> Self {
        self.claims = claims;
        self
    }

    /// Whether `expires_at` lies at or before `now`. Info without expiry never expires.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Server-side session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Session {
    pub id: SessionId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub authentication_info: Option<AuthenticationInfo>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<SessionId>, authentication_info: Option<AuthenticationInfo>) -> Self {
        Self {
            id: id.into(),
            created_at: OffsetDateTime::now_utc(),
            authentication_info,
        }
    }

    /// The attached authentication info, if present and not expired at `now`.
    ///
    /// Anything else counts as an unauthenticated session.
    #[must_use]
    pub fn active_info(&self, now: OffsetDateTime) -> Option<&AuthenticationInfo> {
        self.authentication_info
            .as_ref()
            .filter(|info| !info.is_expired(now))
    }
}
