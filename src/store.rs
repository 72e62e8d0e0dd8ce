//! In-process [`SessionStore`] for tests and single-instance deployments.
//!
//! Sessions live only as long as the process. A session is stale once its
//! authentication info has expired or, with [`MemorySessionStore::with_ttl`],
//! once it is older than the TTL. Stale sessions are dropped when looked up and
//! by [`MemorySessionStore::purge_expired`].

use std::sync::Arc;

use dashmap::DashMap;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use ulid::Ulid;

use crate::middleware::{BoxError, SessionStore};
use crate::types::{AuthenticationInfo, Session, SessionId};

/// Concurrent in-memory session map. Clones share the same sessions.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<SessionId, Session>>,
    ttl: Option<Duration>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every session's lifetime to `ttl` from its creation.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn is_stale(&self, session: &Session, now: OffsetDateTime) -> bool {
        let info_expired = session
            .authentication_info
            .as_ref()
            .is_some_and(|info| info.is_expired(now));
        let too_old = self
            .ttl
            .is_some_and(|ttl| session.created_at.saturating_add(ttl) <= now);
        info_expired || too_old
    }

    /// Drop every stale session. Returns how many were removed.
    ///
    /// Call periodically; lookups only evict the session they touch.
    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let stale = self.is_stale(session, now);
            removed += usize::from(stale);
            !stale
        });
        removed
    }

    /// Insert or replace a session as-is.
    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, BoxError> {
        let now = OffsetDateTime::now_utc();
        if self
            .sessions
            .remove_if(id, |_, session| self.is_stale(session, now))
            .is_some()
        {
            debug!(session_id = %id, "Evicted stale session");
            return Ok(None);
        }
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, info: AuthenticationInfo) -> Result<Session, BoxError> {
        let session = Session::new(Ulid::new().to_string(), Some(info));
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn invalidate(&self, id: &SessionId) -> Result<(), BoxError> {
        self.sessions.remove(id);
        Ok(())
    }
}
