use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRef, Request, State};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use super::classify::Classification;
use super::config::{GateConfig, GateSettings};
use super::cookies;
use super::error::failure_response;
use super::traits::{OidcManager, SessionStore};
use crate::error::Error;
use crate::types::{Session, SessionId};

/// Relying-party authentication gate.
///
/// Classifies every request passing through the protected router and either
/// forwards it, runs logout, completes a provider callback, or starts a login.
///
/// ```rust,ignore
/// let gate = AuthenticationGate::new(GateConfig::from_env()?, provider, MemorySessionStore::new())?;
/// let app = gate.protect(Router::new().route("/app/data", get(data)));
/// ```
pub struct AuthenticationGate<M, S> {
    state: GateState<M, S>,
}

impl<M: OidcManager, S: SessionStore> AuthenticationGate<M, S> {
    /// Validate `config` and build the gate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid. The gate is
    /// never built from a configuration that failed validation.
    pub fn new(config: GateConfig, manager: M, session_store: S) -> Result<Self, Error> {
        let settings = config.validate()?;

        info!(
            logout_path = %settings.classifier.logout_path,
            callback_path = %settings.classifier.callback_path,
            skip_paths = settings.classifier.skip_paths.len(),
            "Authentication gate initialized"
        );

        Ok(Self {
            state: GateState::new(settings, manager, session_store),
        })
    }

    /// Install the gate in front of every route of `router`, including its fallback.
    pub fn protect<T>(self, router: Router<T>) -> Router<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self.state, handle::<M, S>))
    }
}

/// What every request sees: the collaborators and the validated settings.
struct GateState<M, S> {
    manager: Arc<M>,
    session_store: Arc<S>,
    settings: Arc<GateSettings>,
}

impl<M, S> GateState<M, S> {
    fn new(settings: GateSettings, manager: M, session_store: S) -> Self {
        Self {
            manager: Arc::new(manager),
            session_store: Arc::new(session_store),
            settings: Arc::new(settings),
        }
    }

    fn cookie_name(&self) -> &str {
        &self.settings.session_cookie_name
    }

    /// Removal cookie for the session, added to `jar`.
    fn drop_session_cookie(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(cookies::clear_session_cookie(self.cookie_name()))
    }
}

// Derive would require `M: Clone, S: Clone`.
impl<M, S> Clone for GateState<M, S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            session_store: Arc::clone(&self.session_store),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<M, S> FromRef<GateState<M, S>> for Key {
    fn from_ref(state: &GateState<M, S>) -> Self {
        state.settings.cookie_key.clone()
    }
}

/// The session named by the request's session cookie.
///
/// Invalidated at most once per request, whichever branch or the error path gets there first.
struct LocalSession {
    id: Option<SessionId>,
    cleared: bool,
}

impl LocalSession {
    async fn clear<S: SessionStore>(&mut self, store: &S) {
        if self.cleared {
            return;
        }
        self.cleared = true;
        let Some(id) = &self.id else {
            return;
        };
        match store.invalidate(id).await {
            Ok(()) => debug!(session_id = %id, "Session invalidated"),
            Err(e) => warn!(session_id = %id, error = %e, "Session invalidation failed"),
        }
    }
}

async fn handle<M: OidcManager, S: SessionStore>(
    State(state): State<GateState<M, S>>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let settings = &state.settings;
    let local = LocalSession {
        id: cookies::get_session_id(&jar, state.cookie_name()),
        cleared: false,
    };

    let classification = match settings.classifier.classify(request.uri()) {
        Some(classification) => classification,
        None => {
            let active = match &local.id {
                Some(id) => find_session(&*state.session_store, id)
                    .await
                    .is_some_and(|s| s.active_info(OffsetDateTime::now_utc()).is_some()),
                None => false,
            };
            if active {
                Classification::Authenticated
            } else {
                Classification::Unauthenticated
            }
        }
    };

    debug!(path = %request.uri().path(), ?classification, "Request classified");

    match classification {
        Classification::Skip | Classification::Authenticated => next.run(request).await,
        Classification::Logout => logout(&state, jar, local).await,
        Classification::Callback => {
            let (parts, _body) = request.into_parts();
            callback(&state, jar, local, &parts).await
        }
        Classification::Unauthenticated => {
            let (parts, _body) = request.into_parts();
            login(&state, jar, local, &parts).await
        }
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<M: OidcManager, S: SessionStore>(
    state: &GateState<M, S>,
    jar: PrivateCookieJar,
    mut local: LocalSession,
) -> Response {
    let info = match &local.id {
        Some(id) => find_session(&*state.session_store, id)
            .await
            .and_then(|s| s.authentication_info),
        None => None,
    };

    // Local state goes first so a failed provider call cannot leave it behind.
    local.clear(&*state.session_store).await;
    let jar = state.drop_session_cookie(jar);

    match state.manager.logout(info.as_ref()).await {
        Ok(response) => {
            info!(
                subject = ?info.as_ref().map(|i| &i.subject),
                "Logout completed"
            );
            (jar, response).into_response()
        }
        Err(e) => fail(state, jar, &mut local, e, "logout").await,
    }
}

// ── Callback ───────────────────────────────────────────────────────

async fn callback<M: OidcManager, S: SessionStore>(
    state: &GateState<M, S>,
    jar: PrivateCookieJar,
    mut local: LocalSession,
    parts: &Parts,
) -> Response {
    // Never reuse a session that predates the login.
    local.clear(&*state.session_store).await;

    let info = match state.manager.handle_callback(parts).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            let e = Error::State("callback produced no authentication info".into());
            return fail(state, jar, &mut local, e, "callback").await;
        }
        Err(e) => return fail(state, jar, &mut local, e, "callback").await,
    };
    let subject = info.subject.clone();

    let session = match state.session_store.create(info).await {
        Ok(session) => session,
        Err(e) => {
            let e = Error::Server(format!("session creation failed: {e}"));
            return fail(state, jar, &mut local, e, "callback").await;
        }
    };

    let settings = &state.settings;
    let session_cookie = cookies::session_cookie(
        &settings.session_cookie_name,
        &session.id,
        settings.session_ttl_days,
        settings.secure_cookies,
    );

    info!(session_id = %session.id, subject = %subject, "OIDC login successful");

    (jar.add(session_cookie), Redirect::to(&settings.landing_page)).into_response()
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<M: OidcManager, S: SessionStore>(
    state: &GateState<M, S>,
    jar: PrivateCookieJar,
    mut local: LocalSession,
    parts: &Parts,
) -> Response {
    match state.manager.send_for_login(parts).await {
        Ok(response) => response,
        Err(e) => fail(state, jar, &mut local, e, "login").await,
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Single error path: clear the local session, drop the cookie, surface the error.
async fn fail<M: OidcManager, S: SessionStore>(
    state: &GateState<M, S>,
    jar: PrivateCookieJar,
    local: &mut LocalSession,
    error: Error,
    branch: &'static str,
) -> Response {
    error!(error = %error, kind = %error.kind(), branch, "Authentication gate failure");

    local.clear(&*state.session_store).await;
    let jar = state.drop_session_cookie(jar);

    (
        jar,
        failure_response(error, state.settings.error_redirect.as_deref()),
    )
        .into_response()
}

/// Store lookup that fails closed: errors count as a missing session.
async fn find_session<S: SessionStore>(store: &S, id: &SessionId) -> Option<Session> {
    match store.get(id).await {
        Ok(session) => session,
        Err(e) => {
            warn!(session_id = %id, error = %e, "Session lookup failed");
            None
        }
    }
}
