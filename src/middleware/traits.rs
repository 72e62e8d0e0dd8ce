use std::future::Future;

use axum::http::request::Parts;
use axum::response::Response;

use crate::error::Error;
use crate::types::{AuthenticationInfo, Session, SessionId};

/// Boxed error returned by [`SessionStore`] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided OpenID Connect protocol engine.
///
/// The gate never builds authorization requests, exchanges codes or checks
/// tokens itself; it hands the request to this collaborator and returns the
/// response it produces.
///
/// # Example
///
/// ```rust,ignore
/// impl OidcManager for MyProvider {
///     async fn send_for_login(&self, request: &Parts) -> Result<Response, Error> {
///         let auth_req = self.client.authorization_url();
///         self.pending.insert(auth_req.state.clone(), auth_req.code_verifier);
///         Ok(Redirect::to(&auth_req.url).into_response())
///     }
///     // ...
/// }
/// ```
pub trait OidcManager: Send + Sync + 'static {
    /// Emit the response that starts the login flow, typically a redirect to
    /// the provider's authorization endpoint carrying state and nonce.
    fn send_for_login(
        &self,
        request: &Parts,
    ) -> impl Future<Output = Result<Response, Error>> + Send;

    /// Validate the provider's callback and exchange it for authentication info.
    ///
    /// `Ok(None)` is treated by the gate as an authentication failure.
    fn handle_callback(
        &self,
        request: &Parts,
    ) -> impl Future<Output = Result<Option<AuthenticationInfo>, Error>> + Send;

    /// Perform provider-side logout.
    ///
    /// `info` is `None` when the request carried no active local session; the
    /// gate still calls this so the provider session is ended.
    fn logout(
        &self,
        info: Option<&AuthenticationInfo>,
    ) -> impl Future<Output = Result<Response, Error>> + Send;
}

/// Consumer-provided session persistence.
///
/// Sessions are identified by opaque [`SessionId`]s chosen by the store.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for MyAppState {
///     async fn get(&self, id: &SessionId) -> Result<Option<Session>, BoxError> {
///         self.db.find_session(id).await
///     }
///
///     async fn create(&self, info: AuthenticationInfo) -> Result<Session, BoxError> {
///         let session = Session::new(Ulid::new().to_string(), Some(info));
///         self.db.insert_session(&session).await?;
///         Ok(session)
///     }
///
///     async fn invalidate(&self, id: &SessionId) -> Result<(), BoxError> {
///         self.db.delete_session(id).await
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session by ID.
    fn get(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Create a new session holding `info`. Must always issue a fresh ID.
    fn create(
        &self,
        info: AuthenticationInfo,
    ) -> impl Future<Output = Result<Session, BoxError>> + Send;

    /// Destroy a session. Invalidating an unknown ID is not an error.
    fn invalidate(&self, id: &SessionId) -> impl Future<Output = Result<(), BoxError>> + Send;
}
