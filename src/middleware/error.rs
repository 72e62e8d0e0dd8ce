use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::error::{Error, ErrorKind};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let mut response = match kind {
            ErrorKind::Client => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            ErrorKind::Server => (StatusCode::BAD_GATEWAY, "Authentication failed").into_response(),
            ErrorKind::State | ErrorKind::Config => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed").into_response()
            }
        };
        response.extensions_mut().insert(kind);
        response
    }
}

/// Render a gate failure, redirecting to `error_redirect` when one is configured.
///
/// The [`ErrorKind`] is always attached as a response extension.
pub(super) fn failure_response(error: Error, error_redirect: Option<&str>) -> Response {
    let Some(page) = error_redirect else {
        return error.into_response();
    };
    let kind = error.kind();
    let name = kind.to_string();
    let encoded = urlencoding::encode(&name);
    let mut response = Redirect::to(&format!("{page}?error={encoded}")).into_response();
    response.extensions_mut().insert(kind);
    response
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    #[test]
    fn status_per_kind() {
        let cases = [
            (Error::Client("bad".into()), StatusCode::BAD_REQUEST),
            (Error::Server("down".into()), StatusCode::BAD_GATEWAY),
            (Error::State("null".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            let kind = error.kind();
            let response = error.into_response();
            assert_eq!(response.status(), status);
            assert_eq!(response.extensions().get::<ErrorKind>(), Some(&kind));
        }
    }

    #[test]
    fn redirect_when_configured() {
        let response = failure_response(Error::State("null".into()), Some("/login"));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login?error=state_error");
        assert_eq!(
            response.extensions().get::<ErrorKind>(),
            Some(&ErrorKind::State)
        );
    }
}
