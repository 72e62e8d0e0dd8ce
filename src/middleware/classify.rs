use axum::http::Uri;
use url::form_urlencoded;

/// How the gate handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Allow-listed path; forwarded untouched.
    Skip,
    /// Logout endpoint.
    Logout,
    /// Provider redirect carrying a response.
    Callback,
    /// Protected path without an active session.
    Unauthenticated,
    /// Protected path with an active session.
    Authenticated,
}

/// Config-driven request predicates.
///
/// Decides everything that can be decided from the URI alone; whether a
/// protected request is authenticated needs the session and is settled by the gate.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    pub(crate) skip_paths: Vec<String>,
    pub(crate) logout_path: String,
    pub(crate) callback_path: String,
}

impl RequestClassifier {
    #[must_use]
    pub fn new(
        skip_paths: Vec<String>,
        logout_path: impl Into<String>,
        callback_path: impl Into<String>,
    ) -> Self {
        Self {
            skip_paths,
            logout_path: logout_path.into(),
            callback_path: callback_path.into(),
        }
    }

    /// Exact match, or prefix match for entries ending in `*` (e.g. `/static/*`).
    #[must_use]
    pub fn is_skip_path(&self, path: &str) -> bool {
        self.skip_paths
            .iter()
            .any(|pattern| matches_pattern(pattern, path))
    }

    #[must_use]
    pub fn is_logout_path(&self, path: &str) -> bool {
        path == self.logout_path
    }

    /// Callback path carrying a provider response (`code` or `error` parameter).
    #[must_use]
    pub fn is_callback_shape(&self, uri: &Uri) -> bool {
        uri.path() == self.callback_path
            && uri.query().is_some_and(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .any(|(name, _)| name == "code" || name == "error")
            })
    }

    /// Classify by URI. First match wins: skip, logout, callback.
    ///
    /// Returns `None` for protected requests.
    #[must_use]
    pub fn classify(&self, uri: &Uri) -> Option<Classification> {
        let path = uri.path();
        if self.is_skip_path(path) {
            Some(Classification::Skip)
        } else if self.is_logout_path(path) {
            Some(Classification::Logout)
        } else if self.is_callback_shape(uri) {
            Some(Classification::Callback)
        } else {
            None
        }
    }
}

pub(crate) fn matches_pattern(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RequestClassifier {
        RequestClassifier::new(
            vec!["/health".into(), "/static/*".into()],
            "/logout",
            "/callback",
        )
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn skip_exact_and_prefix() {
        let c = classifier();
        assert!(c.is_skip_path("/health"));
        assert!(!c.is_skip_path("/health/deep"));
        assert!(c.is_skip_path("/static/app.css"));
        assert!(c.is_skip_path("/static/"));
        assert!(!c.is_skip_path("/staticfile"));
        assert!(!c.is_skip_path("/app"));
    }

    #[test]
    fn logout_is_exact() {
        let c = classifier();
        assert!(c.is_logout_path("/logout"));
        assert!(!c.is_logout_path("/logout/now"));
        assert!(!c.is_logout_path("/app/logout"));
    }

    #[test]
    fn callback_needs_provider_parameters() {
        let c = classifier();
        assert!(c.is_callback_shape(&uri("/callback?code=abc&state=xyz")));
        assert!(c.is_callback_shape(&uri("/callback?state=xyz&error=access_denied")));
        assert!(!c.is_callback_shape(&uri("/callback")));
        assert!(!c.is_callback_shape(&uri("/callback?state=xyz")));
        assert!(!c.is_callback_shape(&uri("/callback?codex=1")));
        assert!(!c.is_callback_shape(&uri("/other?code=abc")));
    }

    #[test]
    fn callback_parameter_names_are_percent_decoded() {
        let c = classifier();
        assert!(c.is_callback_shape(&uri("/callback?%63ode=abc&state=xyz")));
        assert!(c.is_callback_shape(&uri("/callback?state=xyz&%65rror=access_denied")));
        assert!(!c.is_callback_shape(&uri("/callback?%63odex=abc")));
    }

    #[test]
    fn classification_order() {
        let c = classifier();
        assert_eq!(c.classify(&uri("/health")), Some(Classification::Skip));
        assert_eq!(c.classify(&uri("/logout")), Some(Classification::Logout));
        assert_eq!(
            c.classify(&uri("/callback?code=abc")),
            Some(Classification::Callback)
        );
        assert_eq!(c.classify(&uri("/app/data")), None);
        assert_eq!(c.classify(&uri("/callback")), None);
    }

    #[test]
    fn skip_wins_over_protocol_endpoints() {
        let c = RequestClassifier::new(vec!["/*".into()], "/logout", "/callback");
        assert_eq!(c.classify(&uri("/logout")), Some(Classification::Skip));
        assert_eq!(
            c.classify(&uri("/callback?code=abc")),
            Some(Classification::Skip)
        );
    }
}
