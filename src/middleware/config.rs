use axum_extra::extract::cookie::Key;
use url::Url;

use super::classify::{RequestClassifier, matches_pattern};
use crate::error::Error;

const SECONDS_PER_DAY: i64 = 86_400;

/// Immutable gate settings shared by every request.
#[derive(Clone)]
pub(crate) struct GateSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) landing_page: String,
    pub(crate) error_redirect: Option<String>,
    pub(crate) classifier: RequestClassifier,
}

impl GateSettings {
    fn defaults(callback_path: String, landing_page: String) -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__oidc_session".into(),
            session_ttl_days: 1,
            secure_cookies: true,
            landing_page,
            error_redirect: None,
            classifier: RequestClassifier::new(Vec::new(), "/logout", callback_path),
        }
    }
}

/// Authentication gate configuration.
///
/// Required fields (callback path, landing page) are constructor parameters.
///
/// Use [`from_env()`](GateConfig::from_env) for convention-based setup,
/// or [`new()`](GateConfig::new) with `with_*` methods for full control.
/// Validation happens once, when the gate is built.
pub struct GateConfig {
    pub(super) settings: GateSettings,
}

impl GateConfig {
    /// Create config with the callback path registered at the provider and the
    /// page users land on after a successful login.
    #[must_use]
    pub fn new(callback_path: impl Into<String>, landing_page: impl Into<String>) -> Self {
        Self {
            settings: GateSettings::defaults(callback_path.into(), landing_page.into()),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OIDC_CALLBACK_URL`: redirect URI registered at the provider (absolute URL or path)
    ///
    /// # Optional env vars
    /// - `OIDC_INDEX_PAGE`: landing page after login (default `/`)
    /// - `OIDC_LOGOUT_URL`: logout path (default `/logout`)
    /// - `OIDC_SKIP_URIS`: comma-separated allow-list; entries ending in `*` match by prefix
    /// - `OIDC_ERROR_PAGE`: redirect target for authentication failures
    /// - `OIDC_SESSION_COOKIE`: session cookie name
    /// - `DEV_AUTH`: set to `"1"` or `"true"` to disable secure cookies
    /// - `COOKIE_KEY`: cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env()`](GateConfig::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required variables are missing or values are invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let callback = lookup("OIDC_CALLBACK_URL")
            .ok_or_else(|| Error::Config("OIDC_CALLBACK_URL is required".into()))?;
        let callback_path = path_of(&callback)
            .map_err(|e| Error::Config(format!("OIDC_CALLBACK_URL: {e}")))?;
        let landing_page = lookup("OIDC_INDEX_PAGE").unwrap_or_else(|| "/".into());

        let mut config = Self::new(callback_path, landing_page);

        if let Some(logout) = lookup("OIDC_LOGOUT_URL") {
            let path = path_of(&logout)
                .map_err(|e| Error::Config(format!("OIDC_LOGOUT_URL: {e}")))?;
            config = config.with_logout_path(path);
        }
        if let Some(skip) = lookup("OIDC_SKIP_URIS") {
            config = config.with_skip_paths(
                skip.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(page) = lookup("OIDC_ERROR_PAGE") {
            config = config.with_error_redirect(page);
        }
        if let Some(name) = lookup("OIDC_SESSION_COOKIE") {
            config = config.with_session_cookie_name(name);
        }

        let dev_auth = matches!(lookup("DEV_AUTH").as_deref(), Some("1" | "true"));

        let cookie_key = match lookup("COOKIE_KEY") {
            Some(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                Error::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            None => Key::generate(),
        };

        Ok(config
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Paths forwarded without any authentication check.
    #[must_use]
    pub fn with_skip_paths(mut self, paths: Vec<String>) -> Self {
        self.settings.classifier.skip_paths = paths;
        self
    }

    #[must_use]
    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.settings.classifier.logout_path = path.into();
        self
    }

    /// Redirect target for authentication failures, instead of a bare status code.
    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = Some(path.into());
        self
    }

    /// Check the configuration and freeze it into runtime settings.
    pub(super) fn validate(self) -> Result<GateSettings, Error> {
        let settings = self.settings;
        let classifier = &settings.classifier;

        ensure_endpoint("logout path", &classifier.logout_path)?;
        ensure_endpoint("callback path", &classifier.callback_path)?;
        ensure_path("landing page", &settings.landing_page)?;
        if let Some(page) = &settings.error_redirect {
            ensure_path("error redirect", page)?;
        }
        if classifier.logout_path == classifier.callback_path {
            return Err(Error::Config(format!(
                "logout path and callback path are both '{}'",
                classifier.logout_path
            )));
        }
        for pattern in &classifier.skip_paths {
            for endpoint in [&classifier.logout_path, &classifier.callback_path] {
                if matches_pattern(pattern, endpoint) {
                    return Err(Error::Config(format!(
                        "skip path '{pattern}' shadows '{endpoint}'"
                    )));
                }
            }
        }
        if settings.session_cookie_name.is_empty() {
            return Err(Error::Config("session cookie name is empty".into()));
        }
        if settings.session_ttl_days <= 0
            || settings.session_ttl_days.checked_mul(SECONDS_PER_DAY).is_none()
        {
            return Err(Error::Config(format!(
                "session TTL must be a positive number of days that fits in seconds, got {}",
                settings.session_ttl_days
            )));
        }

        Ok(settings)
    }
}

fn ensure_path(what: &str, value: &str) -> Result<(), Error> {
    if value.starts_with('/') {
        Ok(())
    } else {
        Err(Error::Config(format!("{what} must start with '/', got '{value}'")))
    }
}

/// Endpoints are compared against `Uri::path()`, so they cannot carry a query or fragment.
fn ensure_endpoint(what: &str, value: &str) -> Result<(), Error> {
    ensure_path(what, value)?;
    if value.contains(['?', '#']) {
        return Err(Error::Config(format!(
            "{what} must be a bare path without query or fragment, got '{value}'"
        )));
    }
    Ok(())
}

/// Accepts an absolute URL or a bare path and returns the path alone.
fn path_of(value: &str) -> Result<String, url::ParseError> {
    let url: Url = if value.starts_with('/') {
        Url::parse("http://localhost/")?.join(value)?
    } else {
        value.parse()?
    };
    Ok(url.path().to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = GateConfig::new("/callback", "/home").validate().unwrap();
        assert_eq!(settings.classifier.logout_path, "/logout");
        assert_eq!(settings.classifier.callback_path, "/callback");
        assert_eq!(settings.landing_page, "/home");
        assert_eq!(settings.session_cookie_name, "__oidc_session");
        assert!(settings.secure_cookies);
        assert!(settings.error_redirect.is_none());
    }

    #[test]
    fn relative_paths_rejected() {
        let err = GateConfig::new("callback", "/").validate().err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        let err = GateConfig::new("/callback", "home.html").validate().err().unwrap();
        assert!(err.to_string().contains("landing page"));
    }

    #[test]
    fn logout_and_callback_must_differ() {
        let err = GateConfig::new("/auth", "/")
            .with_logout_path("/auth")
            .validate()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn skip_path_may_not_shadow_endpoints() {
        let err = GateConfig::new("/auth/callback", "/")
            .with_skip_paths(vec!["/auth/*".into()])
            .validate()
            .err()
            .unwrap();
        assert!(err.to_string().contains("shadows"));

        assert!(
            GateConfig::new("/callback", "/")
                .with_skip_paths(vec!["/static/*".into(), "/health".into()])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn ttl_must_be_positive() {
        let err = GateConfig::new("/callback", "/")
            .with_session_ttl_days(0)
            .validate()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn ttl_must_fit_in_seconds() {
        let err = GateConfig::new("/callback", "/")
            .with_session_ttl_days(i64::MAX)
            .validate()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));

        assert!(
            GateConfig::new("/callback", "/")
                .with_session_ttl_days(3650)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn endpoints_may_not_carry_query_or_fragment() {
        let err = GateConfig::new("/callback?x=1", "/")
            .validate()
            .err()
            .unwrap();
        assert!(err.to_string().contains("callback path"));

        let err = GateConfig::new("/callback", "/")
            .with_logout_path("/logout#now")
            .validate()
            .err()
            .unwrap();
        assert!(err.to_string().contains("logout path"));
    }

    #[test]
    fn path_of_accepts_url_or_path() {
        assert_eq!(path_of("/callback").unwrap(), "/callback");
        assert_eq!(
            path_of("https://app.example.com/oauth2client").unwrap(),
            "/oauth2client"
        );
        assert!(path_of("not a url").is_err());
    }

    #[test]
    fn path_of_drops_query_and_fragment() {
        assert_eq!(path_of("/callback?x=1").unwrap(), "/callback");
        assert_eq!(path_of("/logout#top").unwrap(), "/logout");
        assert_eq!(
            path_of("https://app.example.com/oauth2client?next=/").unwrap(),
            "/oauth2client"
        );
    }

    fn lookup_from(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn env_requires_callback_url() {
        let err = GateConfig::from_lookup(lookup_from(&[("OIDC_INDEX_PAGE", "/home")]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("OIDC_CALLBACK_URL"));
    }

    #[test]
    fn env_reduces_urls_to_paths() {
        let settings = GateConfig::from_lookup(lookup_from(&[
            ("OIDC_CALLBACK_URL", "https://app.example.com/oauth2client?x=1"),
            ("OIDC_LOGOUT_URL", "https://app.example.com/signout"),
            ("OIDC_INDEX_PAGE", "/home"),
        ]))
        .unwrap()
        .validate()
        .unwrap();
        assert_eq!(settings.classifier.callback_path, "/oauth2client");
        assert_eq!(settings.classifier.logout_path, "/signout");
        assert_eq!(settings.landing_page, "/home");
    }

    #[test]
    fn env_defaults() {
        let settings = GateConfig::from_lookup(lookup_from(&[("OIDC_CALLBACK_URL", "/callback")]))
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(settings.landing_page, "/");
        assert_eq!(settings.classifier.logout_path, "/logout");
        assert!(settings.classifier.skip_paths.is_empty());
        assert!(settings.secure_cookies);
    }

    #[test]
    fn env_splits_skip_uris() {
        let settings = GateConfig::from_lookup(lookup_from(&[
            ("OIDC_CALLBACK_URL", "/callback"),
            ("OIDC_SKIP_URIS", " /health, /static/* ,,/favicon.ico"),
            ("OIDC_ERROR_PAGE", "/oops"),
            ("OIDC_SESSION_COOKIE", "sid"),
        ]))
        .unwrap()
        .validate()
        .unwrap();
        assert_eq!(
            settings.classifier.skip_paths,
            vec!["/health", "/static/*", "/favicon.ico"]
        );
        assert_eq!(settings.error_redirect.as_deref(), Some("/oops"));
        assert_eq!(settings.session_cookie_name, "sid");
    }

    #[test]
    fn env_rejects_short_cookie_key() {
        let err = GateConfig::from_lookup(lookup_from(&[
            ("OIDC_CALLBACK_URL", "/callback"),
            ("COOKIE_KEY", "too-short"),
        ]))
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("COOKIE_KEY"));

        let long = "k".repeat(64);
        assert!(
            GateConfig::from_lookup(lookup_from(&[
                ("OIDC_CALLBACK_URL", "/callback"),
                ("COOKIE_KEY", long.as_str()),
            ]))
            .is_ok()
        );
    }

    #[test]
    fn env_dev_auth_disables_secure_cookies() {
        for value in ["1", "true"] {
            let settings = GateConfig::from_lookup(lookup_from(&[
                ("OIDC_CALLBACK_URL", "/callback"),
                ("DEV_AUTH", value),
            ]))
            .unwrap()
            .validate()
            .unwrap();
            assert!(!settings.secure_cookies);
        }

        let settings = GateConfig::from_lookup(lookup_from(&[
            ("OIDC_CALLBACK_URL", "/callback"),
            ("DEV_AUTH", "yes"),
        ]))
        .unwrap()
        .validate()
        .unwrap();
        assert!(settings.secure_cookies);
    }
}
