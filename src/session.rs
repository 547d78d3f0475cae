//! Cookie-session gate for the administrative area.
//!
//! The gate classifies each request path and decides whether it may reach
//! its handler or must be redirected. It only reads the session cookie and
//! never changes session state.

use axum::http::{header, HeaderMap};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use std::sync::Arc;

use crate::error::{GateError, Result};

pub const SESSION_COOKIE_NAME: &str = "admin_session";

/// Lifetime of an issued session cookie.
pub const SESSION_MAX_AGE: Duration = Duration::days(7);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Login,
    Protected,
    Unprotected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Forward,
    Redirect(String),
}

/// Decides whether a session token proves authentication.
///
/// The default [`PresenceVerifier`] accepts any non-empty token. A signed or
/// server-side-checked token only needs a different implementation here.
pub trait SessionVerifier: Send + Sync {
    fn is_authenticated(&self, token: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceVerifier;

impl SessionVerifier for PresenceVerifier {
    fn is_authenticated(&self, token: &str) -> bool {
        !token.is_empty()
    }
}

/// Read the `admin_session` cookie value from the request headers.
///
/// Surrounding double quotes are trimmed. Returns `None` when the cookie is
/// missing or its value is empty.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(|c| c.ok())
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .map(|c| c.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie issuing `token` as the admin session.
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(SESSION_MAX_AGE)
        .build()
}

/// Cookie that clears the admin session from the browser.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

#[derive(Clone)]
pub struct SessionGate {
    admin_prefix: String,
    login_path: String,
    landing_path: String,
    verifier: Arc<dyn SessionVerifier>,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("admin_prefix", &self.admin_prefix)
            .field("login_path", &self.login_path)
            .field("landing_path", &self.landing_path)
            .finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Build a gate for the admin area under `admin_prefix`.
    ///
    /// Fails when the paths are not absolute, when the login or landing path
    /// lies outside the prefix, or when the landing path is the login path.
    pub fn new(admin_prefix: &str, login_path: &str, landing_path: &str) -> Result<Self> {
        Self::with_verifier(admin_prefix, login_path, landing_path, PresenceVerifier)
    }

    pub fn with_verifier(
        admin_prefix: &str,
        login_path: &str,
        landing_path: &str,
        verifier: impl SessionVerifier + 'static,
    ) -> Result<Self> {
        for (name, path) in [
            ("admin prefix", admin_prefix),
            ("login path", login_path),
            ("landing path", landing_path),
        ] {
            if !path.starts_with('/') {
                return Err(GateError::Configuration(format!(
                    "{name} must start with '/': {path:?}"
                )));
            }
        }

        let admin_prefix = admin_prefix.trim_end_matches('/');
        if admin_prefix.is_empty() {
            return Err(GateError::Configuration(
                "admin prefix cannot be the site root".to_string(),
            ));
        }

        let gate = Self {
            admin_prefix: admin_prefix.to_string(),
            login_path: login_path.to_string(),
            landing_path: landing_path.to_string(),
            verifier: Arc::new(verifier),
        };

        if login_path == admin_prefix || !gate.under_prefix(login_path) {
            return Err(GateError::Configuration(format!(
                "login path {login_path:?} must be below admin prefix {admin_prefix:?}"
            )));
        }
        if !gate.under_prefix(landing_path) {
            return Err(GateError::Configuration(format!(
                "landing path {landing_path:?} must be inside admin prefix {admin_prefix:?}"
            )));
        }
        if landing_path == login_path {
            return Err(GateError::Configuration(
                "landing path cannot be the login path".to_string(),
            ));
        }

        Ok(gate)
    }

    pub fn admin_prefix(&self) -> &str {
        &self.admin_prefix
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    fn under_prefix(&self, path: &str) -> bool {
        path == self.admin_prefix
            || path
                .strip_prefix(self.admin_prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if path == self.login_path {
            RouteClass::Login
        } else if self.under_prefix(path) {
            RouteClass::Protected
        } else {
            RouteClass::Unprotected
        }
    }

    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        session_token(headers).is_some_and(|token| self.verifier.is_authenticated(&token))
    }

    pub fn decide(&self, path: &str, headers: &HeaderMap) -> GateDecision {
        match self.classify(path) {
            RouteClass::Login if self.is_authenticated(headers) => {
                GateDecision::Redirect(self.landing_path.clone())
            }
            RouteClass::Protected if !self.is_authenticated(headers) => {
                GateDecision::Redirect(self.login_path.clone())
            }
            _ => GateDecision::Forward,
        }
    }
}
