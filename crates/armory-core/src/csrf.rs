//! CSRF token cache.
//!
//! One explicitly constructed instance per session, shared by reference
//! between the session manager and the API client. Only those two mutate
//! the token; everything else reads through `get_token`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::error::{AuthError, AuthResult};

/// Header carrying the anti-forgery token on mutating requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Tokens are trusted for one hour from issuance.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

const TOKEN_PATH: &str = "/api/auth/csrf-token";

/// Route substrings whose mutating requests require a token.
const PROTECTED_ROUTES: &[&str] = &[
    "/auth/login",
    "/auth/signup",
    "/auth/logout",
    "/user/profile",
    "/user/delete",
];

const READ_ONLY_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS"];

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: SystemTime,
}

impl CachedToken {
    /// A non-expired token is the only token worth trusting.
    fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct CsrfTokenResponse {
    token: String,
}

/// Session-scoped anti-forgery token cache.
pub struct CsrfCache {
    http: reqwest::Client,
    token_url: String,
    app_url: String,
    state: Mutex<Option<CachedToken>>,
}

impl CsrfCache {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: format!("{}{}", config.api_base_url, TOKEN_PATH),
            app_url: config.app_url.clone(),
            state: Mutex::new(None),
        }
    }

    /// Returns true iff `method` mutates and `path` matches a protected
    /// route substring. Pure predicate, no side effects.
    pub fn is_protected_route(path: &str, method: &str) -> bool {
        if READ_ONLY_METHODS
            .iter()
            .any(|m| method.eq_ignore_ascii_case(m))
        {
            return false;
        }
        PROTECTED_ROUTES.iter().any(|route| path.contains(route))
    }

    /// Returns a trusted token, fetching when forced, empty, or expired.
    ///
    /// Fails closed: a fetch failure is logged and yields `None`. Callers
    /// must treat `None` as "cannot protect this request" and surface a
    /// retryable error, never skip protection.
    pub async fn get_token(&self, force_refresh: bool) -> Option<String> {
        if !force_refresh
            && let Some(cached) = self.lock_state().as_ref()
            && !cached.is_expired()
        {
            return Some(cached.value.clone());
        }

        // The lock is not held across the fetch; a racing caller may issue
        // a redundant fetch and both converge on the last stored value.
        match self.fetch_token().await {
            Ok(value) => {
                *self.lock_state() = Some(CachedToken {
                    value: value.clone(),
                    expires_at: SystemTime::now() + TOKEN_LIFETIME,
                });
                debug!("CSRF token cached");
                Some(value)
            }
            Err(err) => {
                warn!(error = %err, "CSRF token fetch failed");
                *self.lock_state() = None;
                None
            }
        }
    }

    /// Synchronous, idempotent invalidation (logout, 401, invalid-CSRF).
    pub fn clear_token(&self) {
        *self.lock_state() = None;
    }

    /// True when a token is cached, expired or not.
    pub fn has_token(&self) -> bool {
        self.lock_state().is_some()
    }

    /// Expiry of the currently cached token, if any.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.lock_state().as_ref().map(|cached| cached.expires_at)
    }

    async fn fetch_token(&self) -> AuthResult<String> {
        let response = self
            .http
            .get(&self.token_url)
            .header("Origin", &self.app_url)
            .send()
            .await
            .map_err(|e| AuthError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::http_status(status.as_u16(), &body));
        }

        let data: CsrfTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::network(&e))?;
        Ok(data.token)
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<CachedToken>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
