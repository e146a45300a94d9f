//! Auth session state machine.
//!
//! Owns the canonical `{status, user}` state. `Loading` holds exactly
//! until the first session check settles; afterwards explicit operations
//! move the state between `Authenticated` and `Unauthenticated`. Any
//! transition to `Unauthenticated` invalidates the CSRF cache; any
//! successful login or signup warms it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{ApiClient, UserData};
use crate::csrf::CsrfCache;
use crate::error::{AuthError, AuthErrorKind, AuthResult};
use crate::navigation::Navigation;

/// Lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initial state, until the first session check settles.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Canonical auth state exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub status: SessionStatus,
    pub user: Option<UserData>,
}

impl AuthState {
    fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            user: None,
        }
    }

    /// While loading, the rest of the state is not yet trustworthy.
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    /// False while loading; consumers must not branch on authentication
    /// before the first check settles.
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Coordinates the session state, the CSRF cache, and the backend.
pub struct SessionManager {
    client: ApiClient,
    csrf: Arc<CsrfCache>,
    state: AuthState,
    csrf_initialized: bool,
}

impl SessionManager {
    pub fn new(client: ApiClient) -> Self {
        let csrf = Arc::clone(client.csrf());
        Self {
            client,
            csrf,
            state: AuthState::loading(),
            csrf_initialized: false,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Queries session introspection and settles the state.
    ///
    /// Runs once at startup and is additionally callable on demand. Any
    /// failure lands in `Unauthenticated`; `Loading` never survives this
    /// call.
    pub async fn check_auth(&mut self) -> &AuthState {
        match self.client.check_session().await {
            Ok(session) if session.authenticated => {
                self.set_authenticated(session.user);
                self.warm_csrf_once().await;
            }
            Ok(_) => self.set_unauthenticated(),
            Err(err) => {
                debug!(error = %err, "session check failed");
                self.set_unauthenticated();
            }
        }
        &self.state
    }

    /// Exchanges credentials for a session.
    ///
    /// On success the CSRF cache is warmed best-effort (a warm failure
    /// must not block navigation) and the caller navigates to the
    /// profile. On failure the state stays `Unauthenticated` and the
    /// classified error carries display copy for the form.
    pub async fn login(&mut self, username: &str, password: &str) -> AuthResult<Navigation> {
        match self.client.login(username, password).await {
            Ok(user) => {
                self.set_authenticated(Some(user));
                self.warm_csrf_once().await;
                Ok(Navigation::Profile)
            }
            Err(err) => {
                self.set_unauthenticated();
                Err(self.absorb_error(err).await)
            }
        }
    }

    /// Creates an account; same contract as `login`.
    pub async fn signup(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        captcha_token: Option<&str>,
    ) -> AuthResult<Navigation> {
        match self
            .client
            .signup(username, email, password, captcha_token)
            .await
        {
            Ok(user) => {
                self.set_authenticated(Some(user));
                self.warm_csrf_once().await;
                Ok(Navigation::Profile)
            }
            Err(err) => {
                self.set_unauthenticated();
                Err(self.absorb_error(err).await)
            }
        }
    }

    /// Terminates the session, best-effort on the network.
    ///
    /// Local state always ends logged-out: the backend call may fail, the
    /// cleanup is unconditional, and no error reaches the caller.
    pub async fn logout(&mut self) -> Navigation {
        if let Err(err) = self.client.logout().await {
            warn!(error = %err, "logout request failed; clearing local session anyway");
        }
        self.set_unauthenticated();
        Navigation::Login
    }

    /// Asks the backend to initiate the Google OAuth redirect.
    pub async fn login_with_google(&mut self) -> AuthResult<Navigation> {
        match self.client.google_login_url().await {
            Ok(url) => Ok(Navigation::External(url)),
            Err(err) => Err(self.absorb_error(err).await),
        }
    }

    /// Shared 401 policy: the only error kind that force-transitions the
    /// state as a side effect of error handling.
    pub fn handle_unauthorized(&mut self) -> Navigation {
        self.set_unauthenticated();
        Navigation::Login
    }

    fn set_authenticated(&mut self, user: Option<UserData>) {
        self.state = AuthState {
            status: SessionStatus::Authenticated,
            user,
        };
    }

    /// Every transition into `Unauthenticated` invalidates the CSRF
    /// cache; a token from the previous session must never survive it.
    fn set_unauthenticated(&mut self) {
        self.state = AuthState {
            status: SessionStatus::Unauthenticated,
            user: None,
        };
        self.csrf.clear_token();
        self.csrf_initialized = false;
    }

    /// Warms the CSRF cache once per authenticated session.
    async fn warm_csrf_once(&mut self) {
        if self.csrf_initialized {
            return;
        }
        if self.csrf.get_token(false).await.is_some() {
            self.csrf_initialized = true;
        } else {
            debug!("CSRF warm-up failed; next protected call fetches lazily");
        }
    }

    /// Applies error-kind policy before handing the error back.
    async fn absorb_error(&mut self, err: AuthError) -> AuthError {
        match err.kind {
            AuthErrorKind::SessionExpired => {
                self.set_unauthenticated();
                err
            }
            AuthErrorKind::InvalidCsrf => {
                // One forced refresh, then the user retries; no automatic
                // replay of the original request.
                if self.csrf.get_token(true).await.is_some() {
                    AuthError::new(
                        AuthErrorKind::InvalidCsrf,
                        "Security token refreshed; please retry",
                    )
                } else {
                    self.csrf.clear_token();
                    AuthError::new(AuthErrorKind::InvalidCsrf, "Security verification failed")
                }
            }
            _ => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;

    fn manager() -> SessionManager {
        let config = CoreConfig::new("http://localhost:9", "http://localhost:9");
        let csrf = Arc::new(CsrfCache::new(&config));
        SessionManager::new(ApiClient::new(&config, csrf))
    }

    /// Test: initial state is loading and not authenticated.
    #[test]
    fn test_initial_state_loading() {
        let manager = manager();
        assert!(manager.state().is_loading());
        assert!(!manager.state().is_authenticated());
        assert_eq!(manager.state().user, None);
    }

    /// Test: unauthorized handling forces a clean logged-out state.
    #[test]
    fn test_handle_unauthorized() {
        let mut manager = manager();
        manager.set_authenticated(Some(UserData {
            username: "thrall".to_string(),
            email: None,
            auth_method: None,
            has_google_linked: None,
        }));
        manager.csrf_initialized = true;

        let nav = manager.handle_unauthorized();
        assert_eq!(nav, Navigation::Login);
        assert_eq!(manager.state().status, SessionStatus::Unauthenticated);
        assert_eq!(manager.state().user, None);
        assert!(!manager.csrf.has_token());
        assert!(!manager.csrf_initialized);
    }

    /// Test: user is only ever set while authenticated.
    #[test]
    fn test_no_partial_state() {
        let mut manager = manager();
        manager.set_authenticated(Some(UserData {
            username: "jaina".to_string(),
            email: Some("jaina@example.com".to_string()),
            auth_method: Some("password".to_string()),
            has_google_linked: Some(false),
        }));
        assert!(manager.state().is_authenticated());

        manager.set_unauthenticated();
        assert_eq!(manager.state().user, None);
    }
}
