//! Typed client for the Armory backend.
//!
//! Thin wrappers over the auth endpoints. Mutating requests against
//! protected routes consult the CSRF cache and fail closed when no token
//! can be obtained. No raw transport errors escape this module; every
//! failure is classified into an `AuthError`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CoreConfig;
use crate::csrf::{CSRF_HEADER, CsrfCache};
use crate::error::{AuthError, AuthErrorKind, AuthResult};

const SESSION_PATH: &str = "/api/auth/session";
const LOGIN_PATH: &str = "/api/auth/login";
const SIGNUP_PATH: &str = "/api/auth/signup";
const LOGOUT_PATH: &str = "/api/auth/logout";
const GOOGLE_INIT_PATH: &str = "/api/auth/google";
const LINK_CALLBACK_PATH: &str = "/api/auth/battlenet/callback";
const CHARACTER_SYNC_PATH: &str = "/api/characters/sync";

/// Account data returned by the backend for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        rename = "authMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_method: Option<String>,
    #[serde(
        default,
        rename = "hasGoogleLinked",
        skip_serializing_if = "Option::is_none"
    )]
    pub has_google_linked: Option<bool>,
}

/// Session-introspection response.
#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: UserData,
}

#[derive(Debug, Deserialize)]
struct GoogleInitResponse {
    url: String,
}

/// Provider callback-exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkExchangeResponse {
    pub linked: bool,
    #[serde(default, rename = "battleTag")]
    pub battle_tag: Option<String>,
    #[serde(default)]
    pub auto_relink: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Backend API client bound to one session's CSRF cache.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base_url: String,
    app_url: String,
    csrf: Arc<CsrfCache>,
}

impl ApiClient {
    pub fn new(config: &CoreConfig, csrf: Arc<CsrfCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.clone(),
            app_url: config.app_url.clone(),
            csrf,
        }
    }

    /// The CSRF cache this client protects requests with.
    pub fn csrf(&self) -> &Arc<CsrfCache> {
        &self.csrf
    }

    /// Queries the session-introspection endpoint.
    pub async fn check_session(&self) -> AuthResult<SessionResponse> {
        let response = self.get(SESSION_PATH).await?;
        Self::parse_json(response).await
    }

    /// Exchanges credentials for a session.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<UserData> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self.post(LOGIN_PATH, &body).await?;
        let data: UserResponse = Self::parse_json(response).await?;
        Ok(data.user)
    }

    /// Creates an account.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        captcha_token: Option<&str>,
    ) -> AuthResult<UserData> {
        let mut body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        });
        if let (Some(token), Some(obj)) = (captcha_token, body.as_object_mut()) {
            obj.insert("captchaToken".to_string(), Value::String(token.to_string()));
        }
        let response = self.post(SIGNUP_PATH, &body).await?;
        let data: UserResponse = Self::parse_json(response).await?;
        Ok(data.user)
    }

    /// Terminates the backend session.
    pub async fn logout(&self) -> AuthResult<()> {
        self.post(LOGOUT_PATH, &serde_json::json!({})).await?;
        Ok(())
    }

    /// Asks the backend for the Google OAuth redirect URL.
    pub async fn google_login_url(&self) -> AuthResult<String> {
        let response = self.get(GOOGLE_INIT_PATH).await?;
        let data: GoogleInitResponse = Self::parse_json(response).await?;
        Ok(data.url)
    }

    /// Exchanges a provider callback `{code, state}` pair.
    pub async fn exchange_link_callback(
        &self,
        code: &str,
        state: &str,
    ) -> AuthResult<LinkExchangeResponse> {
        let body = serde_json::json!({ "code": code, "state": state });
        let response = self.post(LINK_CALLBACK_PATH, &body).await?;
        Self::parse_json(response).await
    }

    /// Triggers the dependent sync-and-enrich action for linked characters.
    pub async fn trigger_character_sync(&self) -> AuthResult<()> {
        self.post(CHARACTER_SYNC_PATH, &serde_json::json!({}))
            .await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    async fn get(&self, path: &str) -> AuthResult<reqwest::Response> {
        let response = self
            .http
            .get(self.endpoint(path))
            .header("Origin", &self.app_url)
            .send()
            .await
            .map_err(|e| AuthError::network(&e))?;
        self.check_status(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> AuthResult<reqwest::Response> {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header("Origin", &self.app_url)
            .json(body);

        if CsrfCache::is_protected_route(path, "POST") {
            let Some(token) = self.csrf.get_token(false).await else {
                // Fail closed: an unprotected mutating request never goes out.
                return Err(AuthError::new(
                    AuthErrorKind::InvalidCsrf,
                    "Could not obtain a security token; please retry",
                ));
            };
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await.map_err(|e| AuthError::network(&e))?;
        self.check_status(response).await
    }

    async fn check_status(&self, response: reqwest::Response) -> AuthResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = AuthError::http_status(status.as_u16(), &body);
        if matches!(
            err.kind,
            AuthErrorKind::SessionExpired | AuthErrorKind::InvalidCsrf
        ) {
            // The cached token is no longer trustworthy.
            self.csrf.clear_token();
        }
        debug!(status = status.as_u16(), kind = %err.kind, "backend request failed");
        Err(err)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> AuthResult<T> {
        response.json().await.map_err(|e| AuthError::network(&e))
    }
}
