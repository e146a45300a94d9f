//! Authentication error taxonomy.
//!
//! Every failure surfaced by the session manager or the callback
//! reconciler funnels through this one mapping, so display copy stays
//! consistent regardless of which flow produced the error.

use std::fmt;

use serde_json::Value;

/// Handling category for an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Stale or missing anti-forgery token; a single forced refresh applies.
    InvalidCsrf,
    /// Bad username/password combination.
    InvalidCredentials,
    UsernameTaken,
    EmailTaken,
    CaptchaRequired,
    CaptchaInvalid,
    /// Session no longer valid; forces a logout transition.
    SessionExpired,
    /// User backed out of the provider consent screen.
    OAuthCancelled,
    /// Provider code exchange rejected by the backend.
    OAuthExchangeFailed,
    /// Anti-replay state parameter did not match.
    StateMismatch,
    /// The provider account email is linked to a different account.
    EmailAlreadyLinked,
    /// Callback URL arrived without code or state.
    MissingParams,
    /// Transport-level failure.
    Network,
    Unknown,
}

/// Recovery action offered alongside an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    Retry,
    LogInAgain,
    ResetPassword,
    RestartLinkFlow,
    ContactSupport,
}

/// User-facing copy for an error kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDisplay {
    pub title: &'static str,
    pub message: &'static str,
    pub actions: &'static [ErrorAction],
    pub recoverable: bool,
}

impl AuthErrorKind {
    /// Classifies a backend-issued error code string.
    ///
    /// Total over arbitrary input: unrecognized codes degrade to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "invalid_csrf" | "csrf_invalid" => AuthErrorKind::InvalidCsrf,
            "invalid_credentials" => AuthErrorKind::InvalidCredentials,
            "username_taken" => AuthErrorKind::UsernameTaken,
            "email_taken" => AuthErrorKind::EmailTaken,
            "captcha_required" => AuthErrorKind::CaptchaRequired,
            "captcha_invalid" => AuthErrorKind::CaptchaInvalid,
            "unauthorized" | "session_expired" => AuthErrorKind::SessionExpired,
            "oauth_cancelled" | "access_denied" => AuthErrorKind::OAuthCancelled,
            "oauth_exchange_failed" | "exchange_failed" => AuthErrorKind::OAuthExchangeFailed,
            "state_mismatch" | "invalid_state" => AuthErrorKind::StateMismatch,
            "email_already_linked" => AuthErrorKind::EmailAlreadyLinked,
            "missing_params" => AuthErrorKind::MissingParams,
            "network_error" => AuthErrorKind::Network,
            _ => AuthErrorKind::Unknown,
        }
    }

    /// Machine-readable code, used in `?error=` query parameters.
    pub fn code(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCsrf => "invalid_csrf",
            AuthErrorKind::InvalidCredentials => "invalid_credentials",
            AuthErrorKind::UsernameTaken => "username_taken",
            AuthErrorKind::EmailTaken => "email_taken",
            AuthErrorKind::CaptchaRequired => "captcha_required",
            AuthErrorKind::CaptchaInvalid => "captcha_invalid",
            AuthErrorKind::SessionExpired => "session_expired",
            AuthErrorKind::OAuthCancelled => "oauth_cancelled",
            AuthErrorKind::OAuthExchangeFailed => "oauth_exchange_failed",
            AuthErrorKind::StateMismatch => "state_mismatch",
            AuthErrorKind::EmailAlreadyLinked => "email_already_linked",
            AuthErrorKind::MissingParams => "missing_params",
            AuthErrorKind::Network => "network_error",
            AuthErrorKind::Unknown => "unknown",
        }
    }

    /// Only session expiry is fatal to the current session.
    pub fn recoverable(&self) -> bool {
        !matches!(self, AuthErrorKind::SessionExpired)
    }

    /// Maps the kind to display copy. Never panics; unknown kinds fall
    /// through to the generic entry.
    pub fn display(&self) -> ErrorDisplay {
        match self {
            AuthErrorKind::InvalidCsrf => ErrorDisplay {
                title: "Security check failed",
                message: "Your security token was stale. It has been refreshed; please retry.",
                actions: &[ErrorAction::Retry],
                recoverable: true,
            },
            AuthErrorKind::InvalidCredentials => ErrorDisplay {
                title: "Sign-in failed",
                message: "The username or password is incorrect.",
                actions: &[ErrorAction::Retry, ErrorAction::ResetPassword],
                recoverable: true,
            },
            AuthErrorKind::UsernameTaken => ErrorDisplay {
                title: "Username unavailable",
                message: "That username is already taken.",
                actions: &[ErrorAction::Retry],
                recoverable: true,
            },
            AuthErrorKind::EmailTaken => ErrorDisplay {
                title: "Email already registered",
                message: "An account with that email already exists.",
                actions: &[ErrorAction::ResetPassword],
                recoverable: true,
            },
            AuthErrorKind::CaptchaRequired => ErrorDisplay {
                title: "Verification required",
                message: "Please complete the captcha challenge and retry.",
                actions: &[ErrorAction::Retry],
                recoverable: true,
            },
            AuthErrorKind::CaptchaInvalid => ErrorDisplay {
                title: "Verification failed",
                message: "The captcha response was rejected. Please try again.",
                actions: &[ErrorAction::Retry],
                recoverable: true,
            },
            AuthErrorKind::SessionExpired => ErrorDisplay {
                title: "Session expired",
                message: "Your session is no longer valid. Please log in again.",
                actions: &[ErrorAction::LogInAgain],
                recoverable: false,
            },
            AuthErrorKind::OAuthCancelled => ErrorDisplay {
                title: "Sign-in cancelled",
                message: "The sign-in was cancelled before completing.",
                actions: &[ErrorAction::RestartLinkFlow],
                recoverable: true,
            },
            AuthErrorKind::OAuthExchangeFailed => ErrorDisplay {
                title: "Account linking failed",
                message: "The provider could not confirm the link. Please start over.",
                actions: &[ErrorAction::RestartLinkFlow],
                recoverable: true,
            },
            AuthErrorKind::StateMismatch => ErrorDisplay {
                title: "Request could not be verified",
                message: "The link response did not match this session. Please start over.",
                actions: &[ErrorAction::RestartLinkFlow],
                recoverable: true,
            },
            AuthErrorKind::EmailAlreadyLinked => ErrorDisplay {
                title: "Email already linked",
                message: "That email is linked to another account. Reset its password to regain access.",
                actions: &[ErrorAction::ResetPassword, ErrorAction::ContactSupport],
                recoverable: true,
            },
            AuthErrorKind::MissingParams => ErrorDisplay {
                title: "Incomplete link response",
                message: "The callback was missing required parameters. Please start over.",
                actions: &[ErrorAction::RestartLinkFlow],
                recoverable: true,
            },
            AuthErrorKind::Network | AuthErrorKind::Unknown => ErrorDisplay {
                title: "Something went wrong",
                message: "An unexpected error occurred. Please try again.",
                actions: &[ErrorAction::Retry, ErrorAction::ContactSupport],
                recoverable: true,
            },
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Classified authentication error.
#[derive(Debug, Clone)]
pub struct AuthError {
    /// Error category
    pub kind: AuthErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl AuthError {
    /// Creates a new auth error.
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Classifies an HTTP failure response.
    ///
    /// The body `code` field wins when present; a bare 401 without a
    /// recognizable code means the session itself is gone.
    pub fn http_status(status: u16, body: &str) -> Self {
        if !body.is_empty()
            && let Ok(json) = serde_json::from_str::<Value>(body)
        {
            let message = json
                .get("error")
                .and_then(|v| v.as_str())
                .map_or_else(|| format!("HTTP {status}"), std::string::ToString::to_string);
            if let Some(code) = json.get("code").and_then(|v| v.as_str()) {
                return Self {
                    kind: AuthErrorKind::from_code(code),
                    message,
                    details: Some(body.to_string()),
                };
            }
            if status == 401 {
                return Self {
                    kind: AuthErrorKind::SessionExpired,
                    message,
                    details: Some(body.to_string()),
                };
            }
            return Self {
                kind: AuthErrorKind::Unknown,
                message,
                details: Some(body.to_string()),
            };
        }

        let kind = if status == 401 {
            AuthErrorKind::SessionExpired
        } else {
            AuthErrorKind::Unknown
        };
        Self {
            kind,
            message: format!("HTTP {status}"),
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Wraps a transport failure.
    pub fn network(err: &reqwest::Error) -> Self {
        Self {
            kind: AuthErrorKind::Network,
            message: "Request failed".to_string(),
            details: Some(err.to_string()),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuthError {}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: known codes classify to their kinds.
    #[test]
    fn test_from_code_known() {
        assert_eq!(
            AuthErrorKind::from_code("invalid_credentials"),
            AuthErrorKind::InvalidCredentials
        );
        assert_eq!(
            AuthErrorKind::from_code("state_mismatch"),
            AuthErrorKind::StateMismatch
        );
        assert_eq!(
            AuthErrorKind::from_code("session_expired"),
            AuthErrorKind::SessionExpired
        );
    }

    /// Test: unrecognized codes degrade to the fallback entry, never panic.
    #[test]
    fn test_from_code_unknown_degrades() {
        let kind = AuthErrorKind::from_code("totally_new_backend_code");
        assert_eq!(kind, AuthErrorKind::Unknown);
        assert_eq!(kind.display().title, "Something went wrong");
        assert!(kind.display().recoverable);
    }

    /// Test: code() and from_code() agree for every kind that has a code.
    #[test]
    fn test_code_roundtrip() {
        let kinds = [
            AuthErrorKind::InvalidCsrf,
            AuthErrorKind::InvalidCredentials,
            AuthErrorKind::UsernameTaken,
            AuthErrorKind::EmailTaken,
            AuthErrorKind::CaptchaRequired,
            AuthErrorKind::CaptchaInvalid,
            AuthErrorKind::SessionExpired,
            AuthErrorKind::OAuthCancelled,
            AuthErrorKind::OAuthExchangeFailed,
            AuthErrorKind::StateMismatch,
            AuthErrorKind::EmailAlreadyLinked,
            AuthErrorKind::MissingParams,
            AuthErrorKind::Network,
        ];
        for kind in kinds {
            assert_eq!(AuthErrorKind::from_code(kind.code()), kind);
        }
    }

    /// Test: session expiry is the only non-recoverable kind.
    #[test]
    fn test_only_session_expiry_is_fatal() {
        assert!(!AuthErrorKind::SessionExpired.recoverable());
        assert!(!AuthErrorKind::SessionExpired.display().recoverable);
        assert!(AuthErrorKind::InvalidCsrf.recoverable());
        assert!(AuthErrorKind::EmailAlreadyLinked.recoverable());
    }

    /// Test: email-already-linked offers password reset, not retry.
    #[test]
    fn test_email_linked_offers_reset() {
        let display = AuthErrorKind::EmailAlreadyLinked.display();
        assert!(display.actions.contains(&ErrorAction::ResetPassword));
        assert!(!display.actions.contains(&ErrorAction::Retry));
    }

    /// Test: HTTP classification prefers the body code over the status.
    #[test]
    fn test_http_status_body_code_wins() {
        let err = AuthError::http_status(401, r#"{"error":"Bad login","code":"invalid_credentials"}"#);
        assert_eq!(err.kind, AuthErrorKind::InvalidCredentials);
        assert_eq!(err.message, "Bad login");
    }

    /// Test: bare 401 without a code means the session is gone.
    #[test]
    fn test_http_status_bare_401() {
        let err = AuthError::http_status(401, "");
        assert_eq!(err.kind, AuthErrorKind::SessionExpired);

        let err = AuthError::http_status(401, r#"{"error":"Unauthorized"}"#);
        assert_eq!(err.kind, AuthErrorKind::SessionExpired);
    }

    /// Test: non-JSON failure bodies do not break classification.
    #[test]
    fn test_http_status_plain_body() {
        let err = AuthError::http_status(500, "internal server error");
        assert_eq!(err.kind, AuthErrorKind::Unknown);
        assert_eq!(err.message, "HTTP 500");
    }
}
