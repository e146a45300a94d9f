//! Navigation targets returned by auth operations.
//!
//! The core never performs redirects itself. Operations return where the
//! host surface should go next, which makes ordering between side effects
//! and the redirect a structural guarantee instead of a timing one.

use crate::error::AuthErrorKind;

/// Where the host should navigate after an operation settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Login page, after logout or session expiry.
    Login,
    /// Authenticated landing route.
    Profile,
    /// Characters tab with the auto-sync success indicator.
    ProfileCharactersAutoSync,
    /// Profile page carrying a machine-readable error code.
    ProfileError(AuthErrorKind),
    /// External provider redirect (opaque URL issued by the backend).
    External(String),
}

impl Navigation {
    /// Renders the in-app path (or external URL) for this target.
    pub fn to_path(&self) -> String {
        match self {
            Navigation::Login => "/login".to_string(),
            Navigation::Profile => "/profile".to_string(),
            Navigation::ProfileCharactersAutoSync => {
                "/profile?tab=characters&success=auto_sync".to_string()
            }
            Navigation::ProfileError(kind) => format!("/profile?error={}", kind.code()),
            Navigation::External(url) => url.clone(),
        }
    }
}
