//! OAuth account-link callback reconciler.
//!
//! Processes the one-time return trip from the account-linking provider:
//! at most one exchange per callback navigation, cache invalidation
//! strictly before the dependent sync trigger, and every failure reduced
//! to a navigation carrying a machine-readable error code.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::caches::{CacheKey, CacheRegistry};
use crate::client::ApiClient;
use crate::error::AuthErrorKind;
use crate::navigation::Navigation;

/// Query parameters observed on the callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the app itself initiated the re-link (`auto_relink=true`
    /// appended to the return URL before the flow started).
    pub auto_relink_hint: bool,
}

impl CallbackParams {
    /// Extracts `code`, `state` and the auto-relink hint from a callback
    /// URL. Unparseable URLs yield empty params, which later surface as a
    /// missing-parameters error.
    pub fn from_url(raw: &str) -> Self {
        let Ok(url) = Url::parse(raw) else {
            return Self::default();
        };

        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" if !value.is_empty() => params.code = Some(value.into_owned()),
                "state" if !value.is_empty() => params.state = Some(value.into_owned()),
                "auto_relink" => params.auto_relink_hint = value == "true" || value == "1",
                _ => {}
            }
        }
        params
    }
}

/// Result of one processed callback navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResult {
    pub link_success: bool,
    pub auto_relink: bool,
    /// True once the dependent sync call has been issued (it may still be
    /// in flight when the host navigates).
    pub auto_sync_triggered: bool,
    /// Manual links surface an onboarding prompt instead of auto-syncing.
    pub show_onboarding: bool,
    pub battle_tag: Option<String>,
    pub navigation: Navigation,
}

impl LinkResult {
    fn failed(kind: AuthErrorKind) -> Self {
        Self {
            link_success: false,
            auto_relink: false,
            auto_sync_triggered: false,
            show_onboarding: false,
            battle_tag: None,
            navigation: Navigation::ProfileError(kind),
        }
    }
}

/// Outcome of a `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A previous evaluation already handled this navigation.
    AlreadyProcessed,
    Completed(LinkResult),
}

/// One-shot processor for a single callback navigation.
///
/// Construct one per navigation; the processed guard is never shared
/// across navigations.
pub struct CallbackReconciler {
    client: ApiClient,
    caches: Arc<CacheRegistry>,
    processed: bool,
}

impl CallbackReconciler {
    pub fn new(client: ApiClient, caches: Arc<CacheRegistry>) -> Self {
        Self {
            client,
            caches,
            processed: false,
        }
    }

    /// Drives the callback to completion.
    ///
    /// Stages: guard, validate, exchange, invalidate, sync, navigate.
    /// Each stage completes before the next is issued, so the ordering
    /// guarantees hold structurally.
    pub async fn process(&mut self, params: &CallbackParams) -> CallbackOutcome {
        // Check-and-set before any await: re-evaluations during the
        // in-flight exchange must not issue a second one.
        if self.processed {
            return CallbackOutcome::AlreadyProcessed;
        }
        self.processed = true;

        let (Some(code), Some(state)) = (params.code.as_deref(), params.state.as_deref()) else {
            warn!("link callback missing code or state; no exchange attempted");
            return CallbackOutcome::Completed(LinkResult::failed(AuthErrorKind::MissingParams));
        };

        let response = match self.client.exchange_link_callback(code, state).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, kind = %err.kind, "link exchange failed");
                return CallbackOutcome::Completed(LinkResult::failed(err.kind));
            }
        };

        if !response.linked {
            let kind = response
                .code
                .as_deref()
                .map_or(AuthErrorKind::OAuthExchangeFailed, AuthErrorKind::from_code);
            warn!(kind = %kind, "backend declined the account link");
            return CallbackOutcome::Completed(LinkResult::failed(kind));
        }

        // Either source is sufficient to enable auto-relink mode.
        let auto_relink = params.auto_relink_hint || response.auto_relink;

        // Invalidation completes here, before the sync trigger is issued.
        for key in [
            CacheKey::Characters,
            CacheKey::UserProfile,
            CacheKey::BattleNetLinkStatus,
            CacheKey::Session,
        ] {
            self.caches.invalidate(key);
        }

        let mut result = LinkResult {
            link_success: true,
            auto_relink,
            auto_sync_triggered: false,
            show_onboarding: false,
            battle_tag: response.battle_tag,
            navigation: Navigation::Profile,
        };

        if auto_relink {
            match self.client.trigger_character_sync().await {
                Ok(()) => info!("character sync triggered after auto re-link"),
                Err(err) => {
                    // The destination page reflects sync state; no retry here.
                    warn!(error = %err, "character sync trigger failed");
                }
            }
            result.auto_sync_triggered = true;
            result.navigation = Navigation::ProfileCharactersAutoSync;
        } else {
            result.show_onboarding = true;
        }

        CallbackOutcome::Completed(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: code, state and the auto-relink hint are extracted.
    #[test]
    fn test_params_from_url() {
        let params = CallbackParams::from_url(
            "https://armory.gg/auth/callback?code=abc123&state=xyz&auto_relink=true",
        );
        assert_eq!(params.code.as_deref(), Some("abc123"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert!(params.auto_relink_hint);
    }

    /// Test: missing state stays missing; empty values do not count.
    #[test]
    fn test_params_missing_state() {
        let params = CallbackParams::from_url("https://armory.gg/auth/callback?code=abc123");
        assert_eq!(params.code.as_deref(), Some("abc123"));
        assert_eq!(params.state, None);
        assert!(!params.auto_relink_hint);

        let params = CallbackParams::from_url("https://armory.gg/auth/callback?code=abc&state=");
        assert_eq!(params.state, None);
    }

    /// Test: unparseable URLs degrade to empty params.
    #[test]
    fn test_params_invalid_url() {
        assert_eq!(CallbackParams::from_url("not a url"), CallbackParams::default());
    }

    /// Test: auto_relink=1 also counts as a hint.
    #[test]
    fn test_params_numeric_hint() {
        let params =
            CallbackParams::from_url("https://armory.gg/auth/callback?code=c&state=s&auto_relink=1");
        assert!(params.auto_relink_hint);
    }
}
