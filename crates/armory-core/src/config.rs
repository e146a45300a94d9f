//! Core configuration: backend API base URL and app origin.

use anyhow::{Context, Result};

/// Environment variable overriding the backend API base URL.
pub const API_URL_ENV: &str = "ARMORY_API_URL";
/// Environment variable overriding the app origin URL.
pub const APP_URL_ENV: &str = "ARMORY_APP_URL";

const DEFAULT_API_URL: &str = "https://api.armory.gg";
const DEFAULT_APP_URL: &str = "https://armory.gg";

/// Resolved configuration for the auth core.
///
/// `app_url` is only used to construct the `Origin` header on mutating
/// requests and link-flow return targets.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub api_base_url: String,
    pub app_url: String,
}

impl CoreConfig {
    /// Builds a config from explicit URLs (trailing slashes trimmed).
    pub fn new(api_base_url: impl Into<String>, app_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_trailing_slash(&api_base_url.into()),
            app_url: trim_trailing_slash(&app_url.into()),
        }
    }

    /// Resolves config with precedence: env > default.
    ///
    /// # Errors
    /// Returns an error if an env override is not a valid URL.
    pub fn from_env() -> Result<Self> {
        let api_base_url = resolve_url(std::env::var(API_URL_ENV).ok(), DEFAULT_API_URL)
            .with_context(|| format!("Invalid URL in {API_URL_ENV}"))?;
        let app_url = resolve_url(std::env::var(APP_URL_ENV).ok(), DEFAULT_APP_URL)
            .with_context(|| format!("Invalid URL in {APP_URL_ENV}"))?;
        Ok(Self {
            api_base_url,
            app_url,
        })
    }
}

/// Resolves a URL from an optional override, falling back to the default.
fn resolve_url(override_value: Option<String>, default_url: &str) -> Result<String> {
    if let Some(value) = override_value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            url::Url::parse(trimmed).with_context(|| format!("Could not parse '{trimmed}'"))?;
            return Ok(trim_trailing_slash(trimmed));
        }
    }
    Ok(default_url.to_string())
}

fn trim_trailing_slash(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: default URLs used when no override is present.
    #[test]
    fn test_resolve_url_default() {
        let url = resolve_url(None, DEFAULT_API_URL).unwrap();
        assert_eq!(url, DEFAULT_API_URL);
    }

    /// Test: override wins and trailing slash is trimmed.
    #[test]
    fn test_resolve_url_override() {
        let url = resolve_url(Some("http://localhost:4000/".to_string()), DEFAULT_API_URL).unwrap();
        assert_eq!(url, "http://localhost:4000");
    }

    /// Test: blank override falls back to the default.
    #[test]
    fn test_resolve_url_blank_override() {
        let url = resolve_url(Some("   ".to_string()), DEFAULT_API_URL).unwrap();
        assert_eq!(url, DEFAULT_API_URL);
    }

    /// Test: invalid override is rejected.
    #[test]
    fn test_resolve_url_invalid() {
        assert!(resolve_url(Some("not a url".to_string()), DEFAULT_API_URL).is_err());
    }
}
