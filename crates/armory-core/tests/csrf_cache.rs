//! Integration tests for the CSRF token cache against a mocked backend.

use std::time::{Duration, SystemTime};

use armory_core::config::CoreConfig;
use armory_core::csrf::{CsrfCache, TOKEN_LIFETIME};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cache_for(server: &MockServer) -> CsrfCache {
    CsrfCache::new(&CoreConfig::new(server.uri(), "https://armory.gg"))
}

/// Test: the token is fetched once and served from cache afterwards.
#[tokio::test]
async fn test_get_token_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    assert_eq!(cache.get_token(false).await.as_deref(), Some("tok-1"));
    assert_eq!(cache.get_token(false).await.as_deref(), Some("tok-1"));
}

/// Test: force refresh always refetches and replaces the cached value.
#[tokio::test]
async fn test_force_refresh_always_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
        .expect(2)
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    assert!(cache.get_token(false).await.is_some());
    let before = cache.expires_at().unwrap();
    assert!(cache.get_token(true).await.is_some());
    let after = cache.expires_at().unwrap();
    assert!(after >= before, "expiry must be replaced on forced refresh");
}

/// Test: expiry lands one hour after warming.
#[tokio::test]
async fn test_expiry_one_hour_from_warming() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    let warmed_at = SystemTime::now();
    cache.get_token(false).await.unwrap();

    let expires_at = cache.expires_at().unwrap();
    let lower = warmed_at + TOKEN_LIFETIME - Duration::from_secs(10);
    let upper = warmed_at + TOKEN_LIFETIME + Duration::from_secs(10);
    assert!(expires_at >= lower && expires_at <= upper);
}

/// Test: fetch failure fails closed with `None` and an empty cache.
#[tokio::test]
async fn test_fetch_failure_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    assert_eq!(cache.get_token(false).await, None);
    assert!(!cache.has_token());
}

/// Test: a cleared cache refetches on the next read.
#[tokio::test]
async fn test_clear_then_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
        .expect(2)
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    assert!(cache.get_token(false).await.is_some());
    cache.clear_token();
    assert!(!cache.has_token());
    assert!(cache.get_token(false).await.is_some());
}
