//! End-to-end route tests over in-memory collaborators
//!
//! The router is exercised with `tower::ServiceExt::oneshot`; the permanent
//! store, scraper, chat provider, and mailer are all the in-process
//! implementations, so these tests cover the full request path without any
//! network access.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use linkstash_chat::StubChatProvider;
use linkstash_common::{
    auth::{JwtManager, Mailer, OtpStore},
    config::AppConfig,
    errors::Result,
};
use linkstash_gateway::{create_router, AppState};
use linkstash_scrape::StubScraper;
use linkstash_store::{DocumentStore, MemoryPermaStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Mailer that captures the last issued code instead of sending it
#[derive(Default)]
struct CapturingMailer {
    last_code: Mutex<Option<String>>,
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_otp(&self, _email: &str, code: &str) -> Result<()> {
        *self.last_code.lock().await = Some(code.to_string());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    mailer: Arc<CapturingMailer>,
}

fn test_app() -> TestApp {
    let mailer = Arc::new(CapturingMailer::default());
    let remote = Arc::new(MemoryPermaStore::new());
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        store: Arc::new(DocumentStore::new(Arc::new(StubScraper), remote.clone())),
        remote,
        chat: Arc::new(StubChatProvider),
        jwt: Arc::new(JwtManager::new("test-secret", 3600)),
        otp: Arc::new(OtpStore::new(600, 5)),
        mailer: mailer.clone(),
    };

    TestApp {
        router: create_router(state),
        mailer,
    }
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Run the full OTP flow and return a bearer token
async fn authenticate(app: &TestApp, email: &str) -> String {
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            json!({ "email": email }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let code = app.mailer.last_code.lock().await.clone().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            json!({ "email": email, "code": code }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    body_json(response).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let response = app.router.clone().oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let response = app.router.clone().oneshot(get_request("/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ready");
}

#[tokio::test]
async fn test_bookmark_lifecycle_with_auth() {
    let app = test_app();
    let token = authenticate(&app, "user@example.com").await;

    // Add
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookmarks",
            json!({ "url": "https://example.com/article" }),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["url"], "https://example.com/article");
    // The projection omits content
    assert!(created.get("content").is_none());

    // List
    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookmarks", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed["bookmarks"].as_array().unwrap().len(), 1);
    assert_eq!(listed["stats"]["document_count"], 1);

    // Get (full document, content included)
    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/bookmarks/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert!(fetched["content"].as_str().unwrap().len() > 0);

    // Delete
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/bookmarks/{}", id))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Gone
    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookmarks", Some(&token)))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert!(listed["bookmarks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_without_auth_is_401() {
    let app = test_app();

    // Add in legacy mode (no Authorization header)
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookmarks",
            json!({ "url": "https://example.com/a" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/bookmarks/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "AUTH_REQUIRED");

    // The bookmark is still there
    let response = app.router.clone().oneshot(get_request("/bookmarks", None)).await.unwrap();
    assert_eq!(body_json(response).await["bookmarks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookmarks", Some("not-a-valid-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_url_is_400() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookmarks",
            json!({ "url": "not a url" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_otp_code_is_401() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            json!({ "email": "user@example.com" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let issued = app.mailer.last_code.lock().await.clone().unwrap();
    let wrong = if issued == "000000" { "111111" } else { "000000" };

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            json!({ "email": "user@example.com", "code": wrong }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_OTP");
}

#[tokio::test]
async fn test_owners_do_not_see_each_other() {
    let app = test_app();
    let token_a = authenticate(&app, "a@example.com").await;
    let token_b = authenticate(&app, "b@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookmarks",
            json!({ "url": "https://example.com/private" }),
            Some(&token_a),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookmarks", Some(&token_b)))
        .await
        .unwrap();
    assert!(body_json(response).await["bookmarks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_returns_ranked_summaries() {
    let app = test_app();
    let token = authenticate(&app, "user@example.com").await;

    for url in [
        "https://example.com/rust-guide",
        "https://example.com/cooking",
    ] {
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/bookmarks", json!({ "url": url }), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/search",
            json!({ "query": "rust-guide" }),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(
        body["results"][0]["url"],
        "https://example.com/rust-guide"
    );
}

#[tokio::test]
async fn test_chat_answers_with_sources() {
    let app = test_app();
    let token = authenticate(&app, "user@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookmarks",
            json!({ "url": "https://example.com/rust-guide" }),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/chat",
            json!({ "message": "rust-guide" }),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["answer"].as_str().unwrap().contains("rust-guide"));
    assert_eq!(body["sources"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_bookmark_is_404() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookmarks/no-such-id", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "DOCUMENT_NOT_FOUND");
}
