//! Linkstash API Gateway
//!
//! The single external entry point. Wires the document store, scraper, chat
//! provider, and auth machinery together and exposes them over HTTP.
//! Everything behind the router is held by `Arc` handles in [`AppState`];
//! there is no global state anywhere in the workspace.

pub mod handlers;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use linkstash_chat::ChatProvider;
use linkstash_common::{
    auth::{JwtManager, Mailer, OtpStore},
    config::AppConfig,
};
use linkstash_store::{DocumentStore, PermaStore};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<DocumentStore>,
    pub remote: Arc<dyn PermaStore>,
    pub chat: Arc<dyn ChatProvider>,
    pub jwt: Arc<JwtManager>,
    pub otp: Arc<OtpStore>,
    pub mailer: Arc<dyn Mailer>,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // The JwtManager rides in request extensions so the OwnerContext
    // extractor can reach it without knowing the concrete state type
    let jwt = state.jwt.clone();

    // Requests that outlive server.request_timeout_secs get a 408
    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Auth endpoints
        .route("/auth/otp/request", post(handlers::auth::request_otp))
        .route("/auth/otp/verify", post(handlers::auth::verify_otp))
        // Bookmark endpoints
        .route(
            "/bookmarks",
            post(handlers::bookmarks::add_bookmark).get(handlers::bookmarks::list_bookmarks),
        )
        .route(
            "/bookmarks/{id}",
            get(handlers::bookmarks::get_bookmark).delete(handlers::bookmarks::delete_bookmark),
        )
        // Search endpoint
        .route("/search", post(handlers::search::search))
        // Chat endpoint
        .route("/chat", post(handlers::chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .layer(Extension(jwt))
        .with_state(state)
}
