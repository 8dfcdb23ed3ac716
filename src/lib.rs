//! Feedline
//!
//! Social feed service: posts, comments, likes, notifications, profiles,
//! local search and an ad-interleaved feed over a SQLite document store.

pub mod api;
pub mod auth;
pub mod comments;
pub mod config;
pub mod counters;
pub mod db;
pub mod errors;
pub mod feed;
pub mod format;
pub mod likes;
pub mod links;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod search;
pub mod session;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::DocumentStore;
use search::UserDebouncers;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub config: Arc<Config>,
    pub debouncers: Arc<UserDebouncers>,
}

impl AppState {
    pub fn new(store: DocumentStore, config: Config) -> Self {
        Self {
            debouncers: Arc::new(UserDebouncers::new(config.search_debounce)),
            store,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        .route("/session", post(api::sign_in))
        // Posts
        .route("/posts", get(api::list_posts).post(api::create_post))
        .route("/posts/stats", get(api::post_stats))
        .route(
            "/posts/{id}",
            get(api::get_post).put(api::update_post).delete(api::delete_post),
        )
        .route("/posts/{id}/share", post(api::share_post))
        .route(
            "/posts/{id}/like",
            get(api::post_like_status).post(api::toggle_post_like),
        )
        .route("/posts/{id}/likes", get(api::post_likes))
        .route("/likes/check", post(api::check_likes))
        // Comments
        .route(
            "/posts/{id}/comments",
            get(api::list_comments).post(api::create_comment),
        )
        .route(
            "/posts/{id}/comments/{cid}",
            put(api::update_comment).delete(api::delete_comment),
        )
        .route(
            "/posts/{id}/comments/{cid}/like",
            get(api::comment_like_status).post(api::toggle_comment_like),
        )
        .route(
            "/posts/{id}/comments/{cid}/replies",
            get(api::list_replies).post(api::create_reply),
        )
        // Feed, ads, search
        .route("/feed", get(api::get_feed))
        .route("/ads", post(api::create_ad))
        .route("/search", get(api::search_feed))
        // Notifications
        .route(
            "/notifications",
            get(api::list_notifications).post(api::create_notification),
        )
        .route(
            "/notifications/read-all",
            post(api::mark_all_notifications_read),
        )
        .route(
            "/notifications/unread-count",
            get(api::unread_notification_count),
        )
        .route(
            "/notifications/{id}/read",
            post(api::mark_notification_read),
        )
        // Profile
        .route("/profile", get(api::get_profile).put(api::update_profile))
        .route("/profile/liked", get(api::liked_posts))
        .route("/users/{uid}/posts", get(api::user_posts))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
