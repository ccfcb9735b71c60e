//! Blog backend: users, posts with preview images, and per-user reactions.

pub mod auth;
pub mod config;
pub mod dto;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod notify;
pub mod routes;
pub mod services;
pub mod states;
pub mod store;

pub use states::AppState;

use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use errors::ApiError;
use routes::{
    health::health_check,
    post::{create_post, get_single_post, list_posts, react_to_post, update_post},
    user::{
        forgot_password, get_current_user, login, register, request_verify_token,
        reset_password, verify,
    },
};
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Builds the full application router: `/health`, the JSON API under `/api`
/// and uploaded files under `/static`.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let request_timeout = state.config.request_timeout;
    let max_upload_bytes = state.config.max_upload_bytes;

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/request-verify-token", post(request_verify_token))
        .route("/auth/verify", post(verify))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        // Protected routes (auth required)
        .route("/users/me", get(get_current_user))
        .route(
            "/posts/single",
            get(get_single_post).post(create_post).patch(update_post),
        )
        .route("/posts/list", get(list_posts))
        .route("/posts/reaction", post(react_to_post));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::RequestTimeout
    } else {
        ApiError::InternalError(format!("Unhandled middleware error: {}", err))
    }
}
