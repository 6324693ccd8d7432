use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/podcast/:kind", get(handlers::get_podcast))
        .route("/podcast/:kind/download", get(handlers::download))
        // Session lifecycle
        .route("/podcast/:kind/session", post(handlers::open_session))
        .route("/podcast/:kind/regenerate", post(handlers::regenerate))
        // Playback control
        .route("/podcast/:kind/play", post(handlers::play))
        .route("/podcast/:kind/pause", post(handlers::pause))
        .route("/podcast/:kind/toggle", post(handlers::toggle))
        .route("/podcast/:kind/seek", post(handlers::seek))
        .route("/podcast/:kind/volume", post(handlers::volume))
        .route("/podcast/:kind/mute", post(handlers::mute))
        // The dashboard runs on another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
