//! Reelforge HTTP service: accepts render submissions, enriches video
//! scripts before queueing them, and serves finished videos and cached
//! audio back to clients and the renderer.

pub mod handlers;
pub mod infra;
pub mod routes;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use infra::app_state::AppState;

pub fn create_app(state: AppState) -> Router {
    routes::create_router(&state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
