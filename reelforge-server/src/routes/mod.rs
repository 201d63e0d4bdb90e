use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{handlers, infra::app_state::AppState};

/// Render submission and status routes.
fn render_routes() -> Router<AppState> {
    Router::new()
        .route("/renders", post(handlers::create_render_handler))
        .route(
            "/renders/{id}",
            get(handlers::get_render_handler)
                .delete(handlers::cancel_render_handler),
        )
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/music/styles", get(handlers::list_music_styles_handler))
        .route("/voices", get(handlers::list_voices_handler))
        .route("/scenes/enrich", post(handlers::enrich_scenes_handler))
}

/// Every route the service exposes, including the cached audio that
/// rendered compositions reference by URL.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(render_routes())
        .nest("/api", api_routes())
        .nest_service("/audio", ServeDir::new(state.config.storage.audio_dir()))
}
