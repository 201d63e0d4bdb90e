use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Style buckets available for `bgMusic.style`. Empty when no music
/// repository is configured.
pub async fn list_music_styles_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let styles = match state.preparer.music() {
        Some(music) => music.styles().await?,
        None => Vec::new(),
    };
    Ok(Json(json!({ "styles": styles })))
}

pub async fn list_voices_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let speech = state
        .voices
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Speech provider is not configured"))?;
    let voices = speech.list_voices().await?;
    Ok(Json(json!({ "voices": voices })))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeJobs": state.queue.active_count(),
        "pendingJobs": state.queue.pending_count(),
    }))
}
