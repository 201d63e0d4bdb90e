use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;

use reelforge_core::enrich::EnrichmentResult;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichScenesRequest {
    pub scenes: Vec<Value>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub compute_duration: bool,
}

/// Run enrichment without queueing a render. Individual scene failures are
/// absorbed, so a well-formed request always yields a full result.
pub async fn enrich_scenes_handler(
    State(state): State<AppState>,
    payload: Result<Json<EnrichScenesRequest>, JsonRejection>,
) -> AppResult<Json<EnrichmentResult>> {
    let Json(request) =
        payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let voice = request.voice.unwrap_or_default();
    let result = state
        .preparer
        .pipeline()
        .enrich_values(request.scenes, &voice, request.compute_duration)
        .await;

    Ok(Json(result))
}
