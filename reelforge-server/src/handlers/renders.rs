use axum::{
    Json,
    extract::{Path, Request, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

use reelforge_core::render::{CancelOutcome, JobData, JobId};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

const JOB_NOT_FOUND: &str = "Job not found";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRenderRequest {
    #[serde(default)]
    pub composition_id: Option<String>,
    #[serde(default)]
    pub input_props: Option<Value>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRenderResponse {
    pub job_id: JobId,
}

/// Enrich the submitted props when the composition calls for it, then
/// enqueue. The caller gets the id back immediately; the render outcome
/// is only visible through polling or the webhook.
pub async fn create_render_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateRenderRequest>, JsonRejection>,
) -> AppResult<Json<CreateRenderResponse>> {
    let Json(request) =
        payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let composition_id = request
        .composition_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("compositionId is required"))?;

    let input_props = request.input_props.unwrap_or_else(|| json!({}));
    let input_props = state
        .preparer
        .prepare(&composition_id, input_props)
        .await;

    let mut data = JobData::new(composition_id, input_props);
    if let Some(url) = request.webhook_url.filter(|url| !url.trim().is_empty())
    {
        data = data.with_webhook(url);
    }
    data.width = request.width;
    data.height = request.height;

    let job_id = state.queue.create_job(data);
    Ok(Json(CreateRenderResponse { job_id }))
}

/// `GET /renders/{id}` answers with the job snapshot, while
/// `GET /renders/{id}.mp4` streams the finished video.
pub async fn get_render_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    if let Some(stem) = id.strip_suffix(".mp4") {
        let job_id: JobId = stem
            .parse()
            .map_err(|_| AppError::not_found("Video not found"))?;
        let path = state.queue.output().video_path(job_id);
        let response = ServeFile::new(path)
            .oneshot(request)
            .await
            .map_err(|err| AppError::internal(err.to_string()))?;
        return Ok(response.into_response());
    }

    let job_id: JobId =
        id.parse().map_err(|_| AppError::not_found(JOB_NOT_FOUND))?;
    let job = state
        .queue
        .get_job(job_id)
        .ok_or_else(|| AppError::not_found(JOB_NOT_FOUND))?;
    Ok(Json(job).into_response())
}

pub async fn cancel_render_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let job_id: JobId =
        id.parse().map_err(|_| AppError::not_found(JOB_NOT_FOUND))?;

    let message = match state.queue.cancel_job(job_id)? {
        CancelOutcome::Removed => "Job removed from queue",
        CancelOutcome::Signalled => "Job cancellation requested",
    };
    info!(job_id = %job_id, message, "render cancel request handled");

    Ok(Json(json!({ "message": message })))
}
