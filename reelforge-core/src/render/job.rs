use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Render job identifier (UUIDv7, so ids sort by submission time).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// What to render. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    pub composition_id: String,
    #[serde(default)]
    pub input_props: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl JobData {
    pub fn new(composition_id: impl Into<String>, input_props: Value) -> Self {
        Self {
            composition_id: composition_id.into(),
            input_props,
            webhook_url: None,
            width: None,
            height: None,
        }
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Lifecycle of a job. Queued jobs cancelled before admission are removed
/// outright rather than transitioning to a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum JobState {
    Queued,
    InProgress {
        progress: f64,
    },
    Completed {
        video_url: String,
        output_location: String,
    },
    Failed {
        error: String,
    },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::InProgress { .. } => "in-progress",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

/// Point-in-time view of a job for callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    #[serde(flatten)]
    pub state: JobState,
    pub data: JobData,
    pub created_at: DateTime<Utc>,
    /// Time spent rendering so far (or in total, once terminal).
    pub elapsed_ms: u64,
}

/// Result of a successful cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was still queued and has been deleted.
    Removed,
    /// The engine was signalled; the job fails once the abort lands.
    Signalled,
}

/// Body posted to a job's webhook on completion or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub job_id: JobId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub original_props: Value,
}

impl WebhookPayload {
    /// `None` for non-terminal states.
    pub fn for_state(id: JobId, state: &JobState, data: &JobData) -> Option<Self> {
        let (video_url, error) = match state {
            JobState::Completed { video_url, .. } => {
                (Some(video_url.clone()), None)
            }
            JobState::Failed { error } => (None, Some(error.clone())),
            _ => return None,
        };
        Some(Self {
            job_id: id,
            status: state.label().to_string(),
            video_url,
            error,
            original_props: data.input_props.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn state_serializes_with_status_tag() {
        let state = JobState::InProgress { progress: 0.5 };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "status": "in-progress", "progress": 0.5 })
        );

        let state = JobState::Completed {
            video_url: "http://host/renders/a.mp4".into(),
            output_location: "/data/renders/a.mp4".into(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "status": "completed",
                "videoUrl": "http://host/renders/a.mp4",
                "outputLocation": "/data/renders/a.mp4",
            })
        );
    }

    #[test]
    fn webhook_payload_only_for_terminal_states() {
        let id = JobId::new();
        let data = JobData::new("Intro", json!({ "title": "x" }));
        assert!(
            WebhookPayload::for_state(id, &JobState::Queued, &data).is_none()
        );

        let failed = JobState::Failed {
            error: "boom".into(),
        };
        let payload = WebhookPayload::for_state(id, &failed, &data).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "jobId": id.to_string(),
                "status": "failed",
                "error": "boom",
                "originalProps": { "title": "x" },
            })
        );
    }

    #[test]
    fn job_data_reads_submission_shape() {
        let data: JobData = serde_json::from_value(json!({
            "compositionId": "MasterSequence",
            "inputProps": { "scenes": [] },
            "webhookUrl": "https://hooks.example/done",
            "width": 1080,
        }))
        .unwrap();
        assert_eq!(data.width, Some(1080));
        assert_eq!(data.height, None);
        assert_eq!(
            data.webhook_url.as_deref(),
            Some("https://hooks.example/done")
        );
    }
}
