use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{GeneratedImage, ImageGenerator, SpeechSynthesizer};
use crate::error::ProviderError;

const COZE_API_BASE: &str = "https://api.coze.cn/v1";
const COZE_WORKFLOW_URL: &str =
    "https://auto.kanglan.vip/cozeapi/coze/runWorkflow";

/// Coze text-to-speech over bearer-token auth.
pub struct CozeSpeechClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl fmt::Debug for CozeSpeechClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CozeSpeechClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A voice offered by the speech endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_audio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CozeEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VoiceList {
    #[serde(default)]
    voice_list: Vec<Voice>,
}

impl CozeSpeechClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            base_url: COZE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn list_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/audio/voices", self.base_url))
            .bearer_auth(&self.token)
            .query(&[
                ("filter_system_voice", "false"),
                ("model_type", "big"),
                ("page_num", "1"),
                ("page_size", "100"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                format!("Coze voices request failed ({status}): {body}"),
            ));
        }

        let envelope: CozeEnvelope<VoiceList> = response.json().await?;
        if envelope.code != 0 {
            return Err(ProviderError::ApiError(format!(
                "Coze returned code {}: {}",
                envelope.code, envelope.msg
            )));
        }
        Ok(envelope.data.map(|d| d.voice_list).unwrap_or_default())
    }
}

#[async_trait]
impl SpeechSynthesizer for CozeSpeechClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        debug!(voice, chars = text.chars().count(), "requesting Coze speech");
        let response = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "input": text,
                "voice_id": voice,
                "response_format": "mp3",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                format!("Coze TTS failed ({status}): {body}"),
            ));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::ParseError(
                "Coze TTS returned an empty body".into(),
            ));
        }
        Ok(bytes.to_vec())
    }
}

/// Image generation through a hosted Coze workflow.
pub struct CozeWorkflowImageClient {
    http: reqwest::Client,
    token: String,
    workflow_id: String,
    endpoint: String,
}

impl fmt::Debug for CozeWorkflowImageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CozeWorkflowImageClient")
            .field("workflow_id", &self.workflow_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl CozeWorkflowImageClient {
    pub fn new(
        http: reqwest::Client,
        token: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            workflow_id: workflow_id.into(),
            endpoint: COZE_WORKFLOW_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// The workflow nests its answer three `data` levels deep and sometimes
/// wraps the URL in backticks.
fn workflow_image_url(body: &Value) -> Option<String> {
    let raw = body
        .pointer("/data/data/data/image")
        .and_then(Value::as_str)?;
    let cleaned = raw.replace('`', "");
    let cleaned = cleaned.trim();
    cleaned.starts_with("http").then(|| cleaned.to_string())
}

#[async_trait]
impl ImageGenerator for CozeWorkflowImageClient {
    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<Option<GeneratedImage>, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({
                "token": self.token,
                "user_token": self.token,
                "workflow_id": self.workflow_id,
                "parameters": { "style": "横屏", "prompt": prompt },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                format!("Coze workflow failed ({status}): {body}"),
            ));
        }

        let body: Value = response.json().await?;
        match workflow_image_url(&body) {
            Some(url) => Ok(Some(GeneratedImage { url })),
            None => {
                warn!(prompt, "Coze workflow returned no usable image URL");
                Ok(None)
            }
        }
    }
}
