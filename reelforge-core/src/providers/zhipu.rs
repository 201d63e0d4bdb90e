use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{GeneratedImage, ImageGenerator};
use crate::error::ProviderError;

const ZHIPU_IMAGES_URL: &str =
    "https://open.bigmodel.cn/api/paas/v4/images/generations";
const ZHIPU_MODEL: &str = "glm-image";
const ZHIPU_SIZE: &str = "1728x960";

pub struct ZhipuImageClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl fmt::Debug for ZhipuImageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZhipuImageClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GenerationItem>,
}

#[derive(Debug, Deserialize)]
struct GenerationItem {
    url: Option<String>,
}

impl ZhipuImageClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            endpoint: ZHIPU_IMAGES_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ImageGenerator for ZhipuImageClient {
    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<Option<GeneratedImage>, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": ZHIPU_MODEL,
                "prompt": prompt,
                "size": ZHIPU_SIZE,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                format!("Zhipu image generation failed ({status}): {body}"),
            ));
        }

        let body: GenerationResponse = response.json().await?;
        Ok(body
            .data
            .into_iter()
            .next()
            .and_then(|item| item.url)
            .filter(|url| url.starts_with("http"))
            .map(|url| GeneratedImage { url }))
    }
}
