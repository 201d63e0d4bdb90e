use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::render::{CompletionNotifier, WebhookPayload};

/// JSON `POST` of the completion payload to the job's webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CompletionNotifier for WebhookNotifier {
    async fn notify(
        &self,
        url: &str,
        payload: &WebhookPayload,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!(
                "webhook {url} answered {status}"
            )))
        }
    }
}
