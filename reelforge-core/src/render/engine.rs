use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::job::JobId;
use crate::error::{ProviderError, RenderError};

/// Everything the engine needs to produce one video file.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub job_id: JobId,
    pub composition_id: String,
    pub input_props: Value,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub output_path: PathBuf,
}

/// Callback the engine invokes with fractional progress in `[0, 1]`.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(f64) + Send + Sync>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// A reporter that drops every update.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, fraction: f64) {
        if fraction.is_finite() {
            (self.sink)(fraction.clamp(0.0, 1.0));
        }
    }
}

/// Headless renderer walking a composition frame by frame.
///
/// Implementations must return once `cancel` fires; `RenderError::Cancelled`
/// is the expected result in that case.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(
        &self,
        request: RenderRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<(), RenderError>;
}

/// Outbound notification sink for terminal job states.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(
        &self,
        url: &str,
        payload: &super::WebhookPayload,
    ) -> Result<(), ProviderError>;
}
