//! Completion webhooks.
//!
//! Delivery is a detached task: the payload is posted exactly once, the
//! outcome is logged, and nothing is retried. Job state is final before
//! dispatch and is never touched by the delivery result.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::engine::CompletionNotifier;
use super::job::WebhookPayload;

pub(crate) fn dispatch_detached(
    notifier: Arc<dyn CompletionNotifier>,
    url: String,
    payload: WebhookPayload,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&url, &payload).await {
            Ok(()) => info!(
                job_id = %payload.job_id,
                status = %payload.status,
                "webhook delivered"
            ),
            Err(err) => warn!(
                job_id = %payload.job_id,
                webhook = %url,
                error = %err,
                "webhook delivery failed; not retrying"
            ),
        }
    })
}
