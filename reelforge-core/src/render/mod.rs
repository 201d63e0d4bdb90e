mod engine;
mod job;
mod notify;
mod queue;

pub use engine::{
    CompletionNotifier, ProgressReporter, RenderEngine, RenderRequest,
};
pub use job::{
    CancelOutcome, JobData, JobId, JobSnapshot, JobState, WebhookPayload,
};
pub use queue::{OutputLocator, RenderQueue, RenderServices};
