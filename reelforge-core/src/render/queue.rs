use std::collections::{HashMap, VecDeque};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::{
    CompletionNotifier, ProgressReporter, RenderEngine, RenderRequest,
};
use super::job::{
    CancelOutcome, JobData, JobId, JobSnapshot, JobState, WebhookPayload,
};
use super::notify::dispatch_detached;
use crate::config::RenderQueueConfig;
use crate::error::{CancelError, RenderError};
use crate::providers::MemoryProbe;

/// Where finished videos land and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct OutputLocator {
    renders_dir: PathBuf,
    public_base_url: String,
}

impl OutputLocator {
    pub fn new(
        renders_dir: PathBuf,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            renders_dir,
            public_base_url: public_base_url
                .into()
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn renders_dir(&self) -> &PathBuf {
        &self.renders_dir
    }

    pub fn video_path(&self, id: JobId) -> PathBuf {
        self.renders_dir.join(format!("{id}.mp4"))
    }

    pub fn video_url(&self, id: JobId) -> String {
        format!("{}/renders/{id}.mp4", self.public_base_url)
    }
}

/// External collaborators the scheduler drives.
#[derive(Clone)]
pub struct RenderServices {
    pub engine: Arc<dyn RenderEngine>,
    pub memory: Arc<dyn MemoryProbe>,
    pub notifier: Option<Arc<dyn CompletionNotifier>>,
}

impl fmt::Debug for RenderServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderServices")
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

impl RenderServices {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        memory: Arc<dyn MemoryProbe>,
    ) -> Self {
        Self {
            engine,
            memory,
            notifier: None,
        }
    }

    pub fn with_notifier(
        mut self,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

/// Why an in-progress render was told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortReason {
    Cancelled,
    Stalled(u64),
}

impl AbortReason {
    fn into_error(self) -> RenderError {
        match self {
            AbortReason::Cancelled => RenderError::Cancelled,
            AbortReason::Stalled(secs) => RenderError::Stalled(secs),
        }
    }
}

struct JobRecord {
    data: Arc<JobData>,
    state: JobState,
    created_at: DateTime<Utc>,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
    last_progress: Instant,
    cancel: Option<CancellationToken>,
    abort_reason: Option<AbortReason>,
}

impl JobRecord {
    fn elapsed_time(&self) -> Duration {
        match (self.elapsed, self.started_at) {
            (Some(total), _) => total,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    fn snapshot(&self, id: JobId) -> JobSnapshot {
        JobSnapshot {
            id,
            state: self.state.clone(),
            data: self.data.as_ref().clone(),
            created_at: self.created_at,
            elapsed_ms: self.elapsed_time().as_millis() as u64,
        }
    }
}

#[derive(Default)]
struct QueueState {
    jobs: HashMap<JobId, JobRecord>,
    pending: VecDeque<JobId>,
    active: usize,
}

struct QueueShared {
    config: RenderQueueConfig,
    services: RenderServices,
    output: OutputLocator,
    state: Mutex<QueueState>,
}

/// Bounded FIFO render scheduler.
///
/// Bookkeeping lives behind one mutex that is never held across an
/// `.await`; every render runs on its own task. A scheduling pass runs on
/// every enqueue and every freed slot, so there is no polling loop.
#[derive(Clone)]
pub struct RenderQueue {
    inner: Arc<QueueShared>,
}

impl fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RenderQueue")
            .field("jobs", &state.jobs.len())
            .field("pending", &state.pending.len())
            .field("active", &state.active)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl RenderQueue {
    pub fn new(
        config: RenderQueueConfig,
        services: RenderServices,
        output: OutputLocator,
    ) -> Self {
        Self {
            inner: Arc::new(QueueShared {
                config,
                services,
                output,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn output(&self) -> &OutputLocator {
        &self.inner.output
    }

    /// Enqueue a job and return its id immediately. Never blocks or fails;
    /// must be called from within a Tokio runtime since admission spawns
    /// the render task.
    pub fn create_job(&self, data: JobData) -> JobId {
        let id = JobId::new();
        {
            let mut state = self.inner.state.lock();
            state.jobs.insert(
                id,
                JobRecord {
                    data: Arc::new(data),
                    state: JobState::Queued,
                    created_at: Utc::now(),
                    started_at: None,
                    elapsed: None,
                    last_progress: Instant::now(),
                    cancel: None,
                    abort_reason: None,
                },
            );
            state.pending.push_back(id);
            info!(
                job_id = %id,
                queued = state.pending.len(),
                "render job queued"
            );
        }
        self.schedule();
        id
    }

    pub fn get_job(&self, id: JobId) -> Option<JobSnapshot> {
        let state = self.inner.state.lock();
        state.jobs.get(&id).map(|record| record.snapshot(id))
    }

    /// All known jobs, oldest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let state = self.inner.state.lock();
        let mut jobs: Vec<_> = state
            .jobs
            .iter()
            .map(|(id, record)| record.snapshot(*id))
            .collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active
    }

    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Cancel a queued or in-progress job.
    ///
    /// A queued job is deleted on the spot, so later lookups report it as
    /// missing. An in-progress job is signalled and turns `failed` once the
    /// engine observes the cancellation.
    pub fn cancel_job(&self, id: JobId) -> Result<CancelOutcome, CancelError> {
        let mut state = self.inner.state.lock();
        let queued = match state.jobs.get(&id) {
            None => return Err(CancelError::NotFound),
            Some(record) if record.state.is_terminal() => {
                return Err(CancelError::NotCancellable);
            }
            Some(record) => matches!(record.state, JobState::Queued),
        };

        if queued {
            state.jobs.remove(&id);
            state.pending.retain(|pending| *pending != id);
            info!(job_id = %id, "queued render job cancelled and removed");
            return Ok(CancelOutcome::Removed);
        }

        let record = state.jobs.get_mut(&id).ok_or(CancelError::NotFound)?;
        record.abort_reason.get_or_insert(AbortReason::Cancelled);
        if let Some(token) = &record.cancel {
            token.cancel();
        }
        info!(job_id = %id, "in-progress render job signalled to stop");
        Ok(CancelOutcome::Signalled)
    }

    /// Admit queued jobs in FIFO order while slots are free. Beyond the
    /// first active job, admission also requires free memory above the
    /// configured threshold; otherwise the head waits for the next pass.
    fn schedule(&self) {
        let limit = self.inner.config.effective_limit();
        let threshold = self.inner.config.memory_threshold_bytes;

        let admitted = {
            let mut state = self.inner.state.lock();
            let mut admitted = Vec::new();

            while state.active < limit {
                let Some(&head) = state.pending.front() else {
                    break;
                };

                if state.active > 0 {
                    let available =
                        self.inner.services.memory.available_bytes();
                    if available < threshold {
                        debug!(
                            job_id = %head,
                            available_bytes = available,
                            threshold_bytes = threshold,
                            active = state.active,
                            "deferring admission: low free memory"
                        );
                        break;
                    }
                }

                state.pending.pop_front();
                let Some(record) = state.jobs.get_mut(&head) else {
                    continue;
                };
                let token = CancellationToken::new();
                let now = Instant::now();
                record.state = JobState::InProgress { progress: 0.0 };
                record.started_at = Some(now);
                record.last_progress = now;
                record.cancel = Some(token.clone());
                let data = Arc::clone(&record.data);
                state.active += 1;
                admitted.push((head, data, token));
            }
            admitted
        };

        for (id, data, token) in admitted {
            info!(
                job_id = %id,
                composition = %data.composition_id,
                "render job admitted"
            );
            let queue = self.clone();
            tokio::spawn(async move { queue.execute(id, data, token).await });
        }
    }

    async fn execute(
        self,
        id: JobId,
        data: Arc<JobData>,
        token: CancellationToken,
    ) {
        let watchdog = self.spawn_watchdog(id, token.clone());

        let progress = {
            let queue = self.clone();
            ProgressReporter::new(move |fraction| {
                queue.record_progress(id, fraction)
            })
        };
        let output_path = self.inner.output.video_path(id);
        let request = RenderRequest {
            job_id: id,
            composition_id: data.composition_id.clone(),
            input_props: data.input_props.clone(),
            width: data.width,
            height: data.height,
            output_path: output_path.clone(),
        };

        let render = self
            .inner
            .services
            .engine
            .render(request, progress, token.clone());
        let result = match AssertUnwindSafe(render).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(RenderError::Engine(format!(
                "render engine panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        watchdog.abort();

        let notification = self.finish(id, &data, result, output_path);
        if let (Some(url), Some(payload)) =
            (data.webhook_url.clone(), notification)
        {
            match &self.inner.services.notifier {
                Some(notifier) => {
                    dispatch_detached(Arc::clone(notifier), url, payload);
                }
                None => warn!(
                    job_id = %id,
                    "webhook requested but no notifier configured"
                ),
            }
        }

        self.schedule();
    }

    /// Record the terminal state, release the slot and return the webhook
    /// payload for it.
    fn finish(
        &self,
        id: JobId,
        data: &JobData,
        result: Result<(), RenderError>,
        output_path: PathBuf,
    ) -> Option<WebhookPayload> {
        let mut state = self.inner.state.lock();
        state.active = state.active.saturating_sub(1);
        let record = state.jobs.get_mut(&id)?;

        record.elapsed = Some(record.elapsed_time());
        record.cancel = None;
        record.state = match result {
            Ok(()) => {
                let video_url = self.inner.output.video_url(id);
                info!(
                    job_id = %id,
                    elapsed_ms = record.elapsed_time().as_millis() as u64,
                    "render job completed"
                );
                JobState::Completed {
                    video_url,
                    output_location: output_path.display().to_string(),
                }
            }
            Err(err) => {
                let err = match record.abort_reason {
                    Some(reason) => reason.into_error(),
                    None => err,
                };
                error!(job_id = %id, error = %err, "render job failed");
                JobState::Failed {
                    error: err.to_string(),
                }
            }
        };

        WebhookPayload::for_state(id, &record.state, data)
    }

    fn record_progress(&self, id: JobId, fraction: f64) {
        let mut state = self.inner.state.lock();
        if let Some(record) = state.jobs.get_mut(&id)
            && let JobState::InProgress { progress } = &mut record.state
        {
            *progress = fraction;
            record.last_progress = Instant::now();
        }
    }

    /// Abort the job if it has been silent longer than the stall timeout.
    /// Returns true once the job was aborted.
    fn check_stalled(&self, id: JobId) -> bool {
        let timeout = self.inner.config.stall_timeout();
        let mut state = self.inner.state.lock();
        let Some(record) = state.jobs.get_mut(&id) else {
            return true;
        };
        if !matches!(record.state, JobState::InProgress { .. }) {
            return true;
        }
        let silent_for = record.last_progress.elapsed();
        if silent_for < timeout {
            return false;
        }

        warn!(
            job_id = %id,
            silent_secs = silent_for.as_secs(),
            "render stalled; aborting"
        );
        record
            .abort_reason
            .get_or_insert(AbortReason::Stalled(timeout.as_secs()));
        if let Some(token) = &record.cancel {
            token.cancel();
        }
        true
    }

    fn spawn_watchdog(
        &self,
        id: JobId,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let queue = self.clone();
        let tick = self.inner.config.watchdog_tick();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + tick, tick);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if queue.check_stalled(id) {
                            break;
                        }
                    }
                }
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
