//! Hand-written doubles shared by the core integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use reelforge_core::error::{ProviderError, RenderError};
use reelforge_core::providers::{
    DurationProbe, MemoryProbe, MusicRepository, RemoteTrack,
    SpeechSynthesizer, StockVideo, StockVideoSearch,
};
use reelforge_core::render::{
    CompletionNotifier, ProgressReporter, RenderEngine, RenderRequest,
    WebhookPayload,
};

/// Poll `condition` until it holds. Under a paused clock the deadline is
/// virtual, so watchdog timeouts elapse instantly.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(120);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// Speech double that counts calls and returns the text as "audio".
#[derive(Debug, Default)]
pub struct CountingSpeech {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingSpeech {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for CountingSpeech {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::ApiError("tts offline".into()));
        }
        Ok(format!("{voice}:{text}").into_bytes())
    }
}

/// Reports the same duration for every file.
#[derive(Debug)]
pub struct FixedProbe(pub f64);

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn probe_seconds(&self, _path: &Path) -> Result<f64, ProviderError> {
        Ok(self.0)
    }
}

/// Stock search that never finds anything.
#[derive(Debug, Default)]
pub struct EmptyVideoSearch {
    calls: AtomicUsize,
}

impl EmptyVideoSearch {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StockVideoSearch for EmptyVideoSearch {
    async fn search_video(
        &self,
        _query: &str,
        _min_duration_secs: u32,
    ) -> Result<Option<StockVideo>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

/// Music repository backed by a fixed track list.
#[derive(Debug, Default)]
pub struct StaticMusic {
    pub tracks: Vec<RemoteTrack>,
}

#[async_trait]
impl MusicRepository for StaticMusic {
    async fn list_styles(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["calm".into(), "epic".into()])
    }

    async fn list_tracks(
        &self,
        _style: &str,
    ) -> Result<Vec<RemoteTrack>, ProviderError> {
        Ok(self.tracks.clone())
    }

    async fn fetch_track(&self, path: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(path.as_bytes().to_vec())
    }
}

/// Free-memory reading the test can change at will.
#[derive(Debug)]
pub struct SettableMemory(AtomicU64);

impl SettableMemory {
    pub fn new(bytes: u64) -> Self {
        Self(AtomicU64::new(bytes))
    }

    pub fn set(&self, bytes: u64) {
        self.0.store(bytes, Ordering::SeqCst);
    }
}

impl MemoryProbe for SettableMemory {
    fn available_bytes(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Engine whose renders block until the test releases them one by one.
#[derive(Debug)]
pub struct GatedEngine {
    release: Semaphore,
    started: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for GatedEngine {
    fn default() -> Self {
        Self {
            release: Semaphore::new(0),
            started: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

impl GatedEngine {
    /// Let `n` renders finish successfully.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderEngine for GatedEngine {
    async fn render(
        &self,
        request: RenderRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        self.started.lock().push(request.composition_id.clone());
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        progress.report(0.5);

        let result = tokio::select! {
            permit = self.release.acquire() => match permit {
                Ok(permit) => {
                    permit.forget();
                    progress.report(1.0);
                    Ok(())
                }
                Err(_) => Err(RenderError::Engine("gate closed".into())),
            },
            _ = cancel.cancelled() => Err(RenderError::Cancelled),
        };
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Engine that hangs silently until cancelled.
#[derive(Debug, Default)]
pub struct SilentEngine;

#[async_trait]
impl RenderEngine for SilentEngine {
    async fn render(
        &self,
        _request: RenderRequest,
        _progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        cancel.cancelled().await;
        Err(RenderError::Engine("killed".into()))
    }
}

/// Panics on the composition named `fatal`; renders anything else at once.
#[derive(Debug)]
pub struct PanickingEngine {
    pub fatal: &'static str,
}

#[async_trait]
impl RenderEngine for PanickingEngine {
    async fn render(
        &self,
        request: RenderRequest,
        progress: ProgressReporter,
        _cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        if request.composition_id == self.fatal {
            panic!("renderer crashed on {}", request.composition_id);
        }
        progress.report(1.0);
        Ok(())
    }
}

/// Collects every webhook delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, WebhookPayload)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, WebhookPayload)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    async fn notify(
        &self,
        url: &str,
        payload: &WebhookPayload,
    ) -> Result<(), ProviderError> {
        self.sent.lock().push((url.to_string(), payload.clone()));
        Ok(())
    }
}
