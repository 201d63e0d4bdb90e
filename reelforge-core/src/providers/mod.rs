//! Ports for every external collaborator, plus the adapters wired in by the
//! server. Each port is an object-safe async trait so callers hold
//! `Arc<dyn Port>` and tests substitute doubles.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

mod coze;
mod ffprobe;
mod image_models;
mod memory;
mod pexels;
mod renderer;
mod webdav;
mod webhook;
mod zhipu;

pub use coze::{CozeSpeechClient, CozeWorkflowImageClient, Voice};
pub use ffprobe::FfprobeDurationProbe;
pub use image_models::{ImageModel, ImageModelChain};
pub use memory::SystemMemoryProbe;
pub use pexels::PexelsClient;
pub use renderer::{CommandRenderEngine, parse_progress};
pub use webdav::{WebDavConfig, WebDavMusicRepository};
pub use webhook::WebhookNotifier;
pub use zhipu::ZhipuImageClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockVideo {
    pub url: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}

/// A track listed in a remote music bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub name: String,
    /// Repository path used to fetch the bytes.
    pub path: String,
}

/// Text-to-speech. Returns encoded audio bytes; caching is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe_seconds(&self, path: &Path) -> Result<f64, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockVideoSearch: Send + Sync {
    async fn search_video(
        &self,
        query: &str,
        min_duration_secs: u32,
    ) -> Result<Option<StockVideo>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockImageSearch: Send + Sync {
    async fn search_image(
        &self,
        query: &str,
    ) -> Result<Option<StockImage>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<Option<GeneratedImage>, ProviderError>;
}

/// Remote library of background tracks grouped into style buckets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicRepository: Send + Sync {
    async fn list_styles(&self) -> Result<Vec<String>, ProviderError>;

    async fn list_tracks(
        &self,
        style: &str,
    ) -> Result<Vec<RemoteTrack>, ProviderError>;

    async fn fetch_track(&self, path: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Live free-memory reading for the admission gate.
#[cfg_attr(test, mockall::automock)]
pub trait MemoryProbe: Send + Sync {
    fn available_bytes(&self) -> u64;
}
