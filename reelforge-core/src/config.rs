use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::WebDavConfig;

/// Default narration voice when neither the scene nor the request names one.
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

/// Scheduler tunables for the render queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderQueueConfig {
    /// Maximum number of renders executing at once.
    pub concurrency_limit: usize,
    /// Free memory required before a second (or later) render is admitted.
    pub memory_threshold_bytes: u64,
    /// How often the watchdog inspects an active render.
    pub watchdog_tick_secs: u64,
    /// A render without a progress report for this long is aborted.
    pub stall_timeout_secs: u64,
}

impl Default for RenderQueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 1,
            memory_threshold_bytes: 2 * 1024 * 1024 * 1024,
            watchdog_tick_secs: 30,
            stall_timeout_secs: 15 * 60,
        }
    }
}

impl RenderQueueConfig {
    pub fn watchdog_tick(&self) -> Duration {
        Duration::from_secs(self.watchdog_tick_secs.max(1))
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs.max(1))
    }

    /// Zero would never admit anything.
    pub fn effective_limit(&self) -> usize {
        self.concurrency_limit.max(1)
    }
}

/// Frame arithmetic and fallbacks used by the enrichment pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub fps: u32,
    /// Frames appended after narration so audio is never clipped.
    pub buffer_frames: u32,
    /// Used when no usable duration can be derived.
    pub default_frames: u32,
    pub default_voice: String,
    /// Scenes enriched concurrently; output order is always input order.
    pub scene_concurrency: usize,
    /// Upper bound on the word list synthesized for the text fallback.
    pub max_fallback_words: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            buffer_frames: 15,
            default_frames: 150,
            default_voice: DEFAULT_VOICE.to_string(),
            scene_concurrency: 4,
            max_fallback_words: 6,
        }
    }
}

impl EnrichmentConfig {
    /// `ceil(seconds * fps) + buffer`, or `None` for unusable input.
    pub fn frames_for_seconds(&self, seconds: f64) -> Option<u32> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return None;
        }
        let frames = (seconds * f64::from(self.fps)).ceil();
        if frames > f64::from(u32::MAX - self.buffer_frames) {
            return None;
        }
        Some(frames as u32 + self.buffer_frames)
    }

    /// Whole seconds covered by `frames`, rounded up.
    pub fn seconds_for_frames(&self, frames: u32) -> u32 {
        frames.div_ceil(self.fps.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub fps: u32,
    /// Assumed track length when probing fails.
    pub fallback_seconds: f64,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            fallback_seconds: 180.0,
        }
    }
}

impl MusicConfig {
    pub fn frames_for_seconds(&self, seconds: f64) -> u32 {
        let seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            self.fallback_seconds
        };
        (seconds * f64::from(self.fps)).ceil() as u32
    }
}

/// Credentials and endpoints for external providers. Anything left unset
/// disables the matching adapter.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub coze_api_token: Option<String>,
    pub coze_workflow_id: Option<String>,
    pub zhipu_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    /// `auto`, `coze` or `zhipu`.
    pub image_model: String,
    pub ffprobe_path: String,
    pub webdav_url: Option<String>,
    pub webdav_username: Option<String>,
    pub webdav_password: Option<String>,
    pub webdav_root_path: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            coze_api_token: None,
            coze_workflow_id: None,
            zhipu_api_key: None,
            pexels_api_key: None,
            image_model: "auto".into(),
            ffprobe_path: "ffprobe".into(),
            webdav_url: None,
            webdav_username: None,
            webdav_password: None,
            webdav_root_path: "/".into(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |value: &Option<String>| value.is_some();
        f.debug_struct("ProviderConfig")
            .field("coze_api_token", &set(&self.coze_api_token))
            .field("coze_workflow_id", &self.coze_workflow_id)
            .field("zhipu_api_key", &set(&self.zhipu_api_key))
            .field("pexels_api_key", &set(&self.pexels_api_key))
            .field("image_model", &self.image_model)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("webdav_url", &self.webdav_url)
            .field("webdav_root_path", &self.webdav_root_path)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    pub fn webdav(&self) -> Option<WebDavConfig> {
        let url = self.webdav_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(WebDavConfig {
            url: url.to_string(),
            username: self.webdav_username.clone(),
            password: self.webdav_password.clone(),
            root_path: self.webdav_root_path.clone(),
        })
    }
}
