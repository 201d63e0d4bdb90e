use std::path::PathBuf;
use std::time::Duration;

use reelforge_core::config::{
    EnrichmentConfig, MusicConfig, ProviderConfig, RenderQueueConfig,
};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub render: RenderQueueConfig,
    pub renderer: RendererConfig,
    pub enrichment: EnrichmentConfig,
    pub providers: ProviderConfig,
    pub retention: RetentionConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn music(&self) -> MusicConfig {
        MusicConfig {
            fps: self.enrichment.fps,
            ..MusicConfig::default()
        }
    }

    /// Public URL prefix for cached narration files.
    pub fn narration_url_prefix(&self) -> String {
        format!("{}/audio/narration", self.server.public_url)
    }

    pub fn music_url_prefix(&self) -> String {
        format!("{}/audio/music", self.server.public_url)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients and the renderer use to reach this server.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            public_url: "http://localhost:3000".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    pub fn renders_dir(&self) -> PathBuf {
        self.data_dir.join("renders")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }

    pub fn narration_dir(&self) -> PathBuf {
        self.audio_dir().join("narration")
    }

    pub fn music_dir(&self) -> PathBuf {
        self.audio_dir().join("music")
    }
}

/// External renderer invocation.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "npx".into(),
            args: vec!["remotion".into(), "render".into(), "src/index.ts".into()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub max_age_minutes: u64,
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
            sweep_interval_secs: 10 * 60,
        }
    }
}

impl RetentionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_minutes.saturating_mul(60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Where the configuration came from, for startup logging.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub env_file_loaded: bool,
    pub config_path: Option<PathBuf>,
}
