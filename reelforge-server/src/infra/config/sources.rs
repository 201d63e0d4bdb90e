use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::loader::ConfigLoadError;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub render: FileRenderConfig,
    #[serde(default)]
    pub enrichment: FileEnrichmentConfig,
    #[serde(default)]
    pub providers: FileProvidersConfig,
    #[serde(default)]
    pub retention: FileRetentionConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRenderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_threshold_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stall_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog_tick_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileEnrichmentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_concurrency: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileProvidersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coze_api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coze_workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zhipu_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pexels_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdav_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdav_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdav_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdav_root_path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRetentionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_minutes: Option<u64>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub public_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub render_concurrency: Option<usize>,
    pub render_memory_threshold_mb: Option<u64>,
    pub render_stall_timeout_secs: Option<u64>,
    pub render_watchdog_tick_secs: Option<u64>,
    pub renderer_command: Option<String>,
    pub renderer_args: Option<Vec<String>>,
    pub media_retention_minutes: Option<u64>,
    pub default_voice: Option<String>,
    pub coze_api_token: Option<String>,
    pub coze_workflow_id: Option<String>,
    pub zhipu_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub image_model: Option<String>,
    pub ffprobe_path: Option<String>,
    pub webdav_url: Option<String>,
    pub webdav_username: Option<String>,
    pub webdav_password: Option<String>,
    pub webdav_root_path: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigLoadError> {
        let var = |name: &str| {
            lookup(name).filter(|value| !value.trim().is_empty())
        };

        Ok(Self {
            config_path: var("REELFORGE_CONFIG").map(PathBuf::from),
            server_host: var("REELFORGE_BIND"),
            server_port: parse_var(&var, "PORT")?,
            public_url: var("REELFORGE_PUBLIC_URL"),
            data_dir: var("REELFORGE_DATA_DIR").map(PathBuf::from),
            render_concurrency: parse_var(&var, "RENDER_CONCURRENCY")?,
            render_memory_threshold_mb: parse_var(
                &var,
                "RENDER_MEMORY_THRESHOLD_MB",
            )?,
            render_stall_timeout_secs: parse_var(
                &var,
                "RENDER_STALL_TIMEOUT_SECS",
            )?,
            render_watchdog_tick_secs: parse_var(
                &var,
                "RENDER_WATCHDOG_TICK_SECS",
            )?,
            renderer_command: var("RENDERER_COMMAND"),
            renderer_args: var("RENDERER_ARGS").map(|raw| parse_csv(&raw)),
            media_retention_minutes: parse_var(
                &var,
                "MEDIA_RETENTION_MINUTES",
            )?,
            default_voice: var("DEFAULT_VOICE"),
            coze_api_token: var("COZE_API_TOKEN")
                .or_else(|| var("AUTO_API_TOKEN")),
            coze_workflow_id: var("COZE_WORKFLOW_ID"),
            zhipu_api_key: var("ZHIPU_API_KEY"),
            pexels_api_key: var("PEXELS_API_KEY"),
            image_model: var("IMAGE_MODEL"),
            ffprobe_path: var("FFPROBE_PATH"),
            webdav_url: var("WEBDAV_URL"),
            webdav_username: var("WEBDAV_USERNAME"),
            webdav_password: var("WEBDAV_PASSWORD"),
            webdav_root_path: var("WEBDAV_ROOT_PATH"),
        })
    }
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigLoadError> {
    match var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ConfigLoadError::InvalidValue {
                name: name.to_string(),
                value: raw,
            }
        }),
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
