use std::{fs, path::PathBuf};

use thiserror::Error;

use reelforge_core::config::{
    EnrichmentConfig, ProviderConfig, RenderQueueConfig,
};

use super::{
    models::{
        Config, ConfigMetadata, RendererConfig, RetentionConfig, ServerConfig,
        StorageConfig,
    },
    sources::{EnvConfig, FileConfig},
};

const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["reelforge.toml", "config/reelforge.toml"];

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather()?)?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve the file layer and compose it under an already gathered
    /// environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;

        let mut warnings = Vec::new();
        if config_path.is_none() {
            warnings.push(
                "No reelforge.toml detected; using environment variables and defaults"
                    .to_string(),
            );
        }

        let config =
            compose_config(file_config.unwrap_or_default(), env, config_path);

        if config.providers.coze_api_token.is_none() {
            warnings.push(
                "COZE_API_TOKEN is not set; scenes will render without narration"
                    .to_string(),
            );
        }
        if config.providers.pexels_api_key.is_none() {
            warnings.push(
                "PEXELS_API_KEY is not set; stock media lookups are disabled"
                    .to_string(),
            );
        }

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (&self.options.config_path, &env.config_path)
        {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(found) => (found, false),
                None => return Ok((None, None)),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

/// Environment over file over defaults, field by field.
fn compose_config(
    file: FileConfig,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Config {
    let FileConfig {
        server: file_server,
        storage: file_storage,
        render: file_render,
        enrichment: file_enrichment,
        providers: file_providers,
        retention: file_retention,
    } = file;

    let server_defaults = ServerConfig::default();
    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or(server_defaults.host),
        port: env
            .server_port
            .or(file_server.port)
            .unwrap_or(server_defaults.port),
        public_url: env
            .public_url
            .or(file_server.public_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(server_defaults.public_url),
    };

    let storage = StorageConfig {
        data_dir: env
            .data_dir
            .or(file_storage.data_dir)
            .unwrap_or_else(|| StorageConfig::default().data_dir),
    };

    let render_defaults = RenderQueueConfig::default();
    let render = RenderQueueConfig {
        concurrency_limit: env
            .render_concurrency
            .or(file_render.concurrency)
            .unwrap_or(render_defaults.concurrency_limit),
        memory_threshold_bytes: env
            .render_memory_threshold_mb
            .or(file_render.memory_threshold_mb)
            .map(|mb| mb.saturating_mul(BYTES_PER_MB))
            .unwrap_or(render_defaults.memory_threshold_bytes),
        watchdog_tick_secs: env
            .render_watchdog_tick_secs
            .or(file_render.watchdog_tick_secs)
            .unwrap_or(render_defaults.watchdog_tick_secs),
        stall_timeout_secs: env
            .render_stall_timeout_secs
            .or(file_render.stall_timeout_secs)
            .unwrap_or(render_defaults.stall_timeout_secs),
    };

    let renderer_defaults = RendererConfig::default();
    let renderer = RendererConfig {
        command: env
            .renderer_command
            .or(file_render.command)
            .unwrap_or(renderer_defaults.command),
        args: env
            .renderer_args
            .or(file_render.args)
            .unwrap_or(renderer_defaults.args),
    };

    let enrichment_defaults = EnrichmentConfig::default();
    let enrichment = EnrichmentConfig {
        default_voice: env
            .default_voice
            .or(file_enrichment.default_voice)
            .unwrap_or(enrichment_defaults.default_voice.clone()),
        scene_concurrency: file_enrichment
            .scene_concurrency
            .unwrap_or(enrichment_defaults.scene_concurrency),
        ..enrichment_defaults
    };

    let provider_defaults = ProviderConfig::default();
    let providers = ProviderConfig {
        coze_api_token: env.coze_api_token.or(file_providers.coze_api_token),
        coze_workflow_id: env
            .coze_workflow_id
            .or(file_providers.coze_workflow_id),
        zhipu_api_key: env.zhipu_api_key.or(file_providers.zhipu_api_key),
        pexels_api_key: env.pexels_api_key.or(file_providers.pexels_api_key),
        image_model: env
            .image_model
            .or(file_providers.image_model)
            .unwrap_or(provider_defaults.image_model),
        ffprobe_path: env
            .ffprobe_path
            .or(file_providers.ffprobe_path)
            .unwrap_or(provider_defaults.ffprobe_path),
        webdav_url: env.webdav_url.or(file_providers.webdav_url),
        webdav_username: env.webdav_username.or(file_providers.webdav_username),
        webdav_password: env.webdav_password.or(file_providers.webdav_password),
        webdav_root_path: env
            .webdav_root_path
            .or(file_providers.webdav_root_path)
            .unwrap_or(provider_defaults.webdav_root_path),
    };

    let retention_defaults = RetentionConfig::default();
    let retention = RetentionConfig {
        max_age_minutes: env
            .media_retention_minutes
            .or(file_retention.max_age_minutes)
            .unwrap_or(retention_defaults.max_age_minutes),
        ..retention_defaults
    };

    Config {
        server,
        storage,
        render,
        renderer,
        enrichment,
        providers,
        retention,
        metadata: ConfigMetadata {
            env_file_loaded: false,
            config_path,
        },
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let dir = tempfile::tempdir().unwrap();
        let loader =
            ConfigLoader::new().with_config_path(dir.path().join("none.toml"));
        let env = EnvConfig::default();

        // An explicit path that does not exist is an error.
        assert!(matches!(
            loader.load_with_env(env.clone()),
            Err(ConfigLoadError::MissingConfig { .. })
        ));

        let config = compose_config(FileConfig::default(), env, None);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.render.concurrency_limit, 1);
        assert_eq!(config.retention.max_age_minutes, 60);
        assert_eq!(config.renderer.command, "npx");
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config(
            r#"
[server]
port = 4000
public_url = "https://reels.example.com/"

[render]
concurrency = 2
memory_threshold_mb = 512

[retention]
max_age_minutes = 15
"#,
        );
        let env = EnvConfig {
            server_port: Some(5000),
            render_concurrency: Some(4),
            ..Default::default()
        };

        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env)
            .unwrap();
        let config = load.config;

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.public_url, "https://reels.example.com");
        assert_eq!(config.render.concurrency_limit, 4);
        assert_eq!(config.render.memory_threshold_bytes, 512 * BYTES_PER_MB);
        assert_eq!(config.retention.max_age_minutes, 15);
        assert_eq!(
            config.metadata.config_path.as_deref(),
            Some(file.path())
        );
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let file = write_config("[server\nport = ");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { ref path, .. } if path == file.path()));
    }

    #[test]
    fn missing_credentials_produce_warnings() {
        let file = write_config("");
        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap();
        assert!(load.warnings.iter().any(|w| w.contains("COZE_API_TOKEN")));
        assert!(load.warnings.iter().any(|w| w.contains("PEXELS_API_KEY")));
    }
}
