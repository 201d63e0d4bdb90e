use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelforge_server::{
    AppState, create_app,
    infra::{
        config::{ConfigLoad, ConfigLoader},
        retention::RetentionSweeper,
    },
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "reelforge-server")]
#[command(
    about = "Video render service: script enrichment, queued rendering and media delivery"
)]
struct Cli {
    /// Path to a reelforge.toml configuration file
    #[arg(long, env = "REELFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Alternate .env file to load before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding renders and the audio cache (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                |_| "info,reelforge_core=info,reelforge_server=info,tower_http=warn".into(),
            ),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    for warning in &warnings {
        warn!(message = %warning, "configuration warning");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let state = AppState::build(config)
        .await
        .context("failed to initialize services")?;
    let config = Arc::clone(&state.config);

    let storage = &config.storage;
    let _sweeper = RetentionSweeper::new(
        vec![storage.renders_dir(), storage.audio_dir()],
        config.retention.max_age(),
        config.retention.sweep_interval(),
    )
    .start();

    info!(
        concurrency = config.render.effective_limit(),
        memory_threshold_bytes = config.render.memory_threshold_bytes,
        stall_timeout_secs = config.render.stall_timeout_secs,
        "render queue ready"
    );
    info!(
        public_url = %config.server.public_url,
        data_dir = %storage.data_dir.display(),
        "Starting Reelforge render service on {}", addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_app(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
