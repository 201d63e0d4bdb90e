//! Test fixtures for the HTTP surface: an in-process app with a fake
//! render engine and unlimited memory.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use reelforge_core::enrich::{CompositionPreparer, EnrichmentPipeline};
use reelforge_core::error::RenderError;
use reelforge_core::providers::MemoryProbe;
use reelforge_core::render::{
    OutputLocator, ProgressReporter, RenderEngine, RenderQueue, RenderRequest,
    RenderServices,
};
use reelforge_server::infra::config::Config;
use reelforge_server::{AppState, create_app};

pub const FAKE_VIDEO: &[u8] = b"not really an mp4";

/// Writes a small file to the output path and finishes immediately.
#[derive(Debug, Default)]
pub struct InstantEngine;

#[async_trait]
impl RenderEngine for InstantEngine {
    async fn render(
        &self,
        request: RenderRequest,
        progress: ProgressReporter,
        _cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        progress.report(0.5);
        tokio::fs::write(&request.output_path, FAKE_VIDEO).await?;
        progress.report(1.0);
        Ok(())
    }
}

/// Renders until cancelled.
#[derive(Debug, Default)]
pub struct EndlessEngine;

#[async_trait]
impl RenderEngine for EndlessEngine {
    async fn render(
        &self,
        _request: RenderRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        progress.report(0.1);
        cancel.cancelled().await;
        Err(RenderError::Cancelled)
    }
}

#[derive(Debug)]
pub struct PlentyOfMemory;

impl MemoryProbe for PlentyOfMemory {
    fn available_bytes(&self) -> u64 {
        u64::MAX
    }
}

pub fn test_state(
    data_dir: &Path,
    engine: Arc<dyn RenderEngine>,
    concurrency: usize,
) -> AppState {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_path_buf();
    config.render.concurrency_limit = concurrency;
    std::fs::create_dir_all(config.storage.renders_dir()).unwrap();
    std::fs::create_dir_all(config.storage.narration_dir()).unwrap();

    let queue = RenderQueue::new(
        config.render.clone(),
        RenderServices::new(engine, Arc::new(PlentyOfMemory)),
        OutputLocator::new(
            config.storage.renders_dir(),
            config.server.public_url.clone(),
        ),
    );
    let preparer = CompositionPreparer::new(EnrichmentPipeline::new(
        config.enrichment.clone(),
    ));

    AppState::new(Arc::new(config), queue, preparer)
}

pub fn test_server(state: AppState) -> TestServer {
    TestServer::new(create_app(state)).unwrap()
}

/// Poll a job until its status matches, returning the final snapshot.
pub async fn wait_for_status(
    server: &TestServer,
    job_id: &str,
    status: &str,
) -> Value {
    for _ in 0..500 {
        let snapshot: Value =
            server.get(&format!("/renders/{job_id}")).await.json();
        if snapshot["status"] == status {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached {status}");
}
