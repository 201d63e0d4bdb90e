//! # Reelforge Core
//!
//! Core library for the Reelforge render service: turns loosely-typed video
//! scripts into renderable compositions and drives them through a render
//! engine under a bounded, memory-aware scheduler.
//!
//! ## Overview
//!
//! - **Scene Enrichment**: narration synthesis, duration reconciliation,
//!   background media resolution and subtitle timing for raw scenes
//! - **Media Cascade**: stock video, stock image and AI image fallbacks
//! - **Background Music**: random track selection per style bucket, cached
//!   locally
//! - **Render Queue**: FIFO admission with a concurrency limit, a free-memory
//!   gate, a stall watchdog and completion webhooks
//!
//! ## Architecture
//!
//! - [`scene`]: raw and resolved scene models
//! - [`cache`]: content-addressed audio file store
//! - [`providers`]: ports for external collaborators and their adapters
//! - [`media`]: media resolution cascade
//! - [`enrich`]: the per-scene enrichment pipeline
//! - [`music`]: background music resolution
//! - [`render`]: render job queue and scheduler
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelforge_core::{
//!     config::RenderQueueConfig,
//!     providers::{CommandRenderEngine, SystemMemoryProbe},
//!     render::{JobData, OutputLocator, RenderQueue, RenderServices},
//! };
//!
//! # async fn run() {
//! let services = RenderServices::new(
//!     Arc::new(CommandRenderEngine::new("npx", vec!["remotion".into()])),
//!     Arc::new(SystemMemoryProbe::new()),
//! );
//! let queue = RenderQueue::new(
//!     RenderQueueConfig::default(),
//!     services,
//!     OutputLocator::new("renders".into(), "http://localhost:3000"),
//! );
//! let id = queue.create_job(JobData::new("MasterSequence", serde_json::json!({})));
//! println!("queued {id}");
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Content-addressed audio cache
pub mod cache;
/// Tunables for enrichment, music and rendering
pub mod config;
/// Scene enrichment pipeline
pub mod enrich;
pub mod error;
/// Media resolution cascade
pub mod media;
/// Background music resolution
pub mod music;
/// Ports for external collaborators and their adapters
pub mod providers;
/// Render job queue and scheduler
pub mod render;
/// Raw and resolved scene models
pub mod scene;

pub use error::{
    CacheError, CancelError, EnrichError, ProviderError, RenderError,
};
