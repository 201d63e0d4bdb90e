use std::{fmt, sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

use reelforge_core::{
    cache::AudioFileStore,
    enrich::{CompositionPreparer, EnrichmentPipeline, NarrationService},
    media::MediaCascade,
    music::MusicLibrary,
    providers::{
        CommandRenderEngine, CozeSpeechClient, CozeWorkflowImageClient,
        DurationProbe, FfprobeDurationProbe, ImageGenerator, ImageModel,
        ImageModelChain, PexelsClient, SystemMemoryProbe, WebDavMusicRepository,
        WebhookNotifier, ZhipuImageClient,
    },
    render::{OutputLocator, RenderQueue, RenderServices},
};

use crate::infra::config::Config;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: RenderQueue,
    pub preparer: Arc<CompositionPreparer>,
    /// Present only when a speech provider is configured.
    pub voices: Option<Arc<CozeSpeechClient>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("queue", &self.queue)
            .field("voices", &self.voices.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        queue: RenderQueue,
        preparer: CompositionPreparer,
    ) -> Self {
        Self {
            config,
            queue,
            preparer: Arc::new(preparer),
            voices: None,
        }
    }

    pub fn with_voices(mut self, voices: Arc<CozeSpeechClient>) -> Self {
        self.voices = Some(voices);
        self
    }

    /// Wire every configured provider into the pipeline and render queue.
    /// Providers without credentials are left out and the matching step
    /// degrades instead of failing.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let storage = &config.storage;
        for dir in [
            storage.renders_dir(),
            storage.narration_dir(),
            storage.music_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await.with_context(|| {
                format!("failed to create data directory {}", dir.display())
            })?;
        }

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        let providers = &config.providers;
        let probe: Arc<dyn DurationProbe> =
            Arc::new(FfprobeDurationProbe::new(&providers.ffprobe_path));

        let speech = providers
            .coze_api_token
            .as_ref()
            .map(|token| Arc::new(CozeSpeechClient::new(http.clone(), token)));

        let mut pipeline = EnrichmentPipeline::new(config.enrichment.clone());
        if let Some(speech) = &speech {
            pipeline = pipeline.with_narration(NarrationService::new(
                AudioFileStore::new(
                    storage.narration_dir(),
                    config.narration_url_prefix(),
                ),
                speech.clone(),
                probe.clone(),
            ));
        }

        let mut cascade = MediaCascade::new();
        if let Some(key) = &providers.pexels_api_key {
            let pexels = Arc::new(PexelsClient::new(http.clone(), key));
            cascade = cascade
                .with_video_search(pexels.clone())
                .with_image_search(pexels);
        }

        let coze_images = match (
            &providers.coze_api_token,
            &providers.coze_workflow_id,
        ) {
            (Some(token), Some(workflow)) => {
                Some(Arc::new(CozeWorkflowImageClient::new(
                    http.clone(),
                    token,
                    workflow,
                )) as Arc<dyn ImageGenerator>)
            }
            _ => None,
        };
        let zhipu_images = providers.zhipu_api_key.as_ref().map(|key| {
            Arc::new(ZhipuImageClient::new(http.clone(), key))
                as Arc<dyn ImageGenerator>
        });
        let model: ImageModel = providers.image_model.parse()?;
        if let Some(chain) =
            ImageModelChain::select(model, coze_images, zhipu_images)?
        {
            info!(models = ?chain.names(), "AI image generation enabled");
            cascade = cascade.with_generator(Arc::new(chain));
        }
        pipeline = pipeline.with_cascade(cascade);

        let mut preparer = CompositionPreparer::new(pipeline);
        if let Some(webdav) = providers.webdav() {
            info!(url = %webdav.url, "background music enabled");
            preparer = preparer.with_music(MusicLibrary::new(
                Arc::new(WebDavMusicRepository::new(http.clone(), webdav)),
                AudioFileStore::new(
                    storage.music_dir(),
                    config.music_url_prefix(),
                ),
                probe.clone(),
                config.music(),
            ));
        }

        let services = RenderServices::new(
            Arc::new(CommandRenderEngine::new(
                config.renderer.command.clone(),
                config.renderer.args.clone(),
            )),
            Arc::new(SystemMemoryProbe::new()),
        )
        .with_notifier(Arc::new(WebhookNotifier::new(http)));
        let queue = RenderQueue::new(
            config.render.clone(),
            services,
            OutputLocator::new(
                storage.renders_dir(),
                config.server.public_url.clone(),
            ),
        );

        let mut state = Self::new(Arc::clone(&config), queue, preparer);
        if let Some(speech) = speech {
            state = state.with_voices(speech);
        }
        Ok(state)
    }
}
