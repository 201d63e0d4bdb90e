use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::draft::SceneDraft;
use super::narration::NarrationService;
use super::subtitles::build_subtitles;
use crate::config::EnrichmentConfig;
use crate::media::{MediaCascade, MediaRequest};
use crate::scene::{RawScene, ResolvedScene, SubtitleCue};

/// Output of one enrichment pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub scenes: Vec<ResolvedScene>,
    pub subtitles: Vec<SubtitleCue>,
    /// Always the sum of every scene's duration.
    pub total_frames: u32,
}

/// Fills in narration, durations, media and subtitles for a raw scene list.
///
/// Scenes are processed concurrently but stitched back in input order, and
/// each one runs inside its own failure boundary: provider errors and even
/// panics degrade that scene alone.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentPipeline {
    config: EnrichmentConfig,
    narration: Option<NarrationService>,
    cascade: MediaCascade,
}

impl EnrichmentPipeline {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self {
            config,
            narration: None,
            cascade: MediaCascade::default(),
        }
    }

    pub fn with_narration(mut self, narration: NarrationService) -> Self {
        self.narration = Some(narration);
        self
    }

    pub fn with_cascade(mut self, cascade: MediaCascade) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Convenience wrapper over [`Self::enrich`] for submitted JSON.
    pub async fn enrich_values(
        &self,
        scenes: Vec<Value>,
        default_voice: &str,
        compute_duration: bool,
    ) -> EnrichmentResult {
        let scenes = scenes.into_iter().map(RawScene::from_value).collect();
        self.enrich(scenes, default_voice, compute_duration).await
    }

    #[instrument(skip(self, scenes), fields(scenes = scenes.len()))]
    pub async fn enrich(
        &self,
        scenes: Vec<RawScene>,
        default_voice: &str,
        compute_duration: bool,
    ) -> EnrichmentResult {
        let voice = if default_voice.trim().is_empty() {
            self.config.default_voice.as_str()
        } else {
            default_voice
        };

        let resolved: Vec<ResolvedScene> = stream::iter(
            scenes.into_iter().enumerate().map(|(index, raw)| {
                self.enrich_guarded(index, raw, voice, compute_duration)
            }),
        )
        .buffered(self.config.scene_concurrency.max(1))
        .collect()
        .await;

        let (subtitles, total_frames) = build_subtitles(&resolved);
        info!(
            scenes = resolved.len(),
            cues = subtitles.len(),
            total_frames,
            "enrichment complete"
        );
        EnrichmentResult {
            scenes: resolved,
            subtitles,
            total_frames,
        }
    }

    async fn enrich_guarded(
        &self,
        index: usize,
        raw: RawScene,
        voice: &str,
        compute_duration: bool,
    ) -> ResolvedScene {
        let backup = raw.clone();
        let attempt = AssertUnwindSafe(self.enrich_scene(
            index,
            raw,
            voice,
            compute_duration,
        ))
        .catch_unwind()
        .await;

        match attempt {
            Ok(scene) => scene,
            Err(_) => {
                error!(index, "scene enrichment panicked; using fallback");
                SceneDraft::from_raw(backup)
                    .with_derived_text()
                    .recover(&self.config)
            }
        }
    }

    async fn enrich_scene(
        &self,
        index: usize,
        raw: RawScene,
        default_voice: &str,
        compute_duration: bool,
    ) -> ResolvedScene {
        let mut draft = SceneDraft::from_raw(raw)
            .with_derived_text()
            .with_type_defaults(&self.config);

        if let Some(narration) = &self.narration
            && !draft.has_audio()
            && let Some(text) = draft.text().map(str::to_owned)
        {
            let voice = draft.voice().unwrap_or(default_voice).to_owned();
            match narration.narrate(&text, &voice).await {
                Ok(audio) => draft = draft.with_narration(audio),
                Err(err) => {
                    warn!(index, error = %err, "narration failed; scene stays silent")
                }
            }
        }

        draft = draft.with_reconciled_duration(&self.config, compute_duration);

        if draft.needs_media_lookup() {
            let phrases = draft.search_phrases();
            let min_duration_secs = draft
                .duration()
                .map_or(0, |frames| self.config.seconds_for_frames(frames));
            let media = self
                .cascade
                .resolve(MediaRequest {
                    phrases: &phrases,
                    min_duration_secs,
                    generate_only: draft.wants_generated_image(),
                })
                .await;
            if media.is_none() {
                debug!(index, ?phrases, "media cascade exhausted");
            }
            draft = draft.with_media(media);
        }

        draft.finish(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::cache::AudioFileStore;
    use crate::media::MediaKind;
    use crate::providers::{
        MockDurationProbe, MockSpeechSynthesizer, MockStockVideoSearch,
        StockVideo,
    };
    use crate::scene::SceneKind;

    fn narrated_pipeline(dir: &std::path::Path, seconds: f64) -> EnrichmentPipeline {
        let mut speech = MockSpeechSynthesizer::new();
        speech
            .expect_synthesize()
            .returning(|text, _| Ok(text.as_bytes().to_vec()));
        let mut probe = MockDurationProbe::new();
        probe.expect_probe_seconds().returning(move |_| Ok(seconds));
        EnrichmentPipeline::new(EnrichmentConfig::default()).with_narration(
            NarrationService::new(
                AudioFileStore::new(dir.to_path_buf(), "/audio/narration"),
                Arc::new(speech),
                Arc::new(probe),
            ),
        )
    }

    #[tokio::test]
    async fn narrated_scene_is_sized_to_its_audio() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = narrated_pipeline(dir.path(), 4.0);

        let result = pipeline
            .enrich_values(
                vec![json!({ "type": "IntroTitle", "text": "Welcome" })],
                "",
                true,
            )
            .await;

        let scene = &result.scenes[0];
        assert_eq!(scene.duration_in_frames, 120 + 15);
        assert!(scene.audio.as_deref().is_some_and(|a| a.ends_with(".mp3")));
        assert_eq!(result.total_frames, 135);
        assert_eq!(result.subtitles.len(), 1);
    }

    #[tokio::test]
    async fn existing_audio_is_not_resynthesized() {
        let mut speech = MockSpeechSynthesizer::new();
        speech.expect_synthesize().never();
        let mut probe = MockDurationProbe::new();
        probe.expect_probe_seconds().never();
        let dir = tempfile::tempdir().unwrap();
        let pipeline = EnrichmentPipeline::default().with_narration(
            NarrationService::new(
                AudioFileStore::new(dir.path().to_path_buf(), "/audio"),
                Arc::new(speech),
                Arc::new(probe),
            ),
        );

        let result = pipeline
            .enrich_values(
                vec![json!({
                    "type": "IntroTitle",
                    "text": "Hi",
                    "audio": "/audio/given.mp3",
                    "durationInFrames": 45,
                })],
                "voice",
                false,
            )
            .await;
        assert_eq!(result.scenes[0].audio.as_deref(), Some("/audio/given.mp3"));
        assert_eq!(result.scenes[0].duration_in_frames, 45);
    }

    #[tokio::test]
    async fn background_scene_gets_stock_video() {
        let mut videos = MockStockVideoSearch::new();
        videos.expect_search_video().returning(|_, min| {
            assert_eq!(min, 5);
            Ok(Some(StockVideo {
                url: "https://v.example/clip.mp4".into(),
                duration_secs: 9.0,
            }))
        });
        let pipeline = EnrichmentPipeline::default()
            .with_cascade(MediaCascade::new().with_video_search(Arc::new(videos)));

        let result = pipeline
            .enrich_values(
                vec![json!({ "type": "CaptionedVideo", "text": "Forest rain" })],
                "voice",
                false,
            )
            .await;

        let scene = &result.scenes[0];
        assert_eq!(scene.kind, SceneKind::CaptionedVideo);
        assert_eq!(scene.media.as_ref().map(|m| m.kind), Some(MediaKind::Video));
        let props = scene.to_props();
        assert_eq!(props["src"], json!("https://v.example/clip.mp4"));
    }

    #[tokio::test]
    async fn order_is_preserved_under_concurrency() {
        let pipeline = EnrichmentPipeline::default();
        let scenes = (1..=10)
            .map(|n| json!({ "type": "IntroTitle", "text": format!("s{n}"), "durationInFrames": n * 10 }))
            .collect();
        let result = pipeline.enrich_values(scenes, "voice", false).await;

        let texts: Vec<_> = result
            .scenes
            .iter()
            .map(|s| s.text.clone().unwrap_or_default())
            .collect();
        let expected: Vec<_> = (1..=10).map(|n| format!("s{n}")).collect();
        assert_eq!(texts, expected);
        assert_eq!(result.total_frames, (1..=10).map(|n| n * 10).sum::<u32>());
    }
}
