use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::pipeline::EnrichmentPipeline;
use crate::music::MusicLibrary;

/// Composition whose scene list is enriched before rendering.
pub const MASTER_SEQUENCE: &str = "MasterSequence";

/// Rewrites submitted `inputProps` for compositions built from a raw script:
/// scenes enriched, subtitles and total duration filled in, background
/// music resolved or dropped.
#[derive(Debug, Clone)]
pub struct CompositionPreparer {
    pipeline: EnrichmentPipeline,
    music: Option<MusicLibrary>,
}

impl CompositionPreparer {
    pub fn new(pipeline: EnrichmentPipeline) -> Self {
        Self {
            pipeline,
            music: None,
        }
    }

    pub fn with_music(mut self, music: MusicLibrary) -> Self {
        self.music = Some(music);
        self
    }

    pub fn pipeline(&self) -> &EnrichmentPipeline {
        &self.pipeline
    }

    pub fn music(&self) -> Option<&MusicLibrary> {
        self.music.as_ref()
    }

    /// Props for every other composition pass through untouched.
    pub async fn prepare(&self, composition_id: &str, input_props: Value) -> Value {
        if composition_id != MASTER_SEQUENCE {
            return input_props;
        }
        let Value::Object(mut props) = input_props else {
            return input_props;
        };

        if props.get("scenes").is_some_and(Value::is_array)
            && let Some(Value::Array(scenes)) = props.remove("scenes")
        {
            let voice = props
                .get("voice")
                .and_then(Value::as_str)
                .unwrap_or(self.pipeline.config().default_voice.as_str())
                .to_owned();
            let result = self.pipeline.enrich_values(scenes, &voice, true).await;
            info!(
                scenes = result.scenes.len(),
                total_frames = result.total_frames,
                "composition enriched"
            );

            props.insert("scenes".into(), json!(result.scenes));
            if !result.subtitles.is_empty() {
                props.insert("subtitles".into(), json!(result.subtitles));
            }
            props.insert("durationInFrames".into(), json!(result.total_frames));
        }

        self.attach_music(&mut props).await;
        Value::Object(props)
    }

    async fn attach_music(&self, props: &mut Map<String, Value>) {
        let Some(style) = props
            .get("bgMusic")
            .and_then(|music| music.get("style"))
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return;
        };

        let track = match &self.music {
            Some(library) => library.track_for_style(&style).await,
            None => {
                debug!(%style, "no music repository configured");
                None
            }
        };

        if let Some(track) = track
            && let Some(Value::Object(entry)) = props.get_mut("bgMusic")
        {
            entry.insert("src".into(), json!(track.local_url));
            entry.entry("loop").or_insert(json!(true));
            return;
        }
        info!(%style, "rendering without background music");
        props.remove("bgMusic");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::AudioFileStore;
    use crate::config::{EnrichmentConfig, MusicConfig};
    use crate::providers::{
        MockDurationProbe, MockMusicRepository, RemoteTrack,
    };

    #[tokio::test]
    async fn other_compositions_are_untouched() {
        let preparer = CompositionPreparer::new(EnrichmentPipeline::default());
        let props = json!({ "scenes": [{ "type": "Nope" }] });
        assert_eq!(preparer.prepare("Promo", props.clone()).await, props);
    }

    #[tokio::test]
    async fn master_sequence_is_enriched_and_sized() {
        let preparer = CompositionPreparer::new(EnrichmentPipeline::new(
            EnrichmentConfig::default(),
        ));
        let props = json!({
            "scenes": [
                { "type": "IntroTitle", "durationInFrames": 60, "props": { "title": "Hi" } },
                { "type": "Mystery" },
            ],
            "bgMusic": { "style": "calm" },
        });

        let out = preparer.prepare(MASTER_SEQUENCE, props).await;
        assert_eq!(out["durationInFrames"], json!(60 + 150));
        assert_eq!(out["scenes"][1]["type"], json!("KineticText"));
        assert_eq!(out["subtitles"][0]["startFrame"], json!(0));
        assert!(out.get("bgMusic").is_none());
    }

    #[tokio::test]
    async fn non_list_scenes_pass_through() {
        let preparer = CompositionPreparer::new(EnrichmentPipeline::default());
        let props = json!({ "scenes": "intro-only", "title": "Teaser" });

        let out = preparer.prepare(MASTER_SEQUENCE, props.clone()).await;
        assert_eq!(out, props);
    }

    #[tokio::test]
    async fn resolved_music_defaults_to_looping() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockMusicRepository::new();
        repo.expect_list_tracks().returning(|_| {
            Ok(vec![RemoteTrack {
                name: "a.mp3".into(),
                path: "/music/calm/a.mp3".into(),
            }])
        });
        repo.expect_fetch_track().returning(|_| Ok(b"mp3".to_vec()));
        let mut probe = MockDurationProbe::new();
        probe.expect_probe_seconds().returning(|_| Ok(30.0));
        let music = MusicLibrary::new(
            Arc::new(repo),
            AudioFileStore::new(dir.path().to_path_buf(), "/audio/music"),
            Arc::new(probe),
            MusicConfig::default(),
        );
        let preparer =
            CompositionPreparer::new(EnrichmentPipeline::default()).with_music(music);

        let out = preparer
            .prepare(MASTER_SEQUENCE, json!({ "bgMusic": { "style": "calm", "volume": 0.3 } }))
            .await;
        let music = &out["bgMusic"];
        assert!(music["src"].as_str().unwrap().starts_with("/audio/music/"));
        assert_eq!(music["loop"], json!(true));
        assert_eq!(music["volume"], json!(0.3));
    }
}
