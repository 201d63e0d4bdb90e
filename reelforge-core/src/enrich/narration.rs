use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::AudioFileStore;
use crate::error::EnrichError;
use crate::providers::{DurationProbe, SpeechSynthesizer};

/// Cached narration attached to a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationAudio {
    /// Public URL the renderer fetches.
    pub url: String,
    pub path: PathBuf,
    /// Measured length; `None` when the probe could not read the file.
    pub seconds: Option<f64>,
    pub cache_hit: bool,
}

/// Text-to-speech through the audio cache: one synthesis per distinct
/// `(text, voice)` pair, then the cached file forever after.
#[derive(Clone)]
pub struct NarrationService {
    store: AudioFileStore,
    speech: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn DurationProbe>,
}

impl fmt::Debug for NarrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl NarrationService {
    pub fn new(
        store: AudioFileStore,
        speech: Arc<dyn SpeechSynthesizer>,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            store,
            speech,
            probe,
        }
    }

    pub fn store(&self) -> &AudioFileStore {
        &self.store
    }

    pub fn cache_key(text: &str, voice: &str) -> String {
        AudioFileStore::key_for(&[voice, text])
    }

    pub async fn narrate(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<NarrationAudio, EnrichError> {
        let key = Self::cache_key(text, voice);
        let path = self.store.path_for_key(&key)?;

        let cache_hit = self.store.contains(&key).await?;
        let path = if cache_hit {
            debug!(%key, "narration cache hit");
            path
        } else {
            let bytes = self.speech.synthesize(text, voice).await?;
            info!(%key, voice, bytes = bytes.len(), "narration synthesized");
            self.store.write_if_missing(&key, &bytes).await?
        };

        let seconds = match self.probe.probe_seconds(&path).await {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Some(seconds),
            Ok(seconds) => {
                warn!(%key, seconds, "narration has no usable duration");
                None
            }
            Err(err) => {
                warn!(%key, error = %err, "narration duration probe failed");
                None
            }
        };

        Ok(NarrationAudio {
            url: self.store.public_url(&key),
            path,
            seconds,
            cache_hit,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::error::ProviderError;
    use crate::providers::{MockDurationProbe, MockSpeechSynthesizer};

    fn service(
        dir: &std::path::Path,
        speech: MockSpeechSynthesizer,
        probe: MockDurationProbe,
    ) -> NarrationService {
        NarrationService::new(
            AudioFileStore::new(dir.join("narration"), "/audio/narration"),
            Arc::new(speech),
            Arc::new(probe),
        )
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut speech = MockSpeechSynthesizer::new();
        speech
            .expect_synthesize()
            .with(eq("hello there"), eq("voice-a"))
            .times(1)
            .returning(|_, _| Ok(b"ID3 fake".to_vec()));
        let mut probe = MockDurationProbe::new();
        probe.expect_probe_seconds().returning(|_| Ok(2.5));

        let service = service(dir.path(), speech, probe);
        let first = service.narrate("hello there", "voice-a").await.unwrap();
        let second = service.narrate("hello there", "voice-a").await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.path, second.path);
        assert_eq!(first.url, second.url);
        assert!(first.url.starts_with("/audio/narration/"));
        assert_eq!(second.seconds, Some(2.5));
    }

    #[tokio::test]
    async fn probe_failure_keeps_the_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut speech = MockSpeechSynthesizer::new();
        speech
            .expect_synthesize()
            .returning(|_, _| Ok(b"bytes".to_vec()));
        let mut probe = MockDurationProbe::new();
        probe
            .expect_probe_seconds()
            .returning(|_| Err(ProviderError::Process("ffprobe missing".into())));

        let audio = service(dir.path(), speech, probe)
            .narrate("text", "voice")
            .await
            .unwrap();
        assert_eq!(audio.seconds, None);
        assert!(audio.path.exists());
    }

    #[tokio::test]
    async fn synthesis_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut speech = MockSpeechSynthesizer::new();
        speech
            .expect_synthesize()
            .returning(|_, _| Err(ProviderError::RateLimited));
        let mut probe = MockDurationProbe::new();
        probe.expect_probe_seconds().never();

        let result = service(dir.path(), speech, probe)
            .narrate("text", "voice")
            .await;
        assert!(matches!(
            result,
            Err(EnrichError::Provider(ProviderError::RateLimited))
        ));
    }

    #[test]
    fn voice_is_part_of_the_key() {
        assert_ne!(
            NarrationService::cache_key("hi", "a"),
            NarrationService::cache_key("hi", "b")
        );
    }
}
