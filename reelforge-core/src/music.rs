use std::fmt;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::AudioFileStore;
use crate::config::MusicConfig;
use crate::error::{EnrichError, ProviderError};
use crate::providers::{DurationProbe, MusicRepository, RemoteTrack};

/// A background track cached locally and ready for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicTrack {
    pub name: String,
    pub style: String,
    pub local_url: String,
    pub duration_in_frames: u32,
}

/// Picks a random track from a style bucket and caches it by the hash of
/// its remote path.
#[derive(Clone)]
pub struct MusicLibrary {
    repo: Arc<dyn MusicRepository>,
    store: AudioFileStore,
    probe: Arc<dyn DurationProbe>,
    config: MusicConfig,
}

impl fmt::Debug for MusicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusicLibrary")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MusicLibrary {
    pub fn new(
        repo: Arc<dyn MusicRepository>,
        store: AudioFileStore,
        probe: Arc<dyn DurationProbe>,
        config: MusicConfig,
    ) -> Self {
        Self {
            repo,
            store,
            probe,
            config,
        }
    }

    /// Style bucket names, sorted.
    pub async fn styles(&self) -> Result<Vec<String>, ProviderError> {
        let mut styles = self.repo.list_styles().await?;
        styles.sort();
        styles.dedup();
        Ok(styles)
    }

    /// A cached track for `style`, or `None` when the bucket is empty or
    /// anything along the way fails. Callers render without music then.
    pub async fn track_for_style(&self, style: &str) -> Option<MusicTrack> {
        match self.resolve(style).await {
            Ok(track) => track,
            Err(err) => {
                warn!(style, error = %err, "background music unavailable");
                None
            }
        }
    }

    async fn resolve(
        &self,
        style: &str,
    ) -> Result<Option<MusicTrack>, EnrichError> {
        let tracks = self.repo.list_tracks(style).await?;
        let Some(track) = pick(&tracks) else {
            debug!(style, "style bucket has no tracks");
            return Ok(None);
        };

        let key = AudioFileStore::key_for(&["music", track.path.as_str()]);
        let path = if self.store.contains(&key).await? {
            self.store.path_for_key(&key)?
        } else {
            let bytes = self.repo.fetch_track(&track.path).await?;
            info!(style, track = %track.name, bytes = bytes.len(), "music track cached");
            self.store.write_if_missing(&key, &bytes).await?
        };

        let seconds = match self.probe.probe_seconds(&path).await {
            Ok(seconds) => seconds,
            Err(err) => {
                warn!(track = %track.name, error = %err, "music duration unknown");
                self.config.fallback_seconds
            }
        };

        Ok(Some(MusicTrack {
            name: track.name,
            style: style.to_string(),
            local_url: self.store.public_url(&key),
            duration_in_frames: self.config.frames_for_seconds(seconds),
        }))
    }
}

fn pick(tracks: &[RemoteTrack]) -> Option<RemoteTrack> {
    tracks.choose(&mut rand::rng()).cloned()
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::providers::{MockDurationProbe, MockMusicRepository};

    fn track(name: &str) -> RemoteTrack {
        RemoteTrack {
            name: name.into(),
            path: format!("/music/calm/{name}"),
        }
    }

    fn library(
        dir: &std::path::Path,
        repo: MockMusicRepository,
        probe: MockDurationProbe,
    ) -> MusicLibrary {
        MusicLibrary::new(
            Arc::new(repo),
            AudioFileStore::new(dir.to_path_buf(), "/audio/music"),
            Arc::new(probe),
            MusicConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_bucket_yields_no_track() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockMusicRepository::new();
        repo.expect_list_tracks().returning(|_| Ok(Vec::new()));
        repo.expect_fetch_track().never();

        let library = library(dir.path(), repo, MockDurationProbe::new());
        assert!(library.track_for_style("calm").await.is_none());
    }

    #[tokio::test]
    async fn track_is_fetched_once_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockMusicRepository::new();
        repo.expect_list_tracks()
            .with(eq("calm"))
            .returning(|_| Ok(vec![track("a.mp3")]));
        repo.expect_fetch_track()
            .times(1)
            .returning(|_| Ok(b"mp3".to_vec()));
        let mut probe = MockDurationProbe::new();
        probe.expect_probe_seconds().returning(|_| Ok(10.0));

        let library = library(dir.path(), repo, probe);
        let first = library.track_for_style("calm").await.unwrap();
        let second = library.track_for_style("calm").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.duration_in_frames, 300);
        assert!(first.local_url.starts_with("/audio/music/"));
    }

    #[tokio::test]
    async fn probe_failure_uses_default_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockMusicRepository::new();
        repo.expect_list_tracks()
            .returning(|_| Ok(vec![track("b.mp3")]));
        repo.expect_fetch_track().returning(|_| Ok(b"mp3".to_vec()));
        let mut probe = MockDurationProbe::new();
        probe
            .expect_probe_seconds()
            .returning(|_| Err(ProviderError::Process("no ffprobe".into())));

        let track = library(dir.path(), repo, probe)
            .track_for_style("calm")
            .await
            .unwrap();
        assert_eq!(track.duration_in_frames, 180 * 30);
    }

    #[tokio::test]
    async fn repository_errors_are_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockMusicRepository::new();
        repo.expect_list_tracks()
            .returning(|_| Err(ProviderError::InvalidApiKey));

        let library = library(dir.path(), repo, MockDurationProbe::new());
        assert!(library.track_for_style("calm").await.is_none());
    }
}
