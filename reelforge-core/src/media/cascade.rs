use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{MediaKind, MediaSource, ResolvedMedia};
use crate::providers::{ImageGenerator, StockImageSearch, StockVideoSearch};

/// Inputs for one cascade run.
#[derive(Debug, Clone, Copy)]
pub struct MediaRequest<'a> {
    /// Ranked search phrases, best first. The first doubles as the
    /// generation prompt.
    pub phrases: &'a [String],
    /// Stock videos shorter than this are skipped.
    pub min_duration_secs: u32,
    /// Go straight to image generation.
    pub generate_only: bool,
}

/// Stock video search, then stock image search, then AI image generation.
/// Absent providers are skipped; provider errors count as misses.
#[derive(Clone, Default)]
pub struct MediaCascade {
    videos: Option<Arc<dyn StockVideoSearch>>,
    images: Option<Arc<dyn StockImageSearch>>,
    generator: Option<Arc<dyn ImageGenerator>>,
}

impl fmt::Debug for MediaCascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCascade")
            .field("videos", &self.videos.is_some())
            .field("images", &self.images.is_some())
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

impl MediaCascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video_search(mut self, search: Arc<dyn StockVideoSearch>) -> Self {
        self.videos = Some(search);
        self
    }

    pub fn with_image_search(mut self, search: Arc<dyn StockImageSearch>) -> Self {
        self.images = Some(search);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// First media any stage produces, or `None` once every stage is
    /// exhausted.
    pub async fn resolve(&self, request: MediaRequest<'_>) -> Option<ResolvedMedia> {
        if request.phrases.is_empty() {
            return None;
        }

        if !request.generate_only {
            if let Some(media) = self.search_videos(&request).await {
                return Some(media);
            }
            if let Some(media) = self.search_images(&request).await {
                return Some(media);
            }
        }
        self.generate(&request).await
    }

    async fn search_videos(&self, request: &MediaRequest<'_>) -> Option<ResolvedMedia> {
        let videos = self.videos.as_ref()?;
        for phrase in request.phrases {
            match videos.search_video(phrase, request.min_duration_secs).await {
                Ok(Some(hit)) => {
                    debug!(phrase = %phrase, url = %hit.url, "stock video hit");
                    return Some(ResolvedMedia {
                        url: hit.url,
                        kind: MediaKind::Video,
                        source: MediaSource::StockVideo,
                    });
                }
                Ok(None) => debug!(phrase = %phrase, "no stock video"),
                Err(err) => {
                    warn!(phrase = %phrase, error = %err, "stock video search failed")
                }
            }
        }
        None
    }

    async fn search_images(&self, request: &MediaRequest<'_>) -> Option<ResolvedMedia> {
        let images = self.images.as_ref()?;
        for phrase in request.phrases {
            match images.search_image(phrase).await {
                Ok(Some(hit)) => {
                    debug!(phrase = %phrase, url = %hit.url, "stock image hit");
                    return Some(ResolvedMedia {
                        url: hit.url,
                        kind: MediaKind::Image,
                        source: MediaSource::StockImage,
                    });
                }
                Ok(None) => debug!(phrase = %phrase, "no stock image"),
                Err(err) => {
                    warn!(phrase = %phrase, error = %err, "stock image search failed")
                }
            }
        }
        None
    }

    async fn generate(&self, request: &MediaRequest<'_>) -> Option<ResolvedMedia> {
        let generator = self.generator.as_ref()?;
        let prompt = request.phrases.first()?;
        match generator.generate(prompt).await {
            Ok(Some(image)) => Some(ResolvedMedia {
                url: image.url,
                kind: MediaKind::Image,
                source: MediaSource::Generated,
            }),
            Ok(None) => {
                debug!(prompt = %prompt, "image generation returned nothing");
                None
            }
            Err(err) => {
                warn!(prompt = %prompt, error = %err, "image generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::error::ProviderError;
    use crate::providers::{
        GeneratedImage, MockImageGenerator, MockStockImageSearch,
        MockStockVideoSearch, StockImage, StockVideo,
    };

    fn phrases() -> Vec<String> {
        vec!["ocean waves".into(), "beach".into()]
    }

    #[tokio::test]
    async fn video_hit_short_circuits() {
        let mut videos = MockStockVideoSearch::new();
        videos
            .expect_search_video()
            .with(eq("ocean waves"), eq(6))
            .times(1)
            .returning(|_, _| {
                Ok(Some(StockVideo {
                    url: "https://v.example/1.mp4".into(),
                    duration_secs: 12.0,
                }))
            });
        let mut images = MockStockImageSearch::new();
        images.expect_search_image().never();

        let cascade = MediaCascade::new()
            .with_video_search(Arc::new(videos))
            .with_image_search(Arc::new(images));
        let phrases = phrases();
        let media = cascade
            .resolve(MediaRequest {
                phrases: &phrases,
                min_duration_secs: 6,
                generate_only: false,
            })
            .await
            .unwrap();

        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.source, MediaSource::StockVideo);
    }

    #[tokio::test]
    async fn failures_fall_through_to_generation() {
        let mut videos = MockStockVideoSearch::new();
        videos
            .expect_search_video()
            .times(2)
            .returning(|_, _| Err(ProviderError::RateLimited));
        let mut images = MockStockImageSearch::new();
        images.expect_search_image().times(2).returning(|_| Ok(None));
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .with(eq("ocean waves"))
            .times(1)
            .returning(|_| {
                Ok(Some(GeneratedImage {
                    url: "https://g.example/1.png".into(),
                }))
            });

        let cascade = MediaCascade::new()
            .with_video_search(Arc::new(videos))
            .with_image_search(Arc::new(images))
            .with_generator(Arc::new(generator));
        let phrases = phrases();
        let media = cascade
            .resolve(MediaRequest {
                phrases: &phrases,
                min_duration_secs: 3,
                generate_only: false,
            })
            .await
            .unwrap();

        assert_eq!(media.source, MediaSource::Generated);
        assert_eq!(media.url, "https://g.example/1.png");
    }

    #[tokio::test]
    async fn image_search_used_when_videos_miss() {
        let mut images = MockStockImageSearch::new();
        images.expect_search_image().returning(|_| {
            Ok(Some(StockImage {
                url: "https://i.example/1.jpg".into(),
            }))
        });
        let cascade = MediaCascade::new().with_image_search(Arc::new(images));
        let phrases = phrases();
        let media = cascade
            .resolve(MediaRequest {
                phrases: &phrases,
                min_duration_secs: 3,
                generate_only: false,
            })
            .await
            .unwrap();
        assert_eq!(media.source, MediaSource::StockImage);
    }

    #[tokio::test]
    async fn generate_only_skips_search() {
        let mut videos = MockStockVideoSearch::new();
        videos.expect_search_video().never();
        let cascade = MediaCascade::new().with_video_search(Arc::new(videos));
        let phrases = phrases();
        let media = cascade
            .resolve(MediaRequest {
                phrases: &phrases,
                min_duration_secs: 3,
                generate_only: true,
            })
            .await;
        assert!(media.is_none());
    }

    #[tokio::test]
    async fn no_providers_means_exhaustion() {
        let phrases = phrases();
        let media = MediaCascade::new()
            .resolve(MediaRequest {
                phrases: &phrases,
                min_duration_secs: 3,
                generate_only: false,
            })
            .await;
        assert!(media.is_none());
    }
}
