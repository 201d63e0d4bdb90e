use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use super::{StockImage, StockImageSearch, StockVideo, StockVideoSearch};
use crate::error::ProviderError;

const PEXELS_API_BASE: &str = "https://api.pexels.com";

/// Pexels stock video and photo search.
pub struct PexelsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for PexelsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PexelsClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    videos: Vec<VideoHit>,
}

#[derive(Debug, Deserialize)]
struct VideoHit {
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoSearchResponse {
    #[serde(default)]
    photos: Vec<PhotoHit>,
}

#[derive(Debug, Deserialize)]
struct PhotoHit {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    #[serde(default)]
    landscape: Option<String>,
    #[serde(default)]
    large2x: Option<String>,
    #[serde(default)]
    original: Option<String>,
}

impl PexelsClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: PEXELS_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(ProviderError::from);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::from_status(
            status,
            format!("Pexels request failed ({status}): {body}"),
        ))
    }
}

/// Best MP4 rendition of a hit: HD preferred, then the widest.
fn pick_video_file(files: &[VideoFile]) -> Option<&VideoFile> {
    let mp4 = files
        .iter()
        .filter(|f| f.file_type.as_deref().is_none_or(|t| t == "video/mp4"));
    let mut best: Option<&VideoFile> = None;
    for file in mp4 {
        let rank = |f: &VideoFile| {
            (f.quality.as_deref() == Some("hd"), f.width.unwrap_or(0))
        };
        if best.is_none_or(|current| rank(file) > rank(current)) {
            best = Some(file);
        }
    }
    best
}

#[async_trait]
impl StockVideoSearch for PexelsClient {
    async fn search_video(
        &self,
        query: &str,
        min_duration_secs: u32,
    ) -> Result<Option<StockVideo>, ProviderError> {
        let response: VideoSearchResponse = self
            .get_json(
                "/videos/search",
                &[
                    ("query", query.to_string()),
                    ("orientation", "landscape".into()),
                    ("per_page", "15".into()),
                    ("min_duration", min_duration_secs.to_string()),
                ],
            )
            .await?;

        Ok(response
            .videos
            .iter()
            .filter(|hit| hit.duration >= f64::from(min_duration_secs))
            .find_map(|hit| {
                pick_video_file(&hit.video_files).map(|file| StockVideo {
                    url: file.link.clone(),
                    duration_secs: hit.duration,
                })
            }))
    }
}

#[async_trait]
impl StockImageSearch for PexelsClient {
    async fn search_image(
        &self,
        query: &str,
    ) -> Result<Option<StockImage>, ProviderError> {
        let response: PhotoSearchResponse = self
            .get_json(
                "/v1/search",
                &[
                    ("query", query.to_string()),
                    ("orientation", "landscape".into()),
                    ("per_page", "5".into()),
                ],
            )
            .await?;

        Ok(response.photos.into_iter().find_map(|hit| {
            hit.src
                .landscape
                .or(hit.src.large2x)
                .or(hit.src.original)
                .map(|url| StockImage { url })
        }))
    }
}
