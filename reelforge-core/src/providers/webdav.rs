use std::fmt;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Method;
use tracing::debug;

use super::{MusicRepository, RemoteTrack};
use crate::error::ProviderError;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

#[derive(Clone)]
pub struct WebDavConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Directory whose sub-directories are the style buckets.
    pub root_path: String,
}

impl fmt::Debug for WebDavConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDavConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("root_path", &self.root_path)
            .finish_non_exhaustive()
    }
}

/// Music buckets stored on a WebDAV share; only `.mp3` files are tracks.
#[derive(Debug)]
pub struct WebDavMusicRepository {
    http: reqwest::Client,
    config: WebDavConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DavEntry {
    path: String,
    is_dir: bool,
}

impl DavEntry {
    fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

impl WebDavMusicRepository {
    pub fn new(http: reqwest::Client, config: WebDavConfig) -> Self {
        Self { http, config }
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.config.url.trim_end_matches('/');
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{base}/{}", encoded.join("/"))
    }

    fn style_dir(&self, style: &str) -> String {
        format!("{}/{}", self.config.root_path.trim_end_matches('/'), style)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => {
                request.basic_auth(user, self.config.password.as_deref())
            }
            None => request,
        }
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<DavEntry>, ProviderError> {
        let method = Method::from_bytes(b"PROPFIND").map_err(|err| {
            ProviderError::ApiError(format!("invalid WebDAV method: {err}"))
        })?;
        let response = self
            .authed(self.http.request(method, self.url_for(dir)))
            .header("Depth", "1")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(
                status,
                format!("WebDAV listing of {dir} failed ({status})"),
            ));
        }

        let body = response.text().await?;
        let entries = parse_multistatus(&body)?;
        debug!(dir, entries = entries.len(), "listed WebDAV directory");

        Ok(without_self(entries, &self.request_path(dir)))
    }

    /// Decoded path of the URL a listing of `dir` is sent to; servers echo
    /// it back as the collection's own entry.
    fn request_path(&self, dir: &str) -> String {
        let url = self.url_for(dir);
        let path = match url::Url::parse(&url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => dir.to_string(),
        };
        decode_path(path)
    }
}

fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

fn decode_path(path: String) -> String {
    urlencoding::decode(&path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(path)
}

/// Drop the listed collection itself, keeping only its children.
fn without_self(entries: Vec<DavEntry>, own_path: &str) -> Vec<DavEntry> {
    let own = normalize(own_path);
    entries
        .into_iter()
        .filter(|entry| normalize(&entry.path) != own)
        .collect()
}

/// Parse a PROPFIND multistatus body into its `response` entries. Element
/// prefixes are ignored, hrefs are unescaped and percent-decoded, and full
/// URLs are reduced to their path.
fn parse_multistatus(body: &str) -> Result<Vec<DavEntry>, ProviderError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut in_response = false;
    let mut in_href = false;
    let mut in_resourcetype = false;
    let mut href = String::new();
    let mut is_dir = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => {
                    in_response = true;
                    href.clear();
                    is_dir = false;
                }
                b"href" if in_response => in_href = true,
                b"resourcetype" if in_response => in_resourcetype = true,
                b"collection" if in_resourcetype => is_dir = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_resourcetype && e.local_name().as_ref() == b"collection" {
                    is_dir = true;
                }
            }
            Ok(Event::Text(e)) if in_href => {
                let text = e.unescape().map_err(|err| {
                    ProviderError::ParseError(format!("invalid WebDAV href: {err}"))
                })?;
                href.push_str(&text);
            }
            Ok(Event::CData(e)) if in_href => {
                href.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"href" => in_href = false,
                b"resourcetype" => in_resourcetype = false,
                b"response" if in_response => {
                    in_response = false;
                    let raw = href.trim();
                    if raw.is_empty() {
                        continue;
                    }
                    let path = match url::Url::parse(raw) {
                        Ok(url) => url.path().to_string(),
                        Err(_) => raw.to_string(),
                    };
                    entries.push(DavEntry {
                        path: decode_path(path),
                        is_dir,
                    });
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ProviderError::ParseError(format!(
                    "malformed WebDAV multistatus at byte {}: {err}",
                    reader.buffer_position()
                )));
            }
        }
    }
    Ok(entries)
}

fn is_track(entry: &DavEntry) -> bool {
    !entry.is_dir && entry.name().to_ascii_lowercase().ends_with(".mp3")
}

#[async_trait]
impl MusicRepository for WebDavMusicRepository {
    async fn list_styles(&self) -> Result<Vec<String>, ProviderError> {
        let entries = self.list_dir(&self.config.root_path).await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name().to_string())
            .filter(|name| !name.is_empty() && !name.starts_with('.'))
            .collect())
    }

    async fn list_tracks(
        &self,
        style: &str,
    ) -> Result<Vec<RemoteTrack>, ProviderError> {
        let dir = self.style_dir(style);
        let entries = self.list_dir(&dir).await?;
        Ok(entries
            .iter()
            .filter(|entry| is_track(entry))
            .map(|entry| RemoteTrack {
                name: entry.name().to_string(),
                path: format!("{dir}/{}", entry.name()),
            })
            .collect())
    }

    async fn fetch_track(&self, path: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .authed(self.http.get(self.url_for(path)))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(
                status,
                format!("WebDAV download of {path} failed ({status})"),
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
