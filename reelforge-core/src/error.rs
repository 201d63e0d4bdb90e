use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to an external provider (HTTP API, child process).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process error: {0}")]
    Process(String),
}

impl ProviderError {
    /// Map a non-success HTTP status onto the provider taxonomy.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::InvalidApiKey,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            _ => Self::ApiError(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("cache IO failed for {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while enriching a single scene. Never escapes a batch.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Invalid scene: {0}")]
    InvalidScene(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render engine failed: {0}")]
    Engine(String),

    #[error("render cancelled")]
    Cancelled,

    #[error("render stalled: no progress for {0} seconds")]
    Stalled(u64),

    #[error("render IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CancelError {
    #[error("Job not found")]
    NotFound,

    #[error("Job is not cancellable")]
    NotCancellable,
}
