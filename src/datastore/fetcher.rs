use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("received non-2xx response: {status}")]
    Status { status: StatusCode },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status } => Some(*status),
            Self::Transport(error) => error.status(),
            Self::Decode(_) => None,
        }
    }
}

/// One GET against `url`, decoded into `T`.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch<T>(&self, url: &str, credential: Option<&str>) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Send;
}

#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self::new(http))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch<T>(&self, url: &str, credential: Option<&str>) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Send,
    {
        debug!(%url, "fetching snapshot");

        let mut request = self.http.get(url);
        if let Some(credential) = credential.filter(|c| !c.is_empty()) {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await.map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;

        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }
}
