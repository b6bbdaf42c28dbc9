// src/services/fetcher.rs

//! Source fetching.
//!
//! Turns a source locator into raw bytes plus whatever metadata the
//! transport exposes. HTTP(S) goes through reqwest, `file://` URLs and
//! bare paths are read from disk.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::{AppError, Result};
use crate::models::FetchConfig;
use crate::utils::http::{create_async_client, media_type};
use crate::utils::url::{Locator, locate};

/// Raw content of a source, before format detection.
#[derive(Debug, Clone)]
pub struct RawSource {
    /// Locator the content was read from
    pub url: String,

    /// Body bytes
    pub bytes: Vec<u8>,

    /// Media type reported by the transport, if any
    pub content_type: Option<String>,
}

impl RawSource {
    pub fn new(url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Body decoded as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Capability to obtain raw source content.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawSource>;
}

/// Fetcher for HTTP(S) URLs and local files.
pub struct DefaultFetcher {
    client: Client,
}

impl DefaultFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    async fn fetch_remote(&self, url: &url::Url) -> Result<RawSource> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url.as_str(), format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .filter(|t| !t.is_empty());
        let bytes = response.bytes().await?;

        log::debug!(
            "Fetched {} ({} bytes, {})",
            url,
            bytes.len(),
            content_type.as_deref().unwrap_or("no content type")
        );

        Ok(RawSource {
            url: url.to_string(),
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(&self, url: &str) -> Result<RawSource> {
        match locate(url) {
            Some(Locator::Remote(remote)) => self.fetch_remote(&remote).await,
            Some(Locator::File(path)) => {
                let bytes = tokio::fs::read(&path).await?;
                log::debug!("Read {} ({} bytes)", path.display(), bytes.len());
                Ok(RawSource::new(url, bytes))
            }
            None => Err(AppError::fetch(url, "unsupported URL scheme")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estados.html");
        std::fs::write(&path, "<html></html>").unwrap();

        let fetcher = DefaultFetcher::from_config(&FetchConfig::default()).unwrap();
        let raw = fetcher.fetch(path.to_str().unwrap()).await.unwrap();

        assert_eq!(raw.bytes, b"<html></html>");
        assert!(raw.content_type.is_none());
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_error() {
        let fetcher = DefaultFetcher::from_config(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("/nonexistent/estados.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_fetch_unsupported_scheme() {
        let fetcher = DefaultFetcher::from_config(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("ftp://example.com/a.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }
}
