//! Resolution of `image_url` references into inline base64 image sources.
//!
//! Data URLs are decoded structurally (the payload is never re-encoded); remote
//! URLs are downloaded with the shared HTTP client and base64-encoded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;

use super::anthropic_types::ImageSource;
use crate::error::{ProxyError, Result};

/// Media type assumed for a fetched image whose response has no `content-type`.
pub const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/png";

/// Where the bytes of an inbound image live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    /// Already inline, taken from a data URL.
    Inline(ImageSource),
    /// Must be downloaded.
    Remote(String),
}

/// Split `data:<media_type>;base64,<payload>` into a base64 image source.
///
/// # Errors
/// Returns `ProxyError::MalformedInput` ("invalid data URL") when the string
/// does not have that shape or the media type is empty.
pub fn parse_data_url(url: &str) -> Result<ImageSource> {
    let invalid = || ProxyError::malformed("invalid data URL");

    let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
    let (media_type, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    if media_type.is_empty() || media_type.chars().any(char::is_control) {
        return Err(invalid());
    }

    Ok(ImageSource::base64(media_type, payload))
}

/// Downloads remote images for the translator.
///
/// Wraps the process-wide `reqwest::Client`, so clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_concurrent: usize,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_concurrent: 1,
        }
    }

    /// Allow up to `limit` downloads in flight within one message. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit.max(1);
        self
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Resolve an image reference, downloading it if it is remote.
    pub async fn resolve(&self, image: ImageRef) -> Result<ImageSource> {
        match image {
            ImageRef::Inline(source) => Ok(source),
            ImageRef::Remote(url) => self.fetch(&url).await,
        }
    }

    /// GET `url` and encode the body as a base64 image source.
    ///
    /// # Errors
    /// Returns `ProxyError::UpstreamFetch` if the host is unreachable, answers
    /// with a non-2xx status, or the body cannot be read.
    pub async fn fetch(&self, url: &str) -> Result<ImageSource> {
        tracing::debug!(url, "Fetching remote image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProxyError::upstream_fetch(url, None, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::upstream_fetch(
                url,
                Some(status.as_u16()),
                format!("image host returned status {}", status.as_u16()),
            ));
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MEDIA_TYPE)
            .to_string();

        let body = response.bytes().await.map_err(|e| {
            ProxyError::upstream_fetch(url, Some(status.as_u16()), format!("failed to read body: {e}"))
        })?;

        tracing::debug!(url, %media_type, bytes = body.len(), "Fetched remote image");

        Ok(ImageSource::base64(media_type, STANDARD.encode(&body)))
    }
}
