use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::RequestLogger;
use crate::translate::anthropic_types::MessagesRequest;

use bytes::Bytes;

/// What the upstream provider answered, relayed to the caller untouched.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// POST a translated request to the configured Messages endpoint.
///
/// Any HTTP status from the provider is a successful outcome here; only a
/// failure to reach it or to read its body is an error.
pub async fn forward_messages(
    req: &MessagesRequest,
    config: &ProxyConfig,
    client: &reqwest::Client,
    api_key: Option<&str>,
    logger: &RequestLogger,
) -> Result<UpstreamResponse> {
    let api_key = api_key.ok_or_else(|| ProxyError::config("No upstream API key available"))?;
    let url = config.messages_url();

    logger.info(
        "proxy",
        format!("POST {} model={} messages={}", url, req.model, req.messages.len()),
    );

    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .header("x-api-key", api_key)
        .header("anthropic-version", &config.upstream.api_version)
        .json(req)
        .send()
        .await
        .map_err(|e| ProxyError::upstream(format!("Request failed: {}", e)))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .await
        .map_err(|e| ProxyError::upstream(format!("Failed to read response body: {}", e)))?;

    logger.info(
        "proxy",
        format!("Upstream response: status={} len={}", status, body.len()),
    );

    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}
