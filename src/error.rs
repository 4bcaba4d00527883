//! Error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::translate::openai_types::ChatErrorResponse;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The inbound request is structurally valid JSON but cannot be translated.
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// A remote image referenced by the request could not be retrieved.
    #[error("Failed to fetch image {url}: {reason}")]
    UpstreamFetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: msg.into(),
        }
    }

    pub fn upstream_fetch(
        url: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UpstreamFetch {
            url: url.into(),
            status,
            reason: reason.into(),
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            message: msg.into(),
        }
    }

    /// HTTP status the gateway answers with when this error ends a request.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedInput { .. } | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UpstreamFetch { .. } | Self::Upstream { .. } | Self::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Config { .. } | Self::Io(_) | Self::Toml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the `type` field in the client-facing error body.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } | Self::Json(_) => "invalid_request_error",
            Self::Unauthorized => "authentication_error",
            Self::UpstreamFetch { .. } => "upstream_fetch_error",
            Self::Config { .. } | Self::Io(_) | Self::Toml(_) => "configuration_error",
            Self::Upstream { .. } | Self::Http(_) => "api_error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ChatErrorResponse::new(self.error_type(), self.to_string());
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
