//! Type definitions for the [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)
//! request format, as accepted by the gateway.
//!
//! Content parts stay as raw JSON on the wire type and are classified into the
//! closed [`ContentPart`] enum during translation, so that an unrecognised part
//! surfaces as a translation error instead of a generic body parse failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::image::{parse_data_url, ImageRef};
use crate::error::{ProxyError, Result};

// ---------------------------------------------------------------------------
// Request types (what the client sends TO us)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    // Accepted but never forwarded; responses are relayed as a single body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: ChatContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StopSequences::One(s) => vec![s.clone()],
            StopSequences::Many(v) => v.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Content parts
// ---------------------------------------------------------------------------

/// One element of a message's content array, after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// A bare string inside the content array.
    Shorthand(String),
    /// `{"type": "text", "text": ...}`; a missing `text` reads as `""`.
    Text { text: String },
    /// `{"type": "image_url", "image_url": "..." | {"url": "..."}}`
    ImageUrl { image: ImageRef },
}

impl ContentPart {
    /// Classify a raw JSON content part.
    ///
    /// # Errors
    /// Returns `ProxyError::MalformedInput` for unknown part types, image parts
    /// without a usable URL, and data URLs that are not `data:<type>;base64,<payload>`.
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::String(s) => return Ok(ContentPart::Shorthand(s.clone())),
            Value::Object(obj) => obj,
            _ => return Err(ProxyError::malformed("unsupported content part")),
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("text") => Ok(ContentPart::Text {
                text: obj
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            Some("image_url") => {
                let url = match obj.get("image_url") {
                    Some(Value::String(url)) => url.as_str(),
                    Some(Value::Object(inner)) => inner
                        .get("url")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ProxyError::malformed("image_url missing url"))?,
                    _ => return Err(ProxyError::malformed("image_url missing url")),
                };

                let image = if url.starts_with("data:") {
                    ImageRef::Inline(parse_data_url(url)?)
                } else {
                    ImageRef::Remote(url.to_string())
                };
                Ok(ContentPart::ImageUrl { image })
            }
            _ => Err(ProxyError::malformed("unsupported content part")),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types (what we send BACK when a request fails locally)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatErrorResponse {
    pub error: ChatError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatError {
    pub message: String,
    #[serde(rename = "type")]
    #[serde(default)]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ChatErrorResponse {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error: ChatError {
                message: message.into(),
                error_type: error_type.to_string(),
                code: None,
            },
        }
    }
}
