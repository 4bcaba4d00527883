//! Translate `OpenAI` Chat Completions requests into Anthropic Messages API requests.
//!
//! Translation runs in two passes. Every message's content is first parsed into
//! [`ContentPart`]s, so malformed input is rejected before any network I/O.
//! Remote images are then downloaded and the outbound content blocks assembled
//! in inbound part order. Any failure aborts the whole request.

use futures::stream::{self, StreamExt, TryStreamExt};

use super::anthropic_types::{ContentBlock, Message, MessagesRequest};
use super::image::ImageFetcher;
use super::openai_types::{ChatCompletionRequest, ChatContent, ChatMessage, ContentPart};
use crate::error::Result;

/// A message whose content has been validated but whose images are not yet resolved.
struct ParsedMessage {
    role: String,
    parts: Vec<ContentPart>,
}

/// Translate an `OpenAI` chat request into an Anthropic Messages API request.
///
/// Performs one GET per remote image reference, in the order the parts appear.
///
/// # Errors
/// `ProxyError::MalformedInput` for unsupported or malformed content parts,
/// `ProxyError::UpstreamFetch` when a remote image cannot be downloaded.
pub async fn openai_to_anthropic(
    req: &ChatCompletionRequest,
    images: &ImageFetcher,
) -> Result<MessagesRequest> {
    let parsed = req
        .messages
        .iter()
        .map(parse_message)
        .collect::<Result<Vec<_>>>()?;

    let mut messages = Vec::with_capacity(parsed.len());
    for ParsedMessage { role, parts } in parsed {
        let content = resolve_parts(parts, images).await?;
        messages.push(Message { role, content });
    }

    Ok(MessagesRequest {
        model: req.model.clone(),
        messages,
        max_tokens: req.max_tokens,
        temperature: req.temperature,
        top_p: req.top_p,
        stop_sequences: req.stop.as_ref().map(|s| s.to_vec()),
    })
}

fn parse_message(msg: &ChatMessage) -> Result<ParsedMessage> {
    let parts = match &msg.content {
        ChatContent::Text(text) => vec![ContentPart::Shorthand(text.clone())],
        ChatContent::Parts(parts) => parts
            .iter()
            .map(ContentPart::parse)
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(ParsedMessage {
        role: msg.role.clone(),
        parts,
    })
}

/// `buffered` keeps results in input order however many downloads overlap.
async fn resolve_parts(parts: Vec<ContentPart>, images: &ImageFetcher) -> Result<Vec<ContentBlock>> {
    stream::iter(parts)
        .map(|part| resolve_part(part, images))
        .buffered(images.max_concurrent())
        .try_collect()
        .await
}

async fn resolve_part(part: ContentPart, images: &ImageFetcher) -> Result<ContentBlock> {
    match part {
        ContentPart::Shorthand(text) | ContentPart::Text { text } => Ok(ContentBlock::Text { text }),
        ContentPart::ImageUrl { image } => Ok(ContentBlock::Image {
            source: images.resolve(image).await?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;
    use crate::translate::anthropic_types::ImageSource;
    use serde_json::json;

    fn offline_fetcher() -> ImageFetcher {
        ImageFetcher::new(reqwest::Client::new())
    }

    fn request(body: serde_json::Value) -> ChatCompletionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_plain_string_becomes_single_text_block() {
        let req = request(json!({
            "model": "claude-3-haiku",
            "messages": [{"role": "user", "content": "hello"}]
        }));

        let result = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap();

        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].content, vec![ContentBlock::text("hello")]);
    }

    #[tokio::test]
    async fn test_roles_and_order_are_preserved() {
        let req = request(json!({
            "model": "m",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": ["one", {"type": "text", "text": "two"}]},
                {"role": "assistant", "content": "three"},
                {"role": "user", "content": [{"type": "text"}]}
            ]
        }));

        let result = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap();

        let roles: Vec<&str> = result.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(
            result.messages[1].content,
            vec![ContentBlock::text("one"), ContentBlock::text("two")]
        );
        assert_eq!(result.messages[3].content, vec![ContentBlock::text("")]);
    }

    #[tokio::test]
    async fn test_max_tokens_presence_is_preserved() {
        let without = request(json!({"model": "m", "messages": []}));
        let out = openai_to_anthropic(&without, &offline_fetcher()).await.unwrap();
        let value = serde_json::to_value(&out).unwrap();
        assert!(value.get("max_tokens").is_none());

        let with = request(json!({"model": "m", "messages": [], "max_tokens": 256}));
        let out = openai_to_anthropic(&with, &offline_fetcher()).await.unwrap();
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["max_tokens"], 256);
    }

    #[tokio::test]
    async fn test_sampling_fields_and_stop_are_carried() {
        let req = request(json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.5,
            "top_p": 0.9,
            "stop": "bye",
            "stream": true
        }));

        let out = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap();
        let value = serde_json::to_value(&out).unwrap();

        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["top_p"], 0.9);
        assert_eq!(value["stop_sequences"], json!(["bye"]));
        assert!(value.get("stream").is_none());
    }

    #[tokio::test]
    async fn test_data_url_scenario_end_to_end() {
        let req = request(json!({
            "model": "claude-3-haiku",
            "messages": [{
                "role": "user",
                "content": [{"type": "image_url", "image_url": {"url": "data:image/png;base64,Zm9v"}}]
            }]
        }));

        let out = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap();

        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({
                "model": "claude-3-haiku",
                "messages": [{
                    "role": "user",
                    "content": [{
                        "type": "image",
                        "source": {"type": "base64", "media_type": "image/png", "data": "Zm9v"}
                    }]
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_bogus_part_aborts_whole_request() {
        let req = request(json!({
            "model": "m",
            "messages": [
                {"role": "user", "content": "fine"},
                {"role": "user", "content": [{"type": "text", "text": "ok"}, {"type": "bogus"}]}
            ]
        }));

        let err = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap_err();
        assert!(matches!(err, ProxyError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_malformed_input_is_reported_before_any_fetch() {
        // The remote image would fail with UpstreamFetch if it were requested.
        let req = request(json!({
            "model": "m",
            "messages": [
                {"role": "user", "content": [{"type": "image_url", "image_url": "http://127.0.0.1:9/a.png"}]},
                {"role": "user", "content": [{"type": "image_url", "image_url": {"url": "data:nope"}}]}
            ]
        }));

        let err = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap_err();
        assert!(err.to_string().contains("invalid data URL"));
    }

    #[tokio::test]
    async fn test_data_and_text_parts_keep_order() {
        let req = request(json!({
            "model": "m",
            "messages": [{
                "role": "user",
                "content": [
                    "before",
                    {"type": "image_url", "image_url": "data:image/jpeg;base64,/9j/"},
                    {"type": "text", "text": "after"}
                ]
            }]
        }));

        let out = openai_to_anthropic(&req, &offline_fetcher()).await.unwrap();

        assert_eq!(
            out.messages[0].content,
            vec![
                ContentBlock::text("before"),
                ContentBlock::Image {
                    source: ImageSource::base64("image/jpeg", "/9j/")
                },
                ContentBlock::text("after"),
            ]
        );
    }
}
