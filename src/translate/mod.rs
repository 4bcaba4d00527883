//! Request translation from the `OpenAI` chat format into the Anthropic Messages format.
//!
//! The core of the gateway. Everything here is pure except remote image
//! resolution in [`image`], which performs HTTP GETs through a shared client.
//! Responses are never translated; the upstream reply is relayed as-is.

pub mod anthropic_types;
pub mod image;
pub mod openai_types;
pub mod request;

pub use image::ImageFetcher;
pub use request::openai_to_anthropic;
