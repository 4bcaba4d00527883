//! The static model catalog served on `GET /v1/models`.

use serde::{Deserialize, Serialize};

/// Context window advertised for the built-in Claude 3 entries.
pub const CLAUDE_3_CONTEXT_LENGTH: u64 = 200_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub context_length: u64,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, context_length: u64) -> Self {
        Self {
            id: id.into(),
            context_length,
        }
    }
}

/// Body of the model listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

/// Catalog used when the config file does not list any models.
#[must_use]
pub fn default_catalog() -> Vec<ModelInfo> {
    ["claude-3-haiku", "claude-3-sonnet", "claude-3-opus"]
        .into_iter()
        .map(|id| ModelInfo::new(id, CLAUDE_3_CONTEXT_LENGTH))
        .collect()
}
