use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a raw-response snippet carried inside a parse error.
const SNIPPET_LIMIT: usize = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceError {
    #[error("Network failure: {0}")]
    Network(String),
    #[error("Blocked by upstream: {0}")]
    Blocked(String),
    #[error("Upstream reported error: {0}")]
    Upstream(String),
    #[error("Failed to parse response: {reason}. Response: {snippet}")]
    Parse { reason: String, snippet: String },
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

impl SourceError {
    /// Parse failure carrying a bounded snippet of the raw response.
    pub fn parse(reason: impl Into<String>, raw: &str) -> Self {
        SourceError::Parse {
            reason: reason.into(),
            snippet: raw.chars().take(SNIPPET_LIMIT).collect(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, SourceError::Network(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(value: reqwest::Error) -> Self {
        SourceError::Network(value.to_string())
    }
}
