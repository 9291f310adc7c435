// SPDX-License-Identifier: MIT

//! Typed error handling for cadre
//!
//! Graph and run errors live in [`crate::graph::error`]; this module holds the
//! top-level error used by configuration, loading and the binary, plus the
//! errors raised by inference backends.

use thiserror::Error;

use crate::graph::{GraphDefinitionError, RunFailure};
use crate::memory::StoreError;

/// Top-level error type for cadre
#[derive(Debug, Error)]
pub enum CadreError {
    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A graph failed to compile
    #[error("Graph definition error: {0}")]
    Definition(#[from] GraphDefinitionError),

    /// A run aborted
    #[error(transparent)]
    Run(Box<RunFailure>),

    /// Inference backend errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Learning store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by a [`crate::adk::model::Model`] implementation
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Non-success response from the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Response did not have the expected shape
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON errors while encoding a request or decoding a response
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CadreError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<RunFailure> for CadreError {
    fn from(failure: RunFailure) -> Self {
        Self::Run(Box::new(failure))
    }
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CadreError::config("MODEL_NAME is empty");
        assert_eq!(err.to_string(), "Configuration error: MODEL_NAME is empty");
    }

    #[test]
    fn test_api_error_display() {
        let err = ModelError::api("openai", "bad request");
        assert_eq!(err.to_string(), "API error from openai: bad request");
    }

    #[test]
    fn test_definition_error_converts() {
        let err: CadreError = GraphDefinitionError::MissingEntry.into();
        assert!(matches!(err, CadreError::Definition(_)));
    }
}
