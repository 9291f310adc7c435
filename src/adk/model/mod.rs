// SPDX-License-Identifier: MIT

//! Model module - the inference service consumed by every worker
//!
//! This module provides the core `Model` trait and the conversation types
//! shared with the graph state. Implementations are in their own submodules:
//! - [openai] - OpenAI-compatible chat completions (OpenAI, Ollama, OpenRouter, llama.cpp)
//! - [scripted] - replays canned replies, for tests and offline runs

pub mod openai;
pub mod scripted;

use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Name of the worker that produced the message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach the producing worker's name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// JSON schema a structured completion must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Request schema-constrained output (only honoured when the model supports it)
    pub response_schema: Option<ResponseSchema>,
}

/// Result of a completion
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    /// Free-text content of the reply
    pub content: String,
    /// Decoded value when the completion was schema-constrained
    pub structured: Option<serde_json::Value>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            structured: None,
        }
    }
}

/// Core trait for inference backends
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Message],
        config: Option<&GenerationConfig>,
    ) -> Result<Completion, ModelError>;

    /// Whether `GenerationConfig::response_schema` is enforced by the backend
    fn supports_structured_output(&self) -> bool {
        false
    }
}
