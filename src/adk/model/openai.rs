// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API implementation
//!
//! Also fronts any server speaking the same wire format (Ollama, OpenRouter,
//! llama.cpp) by pointing `base_url` at it.

use super::{Completion, GenerationConfig, Message, Model};
use crate::adk::error::ModelError;
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// OpenAI-compatible chat model
pub struct OpenAIModel {
    client: Client,
    api_key: Option<String>,
    model_name: String,
    base_url: String,
    structured_output: bool,
}

impl OpenAIModel {
    /// Build from loaded settings. Local servers may run without a key.
    pub fn from_settings(settings: &Settings) -> Result<Self, ModelError> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            api_key: settings.api_key.clone(),
            model_name: settings.model_name.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            structured_output: settings.structured_output,
        })
    }

    /// Toggle `response_format: json_schema` support. Many local servers lack it.
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    fn message_to_openai(message: &Message) -> serde_json::Value {
        let mut msg = json!({
            "role": message.role.as_str(),
            "content": message.content,
        });
        if let Some(name) = &message.name {
            msg["name"] = json!(sanitize_name(name));
        }
        msg
    }

    fn build_body(&self, history: &[Message], config: Option<&GenerationConfig>) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            history.iter().map(Self::message_to_openai).collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if let (true, Some(schema)) = (self.structured_output, &cfg.response_schema) {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": schema.name,
                        "schema": schema.schema,
                    }
                });
            }
        }

        body
    }

    /// Parse OpenAI response into a Completion
    fn parse_openai_response(
        response: &serde_json::Value,
        structured: bool,
    ) -> Result<Completion, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        let content = choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        // Servers that ignore `response_format` answer in prose; leave that to
        // the caller's text parsing.
        let structured = if structured {
            serde_json::from_str(&content)
                .map_err(|e| log::debug!("Constrained reply is not JSON: {}", e))
                .ok()
        } else {
            None
        };

        Ok(Completion {
            content,
            structured,
        })
    }
}

/// OpenAI restricts `name` to `[a-zA-Z0-9_-]`
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Message],
        config: Option<&GenerationConfig>,
    ) -> Result<Completion, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(history, config);
        let constrained = body.get("response_format").is_some();

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let resp = request.send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs });
        }

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(ModelError::api("openai", text));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json, constrained)
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::ResponseSchema;
    use serde_json::json;

    fn model(structured: bool) -> OpenAIModel {
        OpenAIModel {
            client: Client::new(),
            api_key: None,
            model_name: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            structured_output: structured,
        }
    }

    #[test]
    fn test_message_to_openai_user_message() {
        let msg = OpenAIModel::message_to_openai(&Message::user("Hello"));
        assert_eq!(msg["role"], "user");
        assert_eq!(msg["content"], "Hello");
        assert!(msg.get("name").is_none());
    }

    #[test]
    fn test_message_to_openai_sanitizes_name() {
        let msg = OpenAIModel::message_to_openai(&Message::assistant("ok").named("Data Analyst"));
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["name"], "Data_Analyst");
    }

    #[test]
    fn test_body_includes_schema_only_when_supported() {
        let config = GenerationConfig {
            temperature: Some(0.0),
            response_schema: Some(ResponseSchema::new("route", json!({"type": "object"}))),
            ..Default::default()
        };
        let history = [Message::user("hi")];

        let body = model(true).build_body(&history, Some(&config));
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "route");

        let body = model(false).build_body(&history, Some(&config));
        assert!(body.get("response_format").is_none());
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_parse_openai_text_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello, how can I help?"
                }
            }]
        });

        let completion = OpenAIModel::parse_openai_response(&response, false).unwrap();
        assert_eq!(completion.content, "Hello, how can I help?");
        assert!(completion.structured.is_none());
    }

    #[test]
    fn test_parse_openai_structured_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"next\": \"Coder\"}"
                }
            }]
        });

        let completion = OpenAIModel::parse_openai_response(&response, true).unwrap();
        assert_eq!(completion.structured, Some(json!({"next": "Coder"})));
    }

    #[test]
    fn test_parse_prose_in_constrained_mode_leaves_structured_empty() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "I think Coder should go next"
                }
            }]
        });

        let completion = OpenAIModel::parse_openai_response(&response, true).unwrap();
        assert_eq!(completion.content, "I think Coder should go next");
        assert!(completion.structured.is_none());
    }

    #[test]
    fn test_parse_openai_response_without_choices() {
        let err = OpenAIModel::parse_openai_response(&json!({"choices": []}), false).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
