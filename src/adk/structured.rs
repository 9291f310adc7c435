// SPDX-License-Identifier: MIT

//! Structured completions
//!
//! Backends that enforce a JSON schema get the schema as a constraint. For the
//! rest the schema is appended as an instruction and the JSON object is pulled
//! out of the free-text reply.

use crate::adk::error::ModelError;
use crate::adk::model::{GenerationConfig, Message, Model, ResponseSchema};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructuredError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("could not parse structured reply ({reason}): {raw}")]
    Parse { raw: String, reason: String },
}

/// Request a completion that decodes into `T`
pub async fn complete_structured<T: DeserializeOwned>(
    model: &dyn Model,
    history: &[Message],
    schema: &ResponseSchema,
) -> Result<T, StructuredError> {
    let config = GenerationConfig {
        temperature: Some(0.0),
        response_schema: Some(schema.clone()),
        ..Default::default()
    };

    if model.supports_structured_output() {
        let completion = model.generate_content(history, Some(&config)).await?;
        let value = match completion.structured {
            Some(value) => value,
            None => extract_json(&completion.content).ok_or_else(|| StructuredError::Parse {
                raw: completion.content.clone(),
                reason: "no JSON object in reply".into(),
            })?,
        };
        return serde_json::from_value(value).map_err(|e| StructuredError::Parse {
            raw: completion.content,
            reason: e.to_string(),
        });
    }

    let mut prompt = history.to_vec();
    prompt.push(Message::system(format!(
        "Respond with a single JSON object and nothing else. It must match this JSON schema:\n{}",
        serde_json::to_string_pretty(&schema.schema).unwrap_or_default()
    )));

    let completion = model.generate_content(&prompt, Some(&config)).await?;
    log::debug!("Parsing structured reply for '{}'", schema.name);

    let value = extract_json(&completion.content).ok_or_else(|| StructuredError::Parse {
        raw: completion.content.clone(),
        reason: "no JSON object in reply".into(),
    })?;

    serde_json::from_value(value).map_err(|e| StructuredError::Parse {
        raw: completion.content,
        reason: e.to_string(),
    })
}

/// Find a JSON object in free text.
///
/// Accepts a bare document, a fenced ```json block, or the outermost braces
/// inside surrounding prose. Single-quoted pseudo-JSON is retried with double
/// quotes as a last resort.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = strip_fence(trimmed) {
        if let Ok(value) = serde_json::from_str(fenced) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &trimmed[start..=end];

    serde_json::from_str(candidate)
        .ok()
        .or_else(|| serde_json::from_str(&candidate.replace('\'', "\"")).ok())
}

fn strip_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = &text[open + 3..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let close = rest.find("```")?;
    Some(rest[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::scripted::ScriptedModel;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Route {
        next: String,
    }

    fn schema() -> ResponseSchema {
        ResponseSchema::new("route", json!({"type": "object"}))
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(json!({"a": 1})));
        assert_eq!(
            extract_json("Sure!\n```json\n{\"a\": 2}\n```\nDone."),
            Some(json!({"a": 2}))
        );
        assert_eq!(
            extract_json("I pick {\"next\": \"Coder\"} for this."),
            Some(json!({"next": "Coder"}))
        );
        assert_eq!(extract_json("{'next': 'FINISH'}"), Some(json!({"next": "FINISH"})));
        assert_eq!(extract_json("no json here"), None);
    }

    #[tokio::test]
    async fn test_fallback_appends_schema_instruction() {
        let model = ScriptedModel::new(["Routing now: {\"next\": \"Coder\"}"]);
        let route: Route = complete_structured(&model, &[Message::user("task")], &schema())
            .await
            .unwrap();

        assert_eq!(route.next, "Coder");
        let calls = model.calls();
        assert_eq!(calls[0].len(), 2);
        assert!(calls[0][1].content.contains("JSON schema"));
    }

    #[tokio::test]
    async fn test_constrained_mode_sends_history_unchanged() {
        let model = ScriptedModel::new([r#"{"next": "FINISH"}"#]).with_structured_output(true);
        let route: Route = complete_structured(&model, &[Message::user("task")], &schema())
            .await
            .unwrap();

        assert_eq!(route.next, "FINISH");
        assert_eq!(model.calls()[0].len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_reply() {
        let model = ScriptedModel::new(["I would rather not say"]);
        let err = complete_structured::<Route>(&model, &[], &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, StructuredError::Parse { .. }));
    }
}
