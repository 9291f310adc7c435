// SPDX-License-Identifier: MIT

//! Scripted Model - replays queued replies in order
//!
//! Used by the test suites and for offline dry runs of a graph.

use super::{Completion, GenerationConfig, Message, Model};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    structured: bool,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: None,
            structured: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply given once the queue is drained
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Claim schema-constrained output. JSON replies are also returned decoded.
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured = enabled;
        self
    }

    /// Number of completions requested so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Histories passed to each call, oldest first
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_reply(&self) -> Option<String> {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies.pop_front().or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn generate_content(
        &self,
        history: &[Message],
        config: Option<&GenerationConfig>,
    ) -> Result<Completion, ModelError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(history.to_vec());

        let content = self
            .next_reply()
            .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))?;

        let constrained = self.structured && config.is_some_and(|c| c.response_schema.is_some());
        let structured = if constrained {
            serde_json::from_str(&content).ok()
        } else {
            None
        };

        Ok(Completion {
            content,
            structured,
        })
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_falls_back() {
        let model = ScriptedModel::new(["one", "two"]).with_fallback("again");
        let history = [Message::user("go")];

        for expected in ["one", "two", "again", "again"] {
            let reply = model.generate_content(&history, None).await.unwrap();
            assert_eq!(reply.content, expected);
        }
        assert_eq!(model.call_count(), 4);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_an_error() {
        let model = ScriptedModel::new(Vec::<String>::new());
        let err = model.generate_content(&[], None).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
