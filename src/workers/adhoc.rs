// SPDX-License-Identifier: MIT

//! Dynamic worker whose persona is chosen by the supervisor at run time

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::model::{Message, Model};
use crate::graph::{Node, NodeError, RunContext, StatePatch, TeamState};

const DEFAULT_ROLE: &str = "Assistant";
const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant";

pub struct AdHocWorker {
    model: Arc<dyn Model>,
}

impl AdHocWorker {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }

    /// Role and instructions from state, with defaults for unset values
    pub fn persona(state: &TeamState) -> (&str, &str) {
        let role = state
            .worker_role
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE);
        let instructions = state
            .worker_instructions
            .as_deref()
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_INSTRUCTIONS);
        (role, instructions)
    }

    pub fn directive(role: &str, instructions: &str) -> String {
        format!(
            "You are {}. {}. Perform the task requested by the user.",
            role,
            instructions.trim_end_matches('.')
        )
    }
}

#[async_trait]
impl Node for AdHocWorker {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let (role, instructions) = Self::persona(state);

        let mut history = Vec::with_capacity(state.conversation.len() + 1);
        history.push(Message::system(Self::directive(role, instructions)));
        history.extend(state.conversation.iter().cloned());

        log::info!("AdHocWorker acting as '{}'", role);
        let completion = self.model.generate_content(&history, None).await?;

        Ok(StatePatch::new().message(Message::assistant(completion.content).named(role)))
    }
}
