// SPDX-License-Identifier: MIT

//! Persona workers - a fixed instruction over the shared conversation
//!
//! Each invocation sends the worker's instruction plus the conversation to
//! the model and appends the reply as one message under the worker's name.

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::model::{Message, Model};
use crate::graph::{Node, NodeError, RunContext, StatePatch, TeamState};

pub struct PersonaWorker {
    pub name: String,
    pub instruction: String,
    /// Append the current plan to the instruction when one exists
    pub include_plan: bool,
    model: Arc<dyn Model>,
}

impl PersonaWorker {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>, model: Arc<dyn Model>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            include_plan: false,
            model,
        }
    }

    pub fn with_plan(mut self, include_plan: bool) -> Self {
        self.include_plan = include_plan;
        self
    }

    pub fn coder(model: Arc<dyn Model>) -> Self {
        Self::new(
            "Coder",
            "You are a coding expert. Implement the task requested by the user and \
             return the code with a short explanation.",
            model,
        )
        .with_plan(true)
    }

    pub fn web_surfer(model: Arc<dyn Model>) -> Self {
        Self::new(
            "WebSurfer",
            "You are a web research specialist. Find and summarize the information the \
             task needs, citing where each fact comes from.",
            model,
        )
    }

    pub fn document_analyst(model: Arc<dyn Model>) -> Self {
        Self::new(
            "DocumentAnalyst",
            "You are a document analyst. Read the material gathered so far and extract \
             the facts, figures and conclusions relevant to the task.",
            model,
        )
    }

    fn system_prompt(&self, state: &TeamState) -> String {
        if self.include_plan && !state.plan.is_empty() {
            format!("{}\n\nFollow this plan:\n{}", self.instruction, state.plan)
        } else {
            self.instruction.clone()
        }
    }
}

#[async_trait]
impl Node for PersonaWorker {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let mut history = Vec::with_capacity(state.conversation.len() + 1);
        history.push(Message::system(self.system_prompt(state)));
        history.extend(state.conversation.iter().cloned());

        let completion = self.model.generate_content(&history, None).await?;
        log::info!(
            "{} replied ({} chars)",
            self.name,
            completion.content.len()
        );

        Ok(StatePatch::new().message(Message::assistant(completion.content).named(self.name.clone())))
    }
}
