// SPDX-License-Identifier: MIT

//! Planner - drafts a step-by-step plan for the task

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::model::{Message, Model};
use crate::graph::{Node, NodeError, RunContext, StatePatch, TeamState, Verdict};

pub const PLANNER_NAME: &str = "Planner";

pub struct PlannerNode {
    model: Arc<dyn Model>,
}

impl PlannerNode {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }

    fn prompt(state: &TeamState) -> Vec<Message> {
        let mut history = state.conversation.clone();
        if state.critique == Some(Verdict::Reject) && !state.feedback.is_empty() {
            history.push(Message::user(format!(
                "Your previous plan was rejected by the reviewer. Feedback:\n{}\n\nRevise the plan to address it.",
                state.feedback
            )));
        }
        history.push(Message::user("Create a step-by-step plan for this task."));
        history
    }
}

#[async_trait]
impl Node for PlannerNode {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let completion = self
            .model
            .generate_content(&Self::prompt(state), None)
            .await?;

        log::info!(
            "Planner drafted a plan ({} chars, round {})",
            completion.content.len(),
            state.critique_rounds + 1
        );

        Ok(StatePatch::new()
            .plan(completion.content.clone())
            .message(Message::assistant(completion.content).named(PLANNER_NAME)))
    }
}
