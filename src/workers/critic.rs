// SPDX-License-Identifier: MIT

//! Critic - reviews the plan and gates the planning loop
//!
//! [`critique_edge`] sends a rejected plan back to the planner until the
//! configured number of rounds is spent.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::adk::model::{Message, Model, ResponseSchema};
use crate::adk::structured::{complete_structured, StructuredError};
use crate::graph::{
    ConditionalEdge, Node, NodeError, NodeKey, RunContext, StatePatch, Target, TeamState, Verdict,
};

const CRITIC_PROMPT: &str = "You are a critical reviewer. Your job is to evaluate the proposed \
plan. Check for feasibility, safety, and completeness. If the plan is good, respond with APPROVE. \
If the plan is flawed, respond with REJECT and provide constructive feedback. Return your response \
in JSON format with keys: 'status' (APPROVE/REJECT) and 'feedback' (string).";

/// Structured review of a plan
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CritiqueVerdict {
    pub status: Verdict,
    #[serde(default)]
    pub feedback: String,
}

static VERDICT_SCHEMA: Lazy<ResponseSchema> = Lazy::new(|| {
    let schema = serde_json::to_value(schemars::schema_for!(CritiqueVerdict)).unwrap_or_default();
    ResponseSchema::new("critique", schema)
});

pub struct CriticNode {
    model: Arc<dyn Model>,
}

impl CriticNode {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for CriticNode {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let history = [
            Message::system(CRITIC_PROMPT),
            Message::user(format!(
                "Here is the plan to review:\n{}\n\nEvaluate it.",
                state.plan
            )),
        ];

        let (verdict, feedback) =
            match complete_structured::<CritiqueVerdict>(self.model.as_ref(), &history, &VERDICT_SCHEMA)
                .await
            {
                Ok(review) => (review.status, review.feedback),
                Err(StructuredError::Parse { reason, .. }) => {
                    log::warn!("Critic reply could not be parsed, treating as REJECT: {}", reason);
                    (Verdict::Reject, format!("Error during critique: {}", reason))
                }
                Err(StructuredError::Model(e)) => return Err(e.into()),
            };

        let rounds = state.critique_rounds + 1;
        log::info!("Critic round {}: {:?}", rounds, verdict);

        Ok(StatePatch::new()
            .critique(verdict)
            .feedback(feedback)
            .critique_rounds(rounds))
    }
}

/// Route out of the critic: approved plans go to `exit_to`; rejected plans
/// return to the planner until `cap` rounds have run (`None` never gives up).
pub fn critique_edge(exit_to: NodeKey, cap: Option<u32>) -> ConditionalEdge {
    let exit = Target::Node(exit_to);
    let retry = Target::Node(NodeKey::Planner);
    let branches = [(exit.clone(), exit.clone()), (retry.clone(), retry.clone())];

    ConditionalEdge::new(
        move |state: &TeamState| {
            if state.critique == Some(Verdict::Approve) {
                return Some(exit.clone());
            }
            match cap {
                Some(limit) if state.critique_rounds >= limit => {
                    log::warn!(
                        "Plan still rejected after {} critique rounds, proceeding with it",
                        state.critique_rounds
                    );
                    Some(exit.clone())
                }
                _ => Some(retry.clone()),
            }
        },
        branches,
    )
}
