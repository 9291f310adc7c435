// SPDX-License-Identifier: MIT

//! Supervisor - asks the model which member acts next
//!
//! The decision is a structured completion validated against the declared
//! option set (`FINISH` plus members). Routing to the dynamic worker also
//! requires a role and instructions.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adk::model::{Message, Model, ResponseSchema};
use crate::adk::structured::{complete_structured, StructuredError};
use crate::graph::{
    branches, Node, NodeError, NodeKey, RoutingError, RunContext, StatePatch, Target, TeamState,
};

const DEFAULT_PROMPT: &str = "You are a supervisor tasked with managing a conversation between the \
following workers: {members}. Given the following user request, respond with the worker to act \
next. Each worker will perform a task and respond with their results and status. When finished, \
respond with FINISH.";

/// Routing decision requested from the model
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RouteDecision {
    /// Who acts next, or FINISH
    pub next: String,
    /// Role for the dynamic worker (e.g. 'Python Expert', 'Poet')
    #[serde(default)]
    pub worker_role: Option<String>,
    /// Instructions for the dynamic worker
    #[serde(default)]
    pub worker_instructions: Option<String>,
    /// Whether the task succeeded; only read with FINISH
    #[serde(default)]
    pub task_success: Option<bool>,
}

/// Edge decision for every supervisor: follow `state.next`
pub fn supervisor_router(state: &TeamState) -> Option<Target> {
    state.next.clone()
}

pub struct SupervisorNode {
    key: NodeKey,
    members: Vec<NodeKey>,
    dynamic_worker: Option<NodeKey>,
    model: Arc<dyn Model>,
    system_prompt: String,
}

impl SupervisorNode {
    pub fn new(key: NodeKey, members: Vec<NodeKey>, model: Arc<dyn Model>) -> Self {
        Self {
            key,
            members,
            dynamic_worker: None,
            model,
            system_prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Add a member whose role is chosen per routing decision
    pub fn with_dynamic_worker(mut self, key: NodeKey) -> Self {
        self.dynamic_worker = Some(key);
        self
    }

    /// Replace the system prompt; `{members}` is substituted
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// FINISH, then members in declaration order, then the dynamic worker
    pub fn options(&self) -> Vec<Target> {
        std::iter::once(Target::End)
            .chain(self.members.iter().cloned().map(Target::Node))
            .chain(self.dynamic_worker.iter().cloned().map(Target::Node))
            .collect()
    }

    /// Identity branch table over [`Self::options`]
    pub fn route_table(&self) -> BTreeMap<Target, Target> {
        branches(self.options())
    }

    fn labels(&self) -> Vec<String> {
        self.options().iter().map(ToString::to_string).collect()
    }

    fn schema(&self) -> ResponseSchema {
        let mut schema =
            serde_json::to_value(schemars::schema_for!(RouteDecision)).unwrap_or_default();
        schema["properties"]["next"]["enum"] = json!(self.labels());
        ResponseSchema::new("route", schema)
    }

    fn prompt(&self, state: &TeamState) -> Vec<Message> {
        let mut members: Vec<String> = self.members.iter().map(ToString::to_string).collect();
        if let Some(dynamic) = &self.dynamic_worker {
            members.push(dynamic.to_string());
        }
        let mut system = self.system_prompt.replace("{members}", &members.join(", "));
        if let Some(dynamic) = &self.dynamic_worker {
            system.push_str(&format!(
                " If no other worker fits, choose {} and provide worker_role and \
                 worker_instructions describing the specialist you need.",
                dynamic
            ));
        }

        let mut history = Vec::with_capacity(state.conversation.len() + 2);
        history.push(Message::system(system));
        history.extend(state.conversation.iter().cloned());
        history.push(Message::system(format!(
            "Given the conversation above, who should act next? Or should we FINISH? \
             Select one of: [{}]. When choosing FINISH, set task_success to whether the \
             task was accomplished.",
            self.labels().join(", ")
        )));
        history
    }

    /// Validate a decision and turn it into a patch
    pub fn decide(&self, decision: RouteDecision) -> Result<StatePatch, RoutingError> {
        let lookup: BTreeMap<String, Target> = self
            .options()
            .into_iter()
            .map(|t| (t.to_string(), t))
            .collect();

        let chosen = decision.next.trim();
        let target = lookup
            .get(chosen)
            .cloned()
            .ok_or_else(|| RoutingError::invalid_choice(&self.key, chosen, lookup.values()))?;

        let mut patch = StatePatch::new().next(target.clone());

        if target.as_node().is_some() && target.as_node() == self.dynamic_worker.as_ref() {
            let role = non_empty(decision.worker_role).ok_or(RoutingError::MissingWorkerField {
                from: self.key.clone(),
                field: "worker_role",
            })?;
            let instructions =
                non_empty(decision.worker_instructions).ok_or(RoutingError::MissingWorkerField {
                    from: self.key.clone(),
                    field: "worker_instructions",
                })?;
            patch = patch.worker(role, instructions);
        }

        if target.is_end() {
            if let Some(success) = decision.task_success {
                patch = patch.task_success(success);
            }
        }

        Ok(patch)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl Node for SupervisorNode {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let history = self.prompt(state);
        let decision: RouteDecision =
            match complete_structured(self.model.as_ref(), &history, &self.schema()).await {
                Ok(decision) => decision,
                Err(StructuredError::Model(e)) => return Err(e.into()),
                Err(StructuredError::Parse { reason, .. }) => {
                    return Err(RoutingError::Unparsable {
                        from: self.key.clone(),
                        reason,
                    }
                    .into())
                }
            };

        log::info!("{} routed to {}", self.key, decision.next);
        Ok(self.decide(decision)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::scripted::ScriptedModel;

    fn supervisor(reply: &str) -> SupervisorNode {
        SupervisorNode::new(
            NodeKey::TopSupervisor,
            vec![NodeKey::ResearchTeam, NodeKey::CodingTeam],
            Arc::new(ScriptedModel::new([reply])),
        )
        .with_dynamic_worker(NodeKey::AdHocWorker)
    }

    fn ctx() -> RunContext {
        RunContext::detached(NodeKey::TopSupervisor)
    }

    #[test]
    fn test_options_order() {
        let sup = supervisor("{}");
        assert_eq!(
            sup.labels(),
            vec!["FINISH", "ResearchTeam", "CodingTeam", "AdHocWorker"]
        );
        assert_eq!(sup.schema().schema["properties"]["next"]["enum"][0], "FINISH");
    }

    #[tokio::test]
    async fn test_routes_to_member() {
        let sup = supervisor(r#"{"next": "CodingTeam"}"#);
        let patch = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap();
        assert_eq!(patch.next, Some(Some(Target::node(NodeKey::CodingTeam))));
        assert_eq!(patch.worker_role, None);
        assert_eq!(patch.task_success, None);
    }

    #[tokio::test]
    async fn test_dynamic_worker_requires_fields() {
        let sup = supervisor(r#"{"next": "AdHocWorker", "worker_role": "Poet"}"#);
        let err = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::Routing(RoutingError::MissingWorkerField {
                field: "worker_instructions",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_dynamic_worker_fields_written() {
        let sup = supervisor(
            r#"{"next": "AdHocWorker", "worker_role": "Poet", "worker_instructions": "Write a haiku"}"#,
        );
        let patch = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap();
        assert_eq!(patch.worker_role, Some(Some("Poet".to_string())));
        assert_eq!(patch.worker_instructions, Some(Some("Write a haiku".to_string())));
    }

    #[tokio::test]
    async fn test_task_success_only_on_finish() {
        let sup = supervisor(r#"{"next": "ResearchTeam", "task_success": true}"#);
        let patch = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap();
        assert_eq!(patch.task_success, None);

        let sup = supervisor(r#"{"next": "FINISH", "task_success": true}"#);
        let patch = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap();
        assert_eq!(patch.next, Some(Some(Target::End)));
        assert_eq!(patch.task_success, Some(Some(true)));
    }

    #[tokio::test]
    async fn test_unknown_member_rejected() {
        let sup = supervisor(r#"{"next": "Poet"}"#);
        let err = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Routing(RoutingError::InvalidChoice { .. })));
    }

    #[tokio::test]
    async fn test_garbage_is_unparsable() {
        let sup = supervisor("let me think about it");
        let err = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Routing(RoutingError::Unparsable { .. })));
    }

    #[tokio::test]
    async fn test_constrained_prose_is_unparsable() {
        let sup = SupervisorNode::new(
            NodeKey::TopSupervisor,
            vec![NodeKey::ResearchTeam, NodeKey::CodingTeam],
            Arc::new(ScriptedModel::new(["I think Coder should go next"]).with_structured_output(true)),
        );
        let err = sup.invoke(&TeamState::new("task"), &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Routing(RoutingError::Unparsable { .. })));
    }
}
