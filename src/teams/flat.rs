// SPDX-License-Identifier: MIT

//! Flat team: one supervisor over planner, web surfer and coder

use std::sync::Arc;

use super::supervised_team;
use crate::adk::model::Model;
use crate::graph::{CompiledGraph, GraphDefinitionError, Node, NodeKey, Target};
use crate::workers::{PersonaWorker, PlannerNode, SupervisorNode};

pub fn flat_team(model: Arc<dyn Model>) -> Result<CompiledGraph, GraphDefinitionError> {
    let supervisor = SupervisorNode::new(
        NodeKey::Supervisor,
        vec![NodeKey::Planner, NodeKey::WebSurfer, NodeKey::Coder],
        model.clone(),
    );
    let members: Vec<(NodeKey, Arc<dyn Node>)> = vec![
        (NodeKey::Planner, Arc::new(PlannerNode::new(model.clone()))),
        (NodeKey::WebSurfer, Arc::new(PersonaWorker::web_surfer(model.clone()))),
        (NodeKey::Coder, Arc::new(PersonaWorker::coder(model))),
    ];

    supervised_team("flat_team", supervisor, members, Target::End)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::scripted::ScriptedModel;
    use crate::graph::{RunOptions, TeamState};

    #[tokio::test]
    async fn test_plan_code_finish() {
        let model = Arc::new(ScriptedModel::new([
            r#"{"next": "Planner"}"#,
            "1. write the function",
            r#"{"next": "Coder"}"#,
            "fn add(a: i32, b: i32) -> i32 { a + b }",
            r#"{"next": "FINISH", "task_success": true}"#,
        ]));
        let graph = flat_team(model).unwrap();

        let state = graph
            .run(TeamState::new("write add"), &RunOptions::new())
            .await
            .unwrap();

        let speakers: Vec<_> = state
            .conversation
            .iter()
            .filter_map(|m| m.name.as_deref())
            .collect();
        assert_eq!(speakers, vec!["Planner", "Coder"]);
        assert_eq!(state.plan, "1. write the function");
        assert_eq!(state.task_success, Some(true));
    }
}
