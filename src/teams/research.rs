// SPDX-License-Identifier: MIT

//! Research team: a supervisor over the web surfer and the document analyst

use std::sync::Arc;

use super::supervised_team;
use crate::adk::model::Model;
use crate::graph::{CompiledGraph, GraphDefinitionError, Node, NodeKey, Target};
use crate::workers::{PersonaWorker, SupervisorNode};

pub fn research_team(model: Arc<dyn Model>) -> Result<CompiledGraph, GraphDefinitionError> {
    let supervisor = SupervisorNode::new(
        NodeKey::ResearchSupervisor,
        vec![NodeKey::WebSurfer, NodeKey::DocumentAnalyst],
        model.clone(),
    );
    let members: Vec<(NodeKey, Arc<dyn Node>)> = vec![
        (NodeKey::WebSurfer, Arc::new(PersonaWorker::web_surfer(model.clone()))),
        (NodeKey::DocumentAnalyst, Arc::new(PersonaWorker::document_analyst(model))),
    ];

    supervised_team("research_team", supervisor, members, Target::End)
}
