// SPDX-License-Identifier: MIT

//! Coding team: a supervisor over the coder

use std::sync::Arc;

use super::supervised_team;
use crate::adk::model::Model;
use crate::graph::{CompiledGraph, GraphDefinitionError, Node, NodeKey, Target};
use crate::workers::{PersonaWorker, SupervisorNode};

pub fn coding_team(model: Arc<dyn Model>) -> Result<CompiledGraph, GraphDefinitionError> {
    let supervisor = SupervisorNode::new(NodeKey::CodingSupervisor, vec![NodeKey::Coder], model.clone());
    let members: Vec<(NodeKey, Arc<dyn Node>)> =
        vec![(NodeKey::Coder, Arc::new(PersonaWorker::coder(model)))];

    supervised_team("coding_team", supervisor, members, Target::End)
}
