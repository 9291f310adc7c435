// SPDX-License-Identifier: MIT

//! Hierarchical graph
//!
//! ```text
//! Planner -> Critic -(approve / rounds spent)-> TopSupervisor
//!              \-(reject)-> Planner
//! TopSupervisor -> ResearchTeam | CodingTeam | AdHocWorker -> TopSupervisor
//! TopSupervisor -(FINISH)-> MemoryHook -> END
//! ```

use std::sync::Arc;

use crate::adk::model::Model;
use crate::graph::{
    CompiledGraph, GraphBuilder, GraphDefinitionError, NodeKey, SubgraphNode, Target,
};
use crate::memory::LearningStore;
use crate::teams::{coding_team, research_team};
use crate::workers::memory_hook::{DEFAULT_CONTENT_LIMIT, DEFAULT_TAIL_LEN};
use crate::workers::{
    critique_edge, supervisor_router, AdHocWorker, CriticNode, MemoryHook, PlannerNode,
    SupervisorNode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchicalConfig {
    /// Rejections tolerated before the plan goes ahead anyway; `None` loops until approval
    pub max_critique_rounds: Option<u32>,
    pub tail_len: usize,
    pub content_limit: usize,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            max_critique_rounds: Some(3),
            tail_len: DEFAULT_TAIL_LEN,
            content_limit: DEFAULT_CONTENT_LIMIT,
        }
    }
}

pub fn hierarchical(
    model: Arc<dyn Model>,
    store: Arc<dyn LearningStore>,
    config: &HierarchicalConfig,
) -> Result<CompiledGraph, GraphDefinitionError> {
    let research = Arc::new(research_team(model.clone())?);
    let coding = Arc::new(coding_team(model.clone())?);

    let top = SupervisorNode::new(
        NodeKey::TopSupervisor,
        vec![NodeKey::ResearchTeam, NodeKey::CodingTeam],
        model.clone(),
    )
    .with_dynamic_worker(NodeKey::AdHocWorker);

    let mut routes = top.route_table();
    routes.insert(Target::End, Target::node(NodeKey::MemoryHook));

    let hook = MemoryHook::new(store)
        .with_tail_len(config.tail_len)
        .with_content_limit(config.content_limit);

    GraphBuilder::new("hierarchical")
        .add_node(NodeKey::Planner, PlannerNode::new(model.clone()))
        .add_node(NodeKey::Critic, CriticNode::new(model.clone()))
        .add_node(NodeKey::TopSupervisor, top)
        .add_node(NodeKey::ResearchTeam, SubgraphNode::new(research))
        .add_node(NodeKey::CodingTeam, SubgraphNode::new(coding))
        .add_node(NodeKey::AdHocWorker, AdHocWorker::new(model))
        .add_node(NodeKey::MemoryHook, hook)
        .add_edge(NodeKey::Planner, NodeKey::Critic)
        .add_conditional_edge(
            NodeKey::Critic,
            critique_edge(NodeKey::TopSupervisor, config.max_critique_rounds),
        )
        .add_conditional_edges(NodeKey::TopSupervisor, supervisor_router, routes)
        .add_edge(NodeKey::ResearchTeam, NodeKey::TopSupervisor)
        .add_edge(NodeKey::CodingTeam, NodeKey::TopSupervisor)
        .add_edge(NodeKey::AdHocWorker, NodeKey::TopSupervisor)
        .add_edge(NodeKey::MemoryHook, Target::End)
        .set_entry_point(NodeKey::Planner)
        .compile()
}
